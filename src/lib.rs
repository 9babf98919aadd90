// Pluggable persistence services with chart-ready history queries
pub mod application;
pub mod context;
pub mod domain;
pub mod infrastructure;

pub use application::history_service::{HistoryQuery, HistoryQueryEngine};
pub use application::persistence_service::{
    ModifiablePersistenceService, PersistenceService, QueryablePersistenceService,
};
pub use context::PersistenceContext;
pub use domain::error::{ErrorKind, PersistenceError, PersistenceResult};
