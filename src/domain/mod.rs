// Domain layer - Pure data shared by every other layer
pub mod configuration;
pub mod error;
pub mod filter;
pub mod history;
pub mod service;
pub mod state;
