// Persistence error taxonomy
use crate::domain::configuration::ConfigurationErrors;
use crate::domain::service::Capability;

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors returned by the persistence core.
///
/// Every variant is terminal for the call that produced it; none of them are
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("persistence service not found: {service_id}")]
    BackendNotFound { service_id: String },

    #[error("no persistence service is registered")]
    NoBackendConfigured,

    #[error("persistence service '{service_id}' is not {capability}")]
    CapabilityUnsupported {
        service_id: String,
        capability: Capability,
    },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("persistence service configuration not found: {service_id}")]
    ConfigurationNotFound { service_id: String },

    #[error("persistence service configuration '{service_id}' is not managed and cannot be changed")]
    ConfigurationNotEditable { service_id: String },

    #[error("persistence service configuration already exists: {service_id}")]
    ConfigurationConflict { service_id: String },

    #[error("invalid persistence service configuration: {0}")]
    InvalidConfiguration(ConfigurationErrors),

    #[error("item not found: {item_key}")]
    ItemNotFound { item_key: String },

    #[error("state '{value}' is not valid for item {item_key}")]
    InvalidState { item_key: String, value: String },

    #[error("persistence backend error: {0}")]
    Backend(String),

    #[error("configuration storage error: {0}")]
    Storage(String),
}

/// Flat classification of [`PersistenceError`] for boundary layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BackendNotFound,
    NoBackendConfigured,
    CapabilityUnsupported,
    InvalidFilter,
    ConfigurationNotFound,
    ConfigurationNotEditable,
    ConfigurationConflict,
    InvalidConfiguration,
    ItemNotFound,
    InvalidState,
    Backend,
    Storage,
}

impl PersistenceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BackendNotFound { .. } => ErrorKind::BackendNotFound,
            Self::NoBackendConfigured => ErrorKind::NoBackendConfigured,
            Self::CapabilityUnsupported { .. } => ErrorKind::CapabilityUnsupported,
            Self::InvalidFilter(_) => ErrorKind::InvalidFilter,
            Self::ConfigurationNotFound { .. } => ErrorKind::ConfigurationNotFound,
            Self::ConfigurationNotEditable { .. } => ErrorKind::ConfigurationNotEditable,
            Self::ConfigurationConflict { .. } => ErrorKind::ConfigurationConflict,
            Self::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            Self::ItemNotFound { .. } => ErrorKind::ItemNotFound,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::Backend(_) => ErrorKind::Backend,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn unsupported(service_id: &str, capability: Capability) -> Self {
        Self::CapabilityUnsupported {
            service_id: service_id.to_string(),
            capability,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Storage(e.to_string())
    }
}
