// Registry of persistence services
use crate::application::persistence_service::PersistenceService;
use crate::domain::error::{PersistenceError, PersistenceResult};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct RegistryState {
    services: Vec<Arc<dyn PersistenceService>>,
    default_id: Option<String>,
}

/// Holds every registered backend, in registration order.
///
/// Callers receive `Arc` handles, so a backend removed from the registry
/// stays usable by calls that already resolved it.
#[derive(Default)]
pub struct PersistenceServiceRegistry {
    state: RwLock<RegistryState>,
}

impl PersistenceServiceRegistry {
    pub fn new(default_id: Option<String>) -> Self {
        Self {
            state: RwLock::new(RegistryState {
                services: Vec::new(),
                default_id,
            }),
        }
    }

    /// Register a backend, replacing any backend with the same id in place.
    pub async fn add(&self, service: Arc<dyn PersistenceService>) {
        let mut state = self.state.write().await;
        match state.services.iter().position(|s| s.id() == service.id()) {
            Some(index) => {
                tracing::warn!("Replacing persistence service '{}'", service.id());
                state.services[index] = service;
            }
            None => {
                tracing::info!("Registered persistence service '{}'", service.id());
                state.services.push(service);
            }
        }
    }

    pub async fn remove(&self, id: &str) -> Option<Arc<dyn PersistenceService>> {
        let mut state = self.state.write().await;
        let index = state.services.iter().position(|s| s.id() == id)?;
        tracing::info!("Unregistered persistence service '{}'", id);
        Some(state.services.remove(index))
    }

    pub async fn set_default_id(&self, default_id: Option<String>) {
        self.state.write().await.default_id = default_id;
    }

    pub async fn get_all(&self) -> Vec<Arc<dyn PersistenceService>> {
        self.state.read().await.services.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn PersistenceService>> {
        self.state
            .read()
            .await
            .services
            .iter()
            .find(|s| s.id() == id)
            .cloned()
    }

    /// The configured default id, or else the first registered backend.
    pub async fn default_id(&self) -> PersistenceResult<String> {
        let state = self.state.read().await;
        let first = state.services.first().ok_or(PersistenceError::NoBackendConfigured)?;
        Ok(state
            .default_id
            .clone()
            .unwrap_or_else(|| first.id().to_string()))
    }

    pub async fn default_service(&self) -> Option<Arc<dyn PersistenceService>> {
        let id = self.default_id().await.ok()?;
        self.get(&id).await
    }

    /// Look up the named backend, or the default one when no id is given.
    /// A named backend that is missing is never replaced by the default.
    pub async fn resolve(&self, service_id: Option<&str>) -> PersistenceResult<Arc<dyn PersistenceService>> {
        let id = match service_id {
            Some(id) => id.to_string(),
            None => self.default_id().await?,
        };
        self.get(&id).await.ok_or_else(|| {
            tracing::debug!("Persistence service not found '{}'.", id);
            PersistenceError::BackendNotFound { service_id: id }
        })
    }
}
