// Persistence service configuration registry and providers
use crate::domain::configuration::PersistenceServiceConfiguration;
use crate::domain::error::{PersistenceError, PersistenceResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A source of persistence service configurations.
#[async_trait]
pub trait PersistenceServiceConfigurationProvider: Send + Sync {
    /// Unique provider name, used for deregistration
    fn name(&self) -> &str;

    async fn get_all(&self) -> Vec<PersistenceServiceConfiguration>;

    async fn get(&self, service_id: &str) -> Option<PersistenceServiceConfiguration> {
        self.get_all()
            .await
            .into_iter()
            .find(|c| c.service_id == service_id)
    }
}

/// Durable backing for the managed provider.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn load(&self) -> PersistenceResult<Vec<PersistenceServiceConfiguration>>;
    async fn save(&self, configurations: &[PersistenceServiceConfiguration]) -> PersistenceResult<()>;
}

/// Read access to the configurations of every registered provider.
///
/// Providers are consulted in registration order; the first one holding an
/// id wins.
#[derive(Default)]
pub struct PersistenceServiceConfigurationRegistry {
    providers: RwLock<Vec<Arc<dyn PersistenceServiceConfigurationProvider>>>,
}

impl PersistenceServiceConfigurationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_provider(&self, provider: Arc<dyn PersistenceServiceConfigurationProvider>) {
        tracing::debug!("Added configuration provider '{}'", provider.name());
        self.providers.write().await.push(provider);
    }

    pub async fn remove_provider(&self, name: &str) -> bool {
        let mut providers = self.providers.write().await;
        let before = providers.len();
        providers.retain(|p| p.name() != name);
        before != providers.len()
    }

    pub async fn get(&self, service_id: &str) -> Option<PersistenceServiceConfiguration> {
        let providers = self.providers.read().await.clone();
        for provider in providers {
            if let Some(configuration) = provider.get(service_id).await {
                return Some(configuration);
            }
        }
        None
    }

    pub async fn get_all(&self) -> Vec<PersistenceServiceConfiguration> {
        let providers = self.providers.read().await.clone();
        let mut seen = HashSet::new();
        let mut all = Vec::new();
        for provider in providers {
            for configuration in provider.get_all().await {
                if seen.insert(configuration.service_id.clone()) {
                    all.push(configuration);
                }
            }
        }
        all
    }
}

/// Editable provider; the only writer of the configurations it owns.
#[derive(Default)]
pub struct ManagedConfigurationProvider {
    entries: RwLock<BTreeMap<String, PersistenceServiceConfiguration>>,
    store: Option<Arc<dyn ConfigurationStore>>,
}

impl ManagedConfigurationProvider {
    pub const NAME: &'static str = "managed";

    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider backed by `store`, loading what it already holds.
    pub async fn with_store(store: Arc<dyn ConfigurationStore>) -> PersistenceResult<Self> {
        let entries = store
            .load()
            .await?
            .into_iter()
            .map(|c| (c.service_id.clone(), c))
            .collect::<BTreeMap<_, _>>();
        tracing::info!("Loaded {} managed persistence configurations", entries.len());
        Ok(Self {
            entries: RwLock::new(entries),
            store: Some(store),
        })
    }

    pub async fn get(&self, service_id: &str) -> Option<PersistenceServiceConfiguration> {
        self.entries.read().await.get(service_id).cloned()
    }

    pub async fn get_all(&self) -> Vec<PersistenceServiceConfiguration> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Fails with `ConfigurationConflict` if this provider already owns the id.
    pub async fn add(&self, configuration: PersistenceServiceConfiguration) -> PersistenceResult<()> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(&configuration.service_id) {
            return Err(PersistenceError::ConfigurationConflict {
                service_id: configuration.service_id,
            });
        }
        let mut next = entries.clone();
        next.insert(configuration.service_id.clone(), configuration);
        self.persist(&next).await?;
        *entries = next;
        Ok(())
    }

    /// Replace an owned configuration, returning the previous one. Ids this
    /// provider does not own are left alone and yield `None`.
    pub async fn update(
        &self,
        configuration: PersistenceServiceConfiguration,
    ) -> PersistenceResult<Option<PersistenceServiceConfiguration>> {
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&configuration.service_id) {
            return Ok(None);
        }
        let mut next = entries.clone();
        let previous = next.insert(configuration.service_id.clone(), configuration);
        self.persist(&next).await?;
        *entries = next;
        Ok(previous)
    }

    /// Remove an owned configuration. Ids this provider does not own yield
    /// `None`.
    pub async fn remove(&self, service_id: &str) -> PersistenceResult<Option<PersistenceServiceConfiguration>> {
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        let Some(removed) = next.remove(service_id) else {
            return Ok(None);
        };
        self.persist(&next).await?;
        *entries = next;
        Ok(Some(removed))
    }

    // Entries are only swapped in once the store accepted them.
    async fn persist(&self, entries: &BTreeMap<String, PersistenceServiceConfiguration>) -> PersistenceResult<()> {
        match &self.store {
            Some(store) => {
                let snapshot: Vec<_> = entries.values().cloned().collect();
                store.save(&snapshot).await.inspect_err(|e| {
                    tracing::warn!("Failed to save managed configurations: {}", e);
                })
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PersistenceServiceConfigurationProvider for ManagedConfigurationProvider {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn get_all(&self) -> Vec<PersistenceServiceConfiguration> {
        ManagedConfigurationProvider::get_all(self).await
    }

    async fn get(&self, service_id: &str) -> Option<PersistenceServiceConfiguration> {
        ManagedConfigurationProvider::get(self, service_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::configuration::PersistenceItemConfiguration;
    use crate::domain::error::ErrorKind;
    use crate::infrastructure::static_provider::StaticConfigurationProvider;

    fn configuration(service_id: &str, item: &str) -> PersistenceServiceConfiguration {
        PersistenceServiceConfiguration::builder(service_id)
            .with_config(PersistenceItemConfiguration {
                items: vec![item.to_string()],
                strategies: vec!["everyChange".to_string()],
                filters: vec![],
            })
            .build()
            .unwrap()
    }

    async fn registry_with(
        managed: Arc<ManagedConfigurationProvider>,
        fixed: Vec<PersistenceServiceConfiguration>,
    ) -> PersistenceServiceConfigurationRegistry {
        let registry = PersistenceServiceConfigurationRegistry::new();
        registry
            .add_provider(Arc::new(StaticConfigurationProvider::new(fixed)))
            .await;
        registry.add_provider(managed).await;
        registry
    }

    #[tokio::test]
    async fn test_add_conflicts_with_owned_id() {
        let managed = ManagedConfigurationProvider::new();
        managed.add(configuration("jdbc", "Lamp")).await.unwrap();

        let err = managed.add(configuration("jdbc", "Door")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationConflict);
        assert_eq!(managed.get("jdbc").await.unwrap().configs[0].items, vec!["Lamp"]);
    }

    #[tokio::test]
    async fn test_update_only_touches_owned_ids() {
        let managed = ManagedConfigurationProvider::new();
        assert_eq!(managed.update(configuration("jdbc", "Lamp")).await.unwrap(), None);
        assert!(managed.get("jdbc").await.is_none());

        managed.add(configuration("jdbc", "Lamp")).await.unwrap();
        let previous = managed.update(configuration("jdbc", "Door")).await.unwrap();
        assert_eq!(previous, Some(configuration("jdbc", "Lamp")));
        assert_eq!(managed.get("jdbc").await, Some(configuration("jdbc", "Door")));
    }

    #[tokio::test]
    async fn test_remove_ignores_unmanaged_entries() {
        let managed = Arc::new(ManagedConfigurationProvider::new());
        let registry = registry_with(managed.clone(), vec![configuration("rrd4j", "Lamp")]).await;

        assert_eq!(managed.remove("rrd4j").await.unwrap(), None);
        assert_eq!(registry.get("rrd4j").await, Some(configuration("rrd4j", "Lamp")));
    }

    #[tokio::test]
    async fn test_registry_merges_providers_in_order() {
        let managed = Arc::new(ManagedConfigurationProvider::new());
        let registry = registry_with(managed.clone(), vec![configuration("rrd4j", "Lamp")]).await;
        managed.add(configuration("rrd4j", "Door")).await.unwrap();
        managed.add(configuration("mapdb", "Door")).await.unwrap();

        assert_eq!(registry.get("rrd4j").await, Some(configuration("rrd4j", "Lamp")));
        assert_eq!(registry.get("mapdb").await, Some(configuration("mapdb", "Door")));
        assert!(registry.get("influxdb").await.is_none());

        let ids: Vec<_> = registry.get_all().await.into_iter().map(|c| c.service_id).collect();
        assert_eq!(ids, vec!["rrd4j", "mapdb"]);

        assert!(registry.remove_provider(ManagedConfigurationProvider::NAME).await);
        assert!(registry.get("mapdb").await.is_none());
    }

    struct FlakyStore {
        failing: std::sync::atomic::AtomicBool,
        initial: Vec<PersistenceServiceConfiguration>,
    }

    #[async_trait]
    impl ConfigurationStore for FlakyStore {
        async fn load(&self) -> PersistenceResult<Vec<PersistenceServiceConfiguration>> {
            Ok(self.initial.clone())
        }

        async fn save(&self, _: &[PersistenceServiceConfiguration]) -> PersistenceResult<()> {
            if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(PersistenceError::Storage("disk full".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_save_leaves_entries_unchanged() {
        let store = Arc::new(FlakyStore {
            failing: std::sync::atomic::AtomicBool::new(true),
            initial: vec![configuration("jdbc", "Lamp")],
        });
        let managed = ManagedConfigurationProvider::with_store(store.clone()).await.unwrap();

        let err = managed.add(configuration("mapdb", "Door")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(managed.get("mapdb").await.is_none());

        assert!(managed.update(configuration("jdbc", "Door")).await.is_err());
        assert_eq!(managed.get("jdbc").await, Some(configuration("jdbc", "Lamp")));

        assert!(managed.remove("jdbc").await.is_err());
        assert_eq!(managed.get_all().await, vec![configuration("jdbc", "Lamp")]);

        store.failing.store(false, std::sync::atomic::Ordering::SeqCst);
        managed.add(configuration("mapdb", "Door")).await.unwrap();
        assert_eq!(managed.get("mapdb").await, Some(configuration("mapdb", "Door")));
    }
}
