// Application context - Builds and owns every persistence component
use crate::application::configuration_registry::{
    ManagedConfigurationProvider, PersistenceServiceConfigurationRegistry,
};
use crate::application::history_service::HistoryQueryEngine;
use crate::application::management_service::PersistenceManagementService;
use crate::application::persistence_service::PersistenceService;
use crate::application::service_registry::PersistenceServiceRegistry;
use crate::application::time_zone::TimeZoneProvider;
use crate::infrastructure::config::{BackendKind, Settings};
use crate::infrastructure::item_registry::StaticItemRegistry;
use crate::infrastructure::json_store::JsonFileConfigurationStore;
use crate::infrastructure::memory_service::InMemoryPersistenceService;
use crate::infrastructure::static_provider::StaticConfigurationProvider;
use crate::infrastructure::time_zone::FixedTimeZoneProvider;
use std::sync::Arc;

pub struct PersistenceContext {
    pub services: Arc<PersistenceServiceRegistry>,
    pub configurations: Arc<PersistenceServiceConfigurationRegistry>,
    pub managed: Arc<ManagedConfigurationProvider>,
    pub history: HistoryQueryEngine,
    pub management: PersistenceManagementService,
}

impl PersistenceContext {
    pub async fn initialize(settings: &Settings) -> anyhow::Result<Self> {
        let time_zone: Arc<dyn TimeZoneProvider> =
            Arc::new(FixedTimeZoneProvider::from_setting(settings.time_zone.as_deref())?);

        // Create services (infrastructure layer)
        let services = Arc::new(PersistenceServiceRegistry::new(settings.default_service.clone()));
        for service_settings in &settings.services {
            let label = service_settings
                .label
                .clone()
                .unwrap_or_else(|| service_settings.id.clone());
            let service: Arc<dyn PersistenceService> = match service_settings.kind {
                BackendKind::Memory => Arc::new(InMemoryPersistenceService::new(
                    service_settings.id.clone(),
                    label,
                )),
            };
            services.add(service).await;
        }

        // Configuration providers; static entries take precedence over managed ones
        let managed = match &settings.managed_storage {
            Some(path) => {
                let store = Arc::new(JsonFileConfigurationStore::new(path));
                Arc::new(ManagedConfigurationProvider::with_store(store).await?)
            }
            None => Arc::new(ManagedConfigurationProvider::new()),
        };
        let configurations = Arc::new(PersistenceServiceConfigurationRegistry::new());
        configurations
            .add_provider(Arc::new(StaticConfigurationProvider::new(
                settings.static_configurations()?,
            )))
            .await;
        configurations.add_provider(managed.clone()).await;

        let items = Arc::new(StaticItemRegistry::new(
            settings.items.iter().map(|i| (i.name.clone(), i.item_type)),
        ));

        let history = HistoryQueryEngine::new(services.clone(), time_zone.clone());
        let management = PersistenceManagementService::new(
            services.clone(),
            configurations.clone(),
            managed.clone(),
            items,
            time_zone,
        );

        Ok(Self {
            services,
            configurations,
            managed,
            history,
            management,
        })
    }

    /// Deregister every service and configuration provider.
    pub async fn shutdown(self) {
        for service in self.services.get_all().await {
            self.services.remove(service.id()).await;
        }
        self.configurations
            .remove_provider(StaticConfigurationProvider::NAME)
            .await;
        self.configurations
            .remove_provider(ManagedConfigurationProvider::NAME)
            .await;
        tracing::info!("Persistence context shut down");
    }
}
