// Management service - Resolution and ownership rules for persistence operations
use crate::application::configuration_registry::{
    ManagedConfigurationProvider, PersistenceServiceConfigurationRegistry,
};
use crate::application::item_registry::ItemRegistry;
use crate::application::persistence_service::{ModifiablePersistenceService, PersistenceService};
use crate::application::service_registry::PersistenceServiceRegistry;
use crate::application::time_zone::{is_zero_epoch, parse_date_time, TimeZoneProvider};
use crate::domain::configuration::{
    ConfigurationErrors, PersistenceServiceConfiguration, PersistenceServiceConfigurationBuilder,
};
use crate::domain::error::{PersistenceError, PersistenceResult};
use crate::domain::filter::FilterCriteria;
use crate::domain::history::PersistenceItemInfo;
use crate::domain::service::{Capability, PersistenceServiceDescriptor};
use crate::domain::state::StateValue;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// Published after data was written through this service rather than by the
/// regular persistence strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceEvent {
    ExternalDataChanged { service_id: String, item_key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationView {
    pub configuration: PersistenceServiceConfiguration,
    /// True when the managed provider owns the configuration.
    pub editable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Updated,
}

#[derive(Clone)]
pub struct PersistenceManagementService {
    services: Arc<PersistenceServiceRegistry>,
    configurations: Arc<PersistenceServiceConfigurationRegistry>,
    managed: Arc<ManagedConfigurationProvider>,
    items: Arc<dyn ItemRegistry>,
    time_zone: Arc<dyn TimeZoneProvider>,
    events: broadcast::Sender<PersistenceEvent>,
}

impl PersistenceManagementService {
    pub fn new(
        services: Arc<PersistenceServiceRegistry>,
        configurations: Arc<PersistenceServiceConfigurationRegistry>,
        managed: Arc<ManagedConfigurationProvider>,
        items: Arc<dyn ItemRegistry>,
        time_zone: Arc<dyn TimeZoneProvider>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            services,
            configurations,
            managed,
            items,
            time_zone,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PersistenceEvent> {
        self.events.subscribe()
    }

    pub async fn list_services(&self) -> Vec<PersistenceServiceDescriptor> {
        self.services
            .get_all()
            .await
            .iter()
            .map(|s| PersistenceServiceDescriptor::describe(s.as_ref()))
            .collect()
    }

    pub async fn service_items(&self, service_id: Option<&str>) -> PersistenceResult<Vec<PersistenceItemInfo>> {
        let service = self.services.resolve(service_id).await?;
        service.item_info().await
    }

    pub async fn get_configuration(&self, service_id: &str) -> PersistenceResult<ConfigurationView> {
        let configuration = self.configurations.get(service_id).await.ok_or_else(|| {
            PersistenceError::ConfigurationNotFound {
                service_id: service_id.to_string(),
            }
        })?;
        let editable = self.managed.get(service_id).await.is_some();
        Ok(ConfigurationView {
            configuration,
            editable,
        })
    }

    /// Create or update the configuration of `service_id`.
    ///
    /// Unknown ids are created in the managed provider, managed ids are
    /// updated, and ids owned by any other provider are rejected.
    pub async fn put_configuration(
        &self,
        service_id: &str,
        payload: PersistenceServiceConfigurationBuilder,
    ) -> PersistenceResult<PutOutcome> {
        if payload.service_id() != Some(service_id) {
            return Err(PersistenceError::InvalidConfiguration(ConfigurationErrors(vec![
                format!(
                    "serviceId in payload '{}' differs from serviceId in request '{}'",
                    payload.service_id().unwrap_or_default(),
                    service_id
                ),
            ])));
        }

        let configuration = payload.build().map_err(|errors| {
            tracing::warn!("Rejected configuration for '{}': {}", service_id, errors);
            PersistenceError::InvalidConfiguration(errors)
        })?;

        if self.configurations.get(service_id).await.is_none() {
            self.managed.add(configuration).await?;
            tracing::info!("Created persistence configuration '{}'", service_id);
            return Ok(PutOutcome::Created);
        }

        if self.managed.get(service_id).await.is_some() {
            self.managed.update(configuration).await?;
            tracing::info!("Updated persistence configuration '{}'", service_id);
            return Ok(PutOutcome::Updated);
        }

        tracing::warn!(
            "Cannot update existing persistence service configuration '{}', because is not managed.",
            service_id
        );
        Err(PersistenceError::ConfigurationNotEditable {
            service_id: service_id.to_string(),
        })
    }

    pub async fn delete_configuration(&self, service_id: &str) -> PersistenceResult<PersistenceServiceConfiguration> {
        if self.configurations.get(service_id).await.is_none() {
            return Err(PersistenceError::ConfigurationNotFound {
                service_id: service_id.to_string(),
            });
        }
        self.managed
            .remove(service_id)
            .await?
            .ok_or_else(|| PersistenceError::ConfigurationNotEditable {
                service_id: service_id.to_string(),
            })
    }

    /// Delete the samples of an item between two times. Deletes always
    /// name their backend; the default is never used.
    pub async fn remove_item_data(
        &self,
        service_id: &str,
        item_key: &str,
        begin: Option<&str>,
        end: Option<&str>,
    ) -> PersistenceResult<usize> {
        if service_id.is_empty() {
            return Err(PersistenceError::InvalidFilter(
                "persistence service must be specified for delete operations".to_string(),
            ));
        }

        let service = self.services.resolve(Some(service_id)).await?;
        let modifiable = Self::modifiable(service.as_ref())?;

        let (Some(begin), Some(end)) = (begin, end) else {
            return Err(PersistenceError::InvalidFilter(
                "the start and end time must be set".to_string(),
            ));
        };
        let filter = FilterCriteria::new(item_key)
            .with_begin(self.parse_time(begin)?)
            .with_end(self.parse_time(end)?);
        filter.removal_window()?;

        let removed = modifiable.remove(&filter).await?;
        tracing::debug!("Removed {} rows of {} from '{}'", removed, item_key, service_id);
        Ok(removed)
    }

    /// Parse `raw_value` for the item and store it at `time`, then announce
    /// the change.
    pub async fn store_item_state(
        &self,
        service_id: Option<&str>,
        item_key: &str,
        raw_value: &str,
        time: Option<&str>,
    ) -> PersistenceResult<()> {
        let service = self.services.resolve(service_id).await?;
        let modifiable = Self::modifiable(service.as_ref())?;

        let item_type = self.items.item_type(item_key).ok_or_else(|| {
            tracing::warn!("Item not found '{}'.", item_key);
            PersistenceError::ItemNotFound {
                item_key: item_key.to_string(),
            }
        })?;

        let state = StateValue::parse(raw_value, item_type.accepted_state_kinds()).ok_or_else(|| {
            tracing::warn!("Can't persist item {} with invalid state '{}'.", item_key, raw_value);
            PersistenceError::InvalidState {
                item_key: item_key.to_string(),
                value: raw_value.to_string(),
            }
        })?;

        let timestamp = time
            .map(|raw| self.parse_time(raw))
            .transpose()?
            .filter(|t| !is_zero_epoch(&t.fixed_offset()))
            .ok_or_else(|| {
                tracing::warn!("Error with persistence store to {}. Time badly formatted {:?}.", item_key, time);
                PersistenceError::InvalidFilter("time badly formatted".to_string())
            })?;

        modifiable.store(item_key, timestamp, state).await?;

        // Nobody listening is not an error
        let _ = self.events.send(PersistenceEvent::ExternalDataChanged {
            service_id: service.id().to_string(),
            item_key: item_key.to_string(),
        });
        Ok(())
    }

    fn modifiable(service: &dyn PersistenceService) -> PersistenceResult<&dyn ModifiablePersistenceService> {
        service.as_modifiable().ok_or_else(|| {
            tracing::warn!("Persistence service not modifiable '{}'.", service.id());
            PersistenceError::unsupported(service.id(), Capability::Modifiable)
        })
    }

    fn parse_time(&self, raw: &str) -> PersistenceResult<DateTime<Utc>> {
        parse_date_time(raw, self.time_zone.time_zone())
            .map(|t| t.with_timezone(&Utc))
            .ok_or_else(|| PersistenceError::InvalidFilter(format!("unparsable time '{}'", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::persistence_service::QueryablePersistenceService;
    use crate::application::test_support::{RecordingService, StandardOnlyService};
    use crate::domain::configuration::PersistenceItemConfiguration;
    use crate::domain::error::ErrorKind;
    use crate::domain::state::{ItemType, OnOff};
    use crate::infrastructure::item_registry::StaticItemRegistry;
    use crate::infrastructure::memory_service::InMemoryPersistenceService;
    use crate::infrastructure::static_provider::StaticConfigurationProvider;
    use crate::infrastructure::time_zone::FixedTimeZoneProvider;
    use chrono::TimeZone;
    use futures::TryStreamExt;

    struct Fixture {
        management: PersistenceManagementService,
        memory: Arc<InMemoryPersistenceService>,
        managed: Arc<ManagedConfigurationProvider>,
    }

    fn payload(service_id: &str, items: &[&str]) -> PersistenceServiceConfigurationBuilder {
        PersistenceServiceConfiguration::builder(service_id).with_config(PersistenceItemConfiguration {
            items: items.iter().map(|i| i.to_string()).collect(),
            strategies: vec!["everyChange".to_string()],
            filters: vec![],
        })
    }

    async fn fixture() -> Fixture {
        let services = Arc::new(PersistenceServiceRegistry::new(None));
        let memory = Arc::new(InMemoryPersistenceService::new("memory", "Memory"));
        services.add(memory.clone()).await;
        services
            .add(Arc::new(RecordingService::new("readonly", Vec::new())))
            .await;
        services.add(Arc::new(StandardOnlyService::new("plain"))).await;

        let fixed = payload("rrd4j", &["*"]).build().unwrap();
        let configurations = Arc::new(PersistenceServiceConfigurationRegistry::new());
        configurations
            .add_provider(Arc::new(StaticConfigurationProvider::new(vec![fixed])))
            .await;
        let managed = Arc::new(ManagedConfigurationProvider::new());
        configurations.add_provider(managed.clone()).await;

        let items = StaticItemRegistry::new([
            ("Lamp".to_string(), ItemType::Switch),
            ("Temp".to_string(), ItemType::Number),
        ]);

        let management = PersistenceManagementService::new(
            services,
            configurations,
            managed.clone(),
            Arc::new(items),
            Arc::new(FixedTimeZoneProvider::utc()),
        );
        Fixture {
            management,
            memory,
            managed,
        }
    }

    #[tokio::test]
    async fn test_list_services_reports_capabilities() {
        let f = fixture().await;
        let services = f.management.list_services().await;
        let capabilities: Vec<_> = services.iter().map(|s| (s.id.as_str(), s.capability)).collect();
        assert_eq!(
            capabilities,
            vec![
                ("memory", Capability::Modifiable),
                ("readonly", Capability::Queryable),
                ("plain", Capability::Standard),
            ]
        );
        assert_eq!(services[0].label, "Memory");
    }

    #[tokio::test]
    async fn test_configuration_lifecycle() {
        let f = fixture().await;

        let outcome = f.management.put_configuration("jdbc", payload("jdbc", &["Lamp"])).await.unwrap();
        assert_eq!(outcome, PutOutcome::Created);
        let view = f.management.get_configuration("jdbc").await.unwrap();
        assert!(view.editable);
        assert_eq!(view.configuration.service_id, "jdbc");

        let outcome = f.management.put_configuration("jdbc", payload("jdbc", &["Temp"])).await.unwrap();
        assert_eq!(outcome, PutOutcome::Updated);
        let view = f.management.get_configuration("jdbc").await.unwrap();
        assert_eq!(view.configuration.configs[0].items, vec!["Temp"]);

        let removed = f.management.delete_configuration("jdbc").await.unwrap();
        assert_eq!(removed.service_id, "jdbc");
        let err = f.management.get_configuration("jdbc").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationNotFound);
    }

    #[tokio::test]
    async fn test_static_configuration_is_read_only() {
        let f = fixture().await;

        let view = f.management.get_configuration("rrd4j").await.unwrap();
        assert!(!view.editable);

        let err = f.management.put_configuration("rrd4j", payload("rrd4j", &["Lamp"])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationNotEditable);

        let err = f.management.delete_configuration("rrd4j").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationNotEditable);
        assert!(f.management.get_configuration("rrd4j").await.is_ok());
        assert!(f.managed.get("rrd4j").await.is_none());

        let err = f.management.delete_configuration("influxdb").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationNotFound);
    }

    #[tokio::test]
    async fn test_put_rejects_bad_payloads() {
        let f = fixture().await;

        let err = f
            .management
            .put_configuration("jdbc", payload("mapdb", &["Lamp"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

        let unnamed = PersistenceServiceConfigurationBuilder::default().with_config(PersistenceItemConfiguration {
            items: vec!["Lamp".to_string()],
            strategies: vec![],
            filters: vec![],
        });
        let err = f.management.put_configuration("jdbc", unnamed).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);

        let err = f.management.put_configuration("jdbc", payload("jdbc", &[])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert!(f.managed.get("jdbc").await.is_none());
    }

    #[tokio::test]
    async fn test_store_item_state() {
        let f = fixture().await;
        let mut events = f.management.subscribe();

        f.management
            .store_item_state(None, "Lamp", "ON", Some("2024-03-01T12:00:00Z"))
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            PersistenceEvent::ExternalDataChanged {
                service_id: "memory".to_string(),
                item_key: "Lamp".to_string(),
            }
        );

        let infos = f.memory.item_info().await.unwrap();
        assert_eq!(infos[0].name, "Lamp");
        assert_eq!(infos[0].latest, Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));

        let mut stream = f.memory.query(&FilterCriteria::new("Lamp")).await.unwrap();
        let item = stream.try_next().await.unwrap().unwrap();
        assert_eq!(item.state, StateValue::OnOff(OnOff::On));
    }

    #[tokio::test]
    async fn test_store_item_state_failures() {
        let f = fixture().await;
        let at = Some("2024-03-01T12:00:00Z");

        let cases = [
            (Some("plain"), "Lamp", "ON", at, ErrorKind::CapabilityUnsupported),
            (Some("readonly"), "Lamp", "ON", at, ErrorKind::CapabilityUnsupported),
            (Some("missing"), "Lamp", "ON", at, ErrorKind::BackendNotFound),
            (None, "Ghost", "ON", at, ErrorKind::ItemNotFound),
            (None, "Lamp", "42", at, ErrorKind::InvalidState),
            (None, "Temp", "ON", at, ErrorKind::InvalidState),
            (None, "Temp", "21.5", None, ErrorKind::InvalidFilter),
            (None, "Temp", "21.5", Some("1970-01-01T00:00:00Z"), ErrorKind::InvalidFilter),
            (None, "Temp", "21.5", Some("soon"), ErrorKind::InvalidFilter),
        ];
        for (service_id, item, value, time, expected) in cases {
            let err = f
                .management
                .store_item_state(service_id, item, value, time)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), expected, "{:?} {} {}", service_id, item, value);
        }
        assert!(f.memory.item_info().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_item_data() {
        let f = fixture().await;
        for time in ["2024-03-01T10:00:00Z", "2024-03-01T11:00:00Z", "2024-03-01T12:00:00Z"] {
            f.management
                .store_item_state(Some("memory"), "Temp", "20", Some(time))
                .await
                .unwrap();
        }

        let removed = f
            .management
            .remove_item_data("memory", "Temp", Some("2024-03-01T10:30:00Z"), Some("2024-03-01T12:00:00Z"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(f.memory.item_info().await.unwrap()[0].count, Some(2));
    }

    #[tokio::test]
    async fn test_remove_item_data_failures() {
        let f = fixture().await;
        let begin = Some("2024-03-01T10:00:00Z");
        let end = Some("2024-03-01T11:00:00Z");

        let cases = [
            ("", begin, end, ErrorKind::InvalidFilter),
            ("missing", begin, end, ErrorKind::BackendNotFound),
            ("readonly", begin, end, ErrorKind::CapabilityUnsupported),
            ("memory", None, end, ErrorKind::InvalidFilter),
            ("memory", begin, Some("later"), ErrorKind::InvalidFilter),
            ("memory", begin, begin, ErrorKind::InvalidFilter),
            ("memory", end, begin, ErrorKind::InvalidFilter),
        ];
        for (service_id, begin, end, expected) in cases {
            let err = f
                .management
                .remove_item_data(service_id, "Temp", begin, end)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), expected, "{} {:?} {:?}", service_id, begin, end);
        }
    }

    #[tokio::test]
    async fn test_service_items() {
        let f = fixture().await;
        f.management
            .store_item_state(None, "Temp", "20", Some("2024-03-01T10:00:00Z"))
            .await
            .unwrap();

        let items = f.management.service_items(None).await.unwrap();
        assert_eq!(items.len(), 1);
        assert!(f.management.service_items(Some("plain")).await.unwrap().is_empty());
        let err = f.management.service_items(Some("missing")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BackendNotFound);
    }
}
