// Persistence service capability traits
use crate::domain::error::PersistenceResult;
use crate::domain::filter::FilterCriteria;
use crate::domain::history::{HistoricItem, PersistenceItemInfo};
use crate::domain::service::{Capability, PersistenceServiceDescriptor};
use crate::domain::state::StateValue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

/// Samples produced by a query. Consumed once; query again to restart.
pub type HistoricItemStream = BoxStream<'static, PersistenceResult<HistoricItem>>;

/// Base contract every backend fulfils.
///
/// Wider capabilities are discovered through [`as_queryable`] and
/// [`as_modifiable`], which backends override to return themselves.
///
/// [`as_queryable`]: PersistenceService::as_queryable
/// [`as_modifiable`]: PersistenceService::as_modifiable
#[async_trait]
pub trait PersistenceService: Send + Sync {
    fn id(&self) -> &str;

    /// Human readable name
    fn label(&self) -> String;

    /// Items this backend holds data for
    async fn item_info(&self) -> PersistenceResult<Vec<PersistenceItemInfo>>;

    fn as_queryable(&self) -> Option<&dyn QueryablePersistenceService> {
        None
    }

    fn as_modifiable(&self) -> Option<&dyn ModifiablePersistenceService> {
        None
    }
}

#[async_trait]
pub trait QueryablePersistenceService: PersistenceService {
    /// Run a query. Results honor `filter.ordering` and paging.
    async fn query(&self, filter: &FilterCriteria) -> PersistenceResult<HistoricItemStream>;
}

#[async_trait]
pub trait ModifiablePersistenceService: QueryablePersistenceService {
    /// Store a state at a given time. Storing the same sample twice leaves
    /// later queries consistent.
    async fn store(
        &self,
        item_key: &str,
        timestamp: DateTime<Utc>,
        state: StateValue,
    ) -> PersistenceResult<()>;

    /// Remove every sample of `filter.item_key` in `[begin, end)`.
    ///
    /// Fails with `InvalidFilter` unless both bounds are set and ordered.
    async fn remove(&self, filter: &FilterCriteria) -> PersistenceResult<usize>;
}

impl Capability {
    pub fn of(service: &dyn PersistenceService) -> Capability {
        if service.as_modifiable().is_some() {
            Capability::Modifiable
        } else if service.as_queryable().is_some() {
            Capability::Queryable
        } else {
            Capability::Standard
        }
    }
}

impl PersistenceServiceDescriptor {
    pub fn describe(service: &dyn PersistenceService) -> Self {
        Self {
            id: service.id().to_string(),
            label: service.label(),
            capability: Capability::of(service),
        }
    }
}
