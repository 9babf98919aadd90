// In-memory persistence service implementation
use crate::application::persistence_service::{
    HistoricItemStream, ModifiablePersistenceService, PersistenceService,
    QueryablePersistenceService,
};
use crate::domain::error::PersistenceResult;
use crate::domain::filter::{FilterCriteria, Ordering};
use crate::domain::history::{HistoricItem, PersistenceItemInfo};
use crate::domain::state::StateValue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use tokio::sync::RwLock;

type Series = BTreeMap<DateTime<Utc>, StateValue>;

/// Modifiable backend keeping every series in memory.
///
/// Samples are keyed by timestamp, so storing at an existing timestamp
/// replaces the previous state.
pub struct InMemoryPersistenceService {
    id: String,
    label: String,
    series: RwLock<HashMap<String, Series>>,
}

impl InMemoryPersistenceService {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            series: RwLock::new(HashMap::new()),
        }
    }

    fn bounds(filter: &FilterCriteria) -> (Bound<DateTime<Utc>>, Bound<DateTime<Utc>>) {
        let lower = filter.begin.map_or(Bound::Unbounded, Bound::Included);
        let upper = filter.end.map_or(Bound::Unbounded, Bound::Excluded);
        (lower, upper)
    }
}

#[async_trait]
impl PersistenceService for InMemoryPersistenceService {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    async fn item_info(&self) -> PersistenceResult<Vec<PersistenceItemInfo>> {
        let series = self.series.read().await;
        let mut infos: Vec<PersistenceItemInfo> = series
            .iter()
            .map(|(name, samples)| PersistenceItemInfo {
                name: name.clone(),
                count: Some(samples.len()),
                earliest: samples.keys().next().copied(),
                latest: samples.keys().next_back().copied(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    fn as_queryable(&self) -> Option<&dyn QueryablePersistenceService> {
        Some(self)
    }

    fn as_modifiable(&self) -> Option<&dyn ModifiablePersistenceService> {
        Some(self)
    }
}

#[async_trait]
impl QueryablePersistenceService for InMemoryPersistenceService {
    async fn query(&self, filter: &FilterCriteria) -> PersistenceResult<HistoricItemStream> {
        // An inverted window matches nothing; BTreeMap::range would panic on it.
        if let (Some(begin), Some(end)) = (filter.begin, filter.end) {
            if begin > end {
                return Ok(stream::empty().boxed());
            }
        }

        let series = self.series.read().await;
        let Some(samples) = series.get(&filter.item_key) else {
            return Ok(stream::empty().boxed());
        };

        let matching = samples.range(Self::bounds(filter));
        let ordered: Box<dyn Iterator<Item = (&DateTime<Utc>, &StateValue)> + Send> =
            match filter.ordering {
                Ordering::Ascending => Box::new(matching),
                Ordering::Descending => Box::new(matching.rev()),
            };

        let (skip, limit) = filter.page_window();
        let items: Vec<HistoricItem> = ordered
            .skip(skip)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(timestamp, state)| {
                HistoricItem::new(filter.item_key.clone(), *timestamp, state.clone())
            })
            .collect();

        tracing::debug!(
            "Memory service '{}' returned {} rows for {}",
            self.id,
            items.len(),
            filter.item_key
        );
        Ok(stream::iter(items.into_iter().map(Ok)).boxed())
    }
}

#[async_trait]
impl ModifiablePersistenceService for InMemoryPersistenceService {
    async fn store(
        &self,
        item_key: &str,
        timestamp: DateTime<Utc>,
        state: StateValue,
    ) -> PersistenceResult<()> {
        let mut series = self.series.write().await;
        series
            .entry(item_key.to_string())
            .or_default()
            .insert(timestamp, state);
        Ok(())
    }

    async fn remove(&self, filter: &FilterCriteria) -> PersistenceResult<usize> {
        let (begin, end) = filter.removal_window()?;

        let mut series = self.series.write().await;
        let Some(samples) = series.get_mut(&filter.item_key) else {
            return Ok(0);
        };

        let doomed: Vec<DateTime<Utc>> = samples.range(begin..end).map(|(t, _)| *t).collect();
        for timestamp in &doomed {
            samples.remove(timestamp);
        }
        if samples.is_empty() {
            series.remove(&filter.item_key);
        }

        tracing::debug!(
            "Memory service '{}' removed {} rows for {}",
            self.id,
            doomed.len(),
            filter.item_key
        );
        Ok(doomed.len())
    }
}
