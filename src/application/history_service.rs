// History service - Turns stored samples into chart-ready series
use crate::application::persistence_service::QueryablePersistenceService;
use crate::application::service_registry::PersistenceServiceRegistry;
use crate::application::time_zone::{is_zero_epoch, parse_date_time, TimeZoneProvider};
use crate::domain::error::{PersistenceError, PersistenceResult};
use crate::domain::filter::{FilterCriteria, Ordering};
use crate::domain::history::{HistoricItem, ItemHistory};
use crate::domain::service::Capability;
use crate::domain::state::StateValue;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use futures::TryStreamExt;
use std::sync::Arc;
use std::time::Instant;

/// Parameters of a history request, as received from a caller.
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    /// Backend to read from; the default backend when `None`.
    pub service_id: Option<String>,
    pub item_key: String,
    pub begin: Option<String>,
    pub end: Option<String>,
    pub page_number: usize,
    /// `0` returns the whole window.
    pub page_size: usize,
    /// Pad the series with the last value before and first value after the window.
    pub boundary: bool,
}

impl HistoryQuery {
    pub fn new(item_key: impl Into<String>) -> Self {
        Self {
            item_key: item_key.into(),
            ..Self::default()
        }
    }
}

/// Resolved, strictly ordered query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub begin: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

#[derive(Clone)]
pub struct HistoryQueryEngine {
    registry: Arc<PersistenceServiceRegistry>,
    time_zone: Arc<dyn TimeZoneProvider>,
}

impl HistoryQueryEngine {
    pub fn new(registry: Arc<PersistenceServiceRegistry>, time_zone: Arc<dyn TimeZoneProvider>) -> Self {
        Self { registry, time_zone }
    }

    /// Resolve caller supplied bounds into a non-empty window.
    ///
    /// A missing, unparsable or zero end means now. A missing, unparsable or
    /// zero begin, or one not strictly before the end, means one day before
    /// the end.
    pub fn resolve_window(&self, begin: Option<&str>, end: Option<&str>) -> TimeWindow {
        let zone = self.time_zone.time_zone();

        let end = end
            .and_then(|raw| Self::parse_bound("end", raw, zone))
            .filter(|t| !is_zero_epoch(t))
            .unwrap_or_else(|| self.time_zone.now());

        let begin = begin
            .and_then(|raw| Self::parse_bound("begin", raw, zone))
            .filter(|t| !is_zero_epoch(t) && *t < end)
            .unwrap_or_else(|| end - Duration::days(1));

        TimeWindow { begin, end }
    }

    fn parse_bound(name: &str, raw: &str, zone: FixedOffset) -> Option<DateTime<FixedOffset>> {
        let parsed = parse_date_time(raw, zone);
        if parsed.is_none() {
            tracing::warn!("Ignoring unparsable {} time '{}'", name, raw);
        }
        parsed
    }

    pub async fn run(&self, query: &HistoryQuery) -> PersistenceResult<ItemHistory> {
        let started = Instant::now();

        let service = self.registry.resolve(query.service_id.as_deref()).await?;
        let queryable = service.as_queryable().ok_or_else(|| {
            tracing::debug!("Persistence service not queryable '{}'.", service.id());
            PersistenceError::unsupported(service.id(), Capability::Queryable)
        })?;

        let window = self.resolve_window(query.begin.as_deref(), query.end.as_deref());
        let begin = window.begin.with_timezone(&Utc);
        let end = window.end.with_timezone(&Utc);
        let mut history = ItemHistory::new(query.item_key.as_str());

        // Without the padding a rarely changing item starts after the chart
        // begins, or does not show at all.
        if query.boundary {
            let before = FilterCriteria::new(query.item_key.as_str())
                .with_end(begin)
                .with_page(0, 1)
                .with_ordering(Ordering::Descending);
            if let Some(item) = first_match(queryable, &before).await? {
                history.push(begin.timestamp_millis(), item.state);
            }
        }

        let filter = FilterCriteria::new(query.item_key.as_str())
            .with_begin(begin)
            .with_end(end)
            .with_page(query.page_number, query.page_size)
            .with_ordering(Ordering::Ascending);
        let mut items = queryable.query(&filter).await?;

        let mut previous: Option<StateValue> = None;
        while let Some(item) = items.try_next().await? {
            let time_ms = item.timestamp.timestamp_millis();

            // Binary states hold their value until the next change
            if item.state.is_binary() {
                if let Some(state) = &previous {
                    history.push(time_ms, state.clone());
                }
            }

            history.push(time_ms, item.state.clone());
            previous = Some(item.state);
        }

        if query.boundary {
            let after = FilterCriteria::new(query.item_key.as_str())
                .with_begin(end)
                .with_page(0, 1)
                .with_ordering(Ordering::Ascending);
            if let Some(item) = first_match(queryable, &after).await? {
                history.push(end.timestamp_millis(), item.state);
            }
        }

        tracing::debug!(
            "Persistence returned {} rows in {}ms",
            history.point_count,
            started.elapsed().as_millis()
        );
        Ok(history)
    }
}

async fn first_match(
    service: &dyn QueryablePersistenceService,
    filter: &FilterCriteria,
) -> PersistenceResult<Option<HistoricItem>> {
    service.query(filter).await?.try_next().await
}
