// Test backends with narrower capabilities than the in-memory service
use crate::application::persistence_service::{
    HistoricItemStream, PersistenceService, QueryablePersistenceService,
};
use crate::domain::error::PersistenceResult;
use crate::domain::filter::FilterCriteria;
use crate::domain::history::{HistoricItem, PersistenceItemInfo};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Mutex;

/// Backend that only fulfils the base contract.
pub struct StandardOnlyService {
    id: String,
}

impl StandardOnlyService {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

#[async_trait]
impl PersistenceService for StandardOnlyService {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        format!("Standard {}", self.id)
    }

    async fn item_info(&self) -> PersistenceResult<Vec<PersistenceItemInfo>> {
        Ok(Vec::new())
    }
}

/// Queryable backend returning canned results and recording every filter.
pub struct RecordingService {
    id: String,
    results: Vec<HistoricItem>,
    filters: Mutex<Vec<FilterCriteria>>,
}

impl RecordingService {
    pub fn new(id: &str, results: Vec<HistoricItem>) -> Self {
        Self {
            id: id.to_string(),
            results,
            filters: Mutex::new(Vec::new()),
        }
    }

    pub fn filters(&self) -> Vec<FilterCriteria> {
        self.filters.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersistenceService for RecordingService {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> String {
        "Recording".to_string()
    }

    async fn item_info(&self) -> PersistenceResult<Vec<PersistenceItemInfo>> {
        Ok(Vec::new())
    }

    fn as_queryable(&self) -> Option<&dyn QueryablePersistenceService> {
        Some(self)
    }
}

#[async_trait]
impl QueryablePersistenceService for RecordingService {
    async fn query(&self, filter: &FilterCriteria) -> PersistenceResult<HistoricItemStream> {
        self.filters.lock().unwrap().push(filter.clone());
        let results = self.results.clone();
        Ok(stream::iter(results.into_iter().map(Ok)).boxed())
    }
}
