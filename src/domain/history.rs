// Historic data domain models
use crate::domain::state::StateValue;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single persisted sample.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricItem {
    pub item_key: String,
    pub timestamp: DateTime<Utc>,
    pub state: StateValue,
}

impl HistoricItem {
    pub fn new(item_key: impl Into<String>, timestamp: DateTime<Utc>, state: StateValue) -> Self {
        Self {
            item_key: item_key.into(),
            timestamp,
            state,
        }
    }
}

/// What a backend knows about one of its items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistenceItemInfo {
    pub name: String,
    pub count: Option<usize>,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryDataPoint {
    pub time_ms: i64,
    pub state: StateValue,
}

/// Chart-ready history of a single item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemHistory {
    pub item_key: String,
    pub points: Vec<HistoryDataPoint>,
    pub point_count: usize,
}

impl ItemHistory {
    pub fn new(item_key: impl Into<String>) -> Self {
        Self {
            item_key: item_key.into(),
            points: Vec::new(),
            point_count: 0,
        }
    }

    pub fn push(&mut self, time_ms: i64, state: StateValue) {
        self.points.push(HistoryDataPoint { time_ms, state });
        self.point_count += 1;
    }
}
