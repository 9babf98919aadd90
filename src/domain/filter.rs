// Filter criteria for querying and removing persisted data
use crate::domain::error::{PersistenceError, PersistenceResult};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ordering {
    #[default]
    Ascending,
    Descending,
}

/// Describes which samples of an item a query or removal applies to.
///
/// `begin` is inclusive and `end` exclusive. A page size of `0` or
/// `usize::MAX` means the whole time window is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub item_key: String,
    pub begin: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub page_number: usize,
    pub page_size: usize,
    pub ordering: Ordering,
}

impl FilterCriteria {
    pub fn new(item_key: impl Into<String>) -> Self {
        Self {
            item_key: item_key.into(),
            begin: None,
            end: None,
            page_number: 0,
            page_size: 0,
            ordering: Ordering::Ascending,
        }
    }

    pub fn with_begin(mut self, begin: DateTime<Utc>) -> Self {
        self.begin = Some(begin);
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_page(mut self, page_number: usize, page_size: usize) -> Self {
        self.page_number = page_number;
        self.page_size = page_size;
        self
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.page_size == 0 || self.page_size == usize::MAX
    }

    /// Whether a timestamp falls inside `[begin, end)`.
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        self.begin.is_none_or(|begin| *timestamp >= begin)
            && self.end.is_none_or(|end| *timestamp < end)
    }

    /// Number of leading matches to skip and the maximum to return.
    pub fn page_window(&self) -> (usize, Option<usize>) {
        if self.is_unbounded() {
            (0, None)
        } else {
            (self.page_number.saturating_mul(self.page_size), Some(self.page_size))
        }
    }

    /// The window a removal applies to. Both bounds are required and must be
    /// strictly ordered.
    pub fn removal_window(&self) -> PersistenceResult<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.begin, self.end) {
            (Some(begin), Some(end)) if begin < end => Ok((begin, end)),
            (Some(_), Some(_)) => Err(PersistenceError::InvalidFilter(
                "begin must be earlier than end".to_string(),
            )),
            _ => Err(PersistenceError::InvalidFilter(
                "begin and end must both be set for removal".to_string(),
            )),
        }
    }
}
