//! Observation and its composite identity key.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite identity of one observation: `{entity_id}_{YYYY-MM-DD}`.
///
/// Used both for in-run dedup and for skipping rows already persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(entity_id: &str, date: NaiveDate) -> Self {
        Self(format!("{entity_id}_{}", date.format("%Y-%m-%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RecordKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relative search interest for one entity on one day.
///
/// `value` is in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub entity_id: String,
    pub display_name: String,
    pub date: NaiveDate,
    pub value: u8,
}

impl Observation {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.entity_id, self.date)
    }
}
