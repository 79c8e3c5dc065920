//! Entity — one catalog item (a film) whose search interest is tracked.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A catalog entry. Immutable once loaded.
///
/// `display_name` doubles as the search keyword submitted to the trend API,
/// so it is expected to already be cleaned for search use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub display_name: String,
    pub reference_date: NaiveDate,
}

impl Entity {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        reference_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            reference_date,
        }
    }
}
