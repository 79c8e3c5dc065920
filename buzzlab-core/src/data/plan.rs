//! Bucket planning: per-entity query windows grouped into shared buckets.
//!
//! Two entities share a bucket iff their windows are identical. Entities
//! without a valid window (not yet released, or aged out before the lower
//! bound) are skipped; that is steady-state behavior, not an error.

use super::batch::batch_count;
use crate::domain::{Entity, QueryWindow};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Default horizon after the reference date.
pub const DEFAULT_HORIZON_DAYS: u32 = 365;

/// Inputs that bound every query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanOptions {
    /// Earliest date the trend API serves.
    pub lower_bound: NaiveDate,
    pub today: NaiveDate,
    pub horizon_days: u32,
}

/// Entities sharing one query window, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub window: QueryWindow,
    pub entities: Vec<Entity>,
}

/// Buckets in ascending window order plus the number of skipped entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub buckets: Vec<Bucket>,
    pub skipped: usize,
}

impl Plan {
    pub fn entity_count(&self) -> usize {
        self.buckets.iter().map(|b| b.entities.len()).sum()
    }

    /// Number of batch calls the plan needs at the given group size.
    pub fn batch_count(&self, group_size: usize) -> usize {
        self.buckets
            .iter()
            .map(|b| batch_count(b.entities.len(), group_size))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Compute windows and group entities by identical window.
pub fn plan_buckets(entities: &[Entity], opts: &PlanOptions) -> Plan {
    let mut by_window: BTreeMap<QueryWindow, Vec<Entity>> = BTreeMap::new();
    let mut skipped = 0;

    for entity in entities {
        match QueryWindow::for_reference(
            entity.reference_date,
            opts.lower_bound,
            opts.today,
            opts.horizon_days,
        ) {
            Some(window) => by_window.entry(window).or_default().push(entity.clone()),
            None => {
                debug!(
                    entity = %entity.id,
                    reference = %entity.reference_date,
                    "no collectable window, skipping"
                );
                skipped += 1;
            }
        }
    }

    Plan {
        buckets: by_window
            .into_iter()
            .map(|(window, entities)| Bucket { window, entities })
            .collect(),
        skipped,
    }
}
