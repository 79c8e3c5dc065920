//! QueryWindow — the inclusive date range requested for one entity.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive calendar-date range with `start <= end`.
///
/// Ordered by `(start, end)` so bucket iteration is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueryWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl QueryWindow {
    /// Returns `None` for an inverted range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Window for an entity: `[max(reference, lower_bound), min(reference + horizon, today)]`.
    ///
    /// `None` means the entity is not (yet) collectable, e.g. its reference
    /// date lies after `today` or its horizon ended before `lower_bound`.
    pub fn for_reference(
        reference: NaiveDate,
        lower_bound: NaiveDate,
        today: NaiveDate,
        horizon_days: u32,
    ) -> Option<Self> {
        let start = reference.max(lower_bound);
        let horizon_end = reference
            .checked_add_days(Days::new(u64::from(horizon_days)))
            .unwrap_or(NaiveDate::MAX);
        let end = horizon_end.min(today);
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered (inclusive).
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn window_clamped_to_today() {
        let w = QueryWindow::for_reference(d(2024, 1, 10), d(2016, 1, 1), d(2024, 1, 20), 365)
            .unwrap();
        assert_eq!(w.start(), d(2024, 1, 10));
        assert_eq!(w.end(), d(2024, 1, 20));
        assert_eq!(w.len_days(), 11);
    }

    #[test]
    fn window_clamped_to_horizon() {
        let w = QueryWindow::for_reference(d(2023, 3, 1), d(2016, 1, 1), d(2025, 1, 1), 365)
            .unwrap();
        assert_eq!(w.end(), d(2024, 2, 29));
    }

    #[test]
    fn window_clamped_to_lower_bound() {
        let w = QueryWindow::for_reference(d(2015, 6, 1), d(2016, 1, 1), d(2025, 1, 1), 365)
            .unwrap();
        assert_eq!(w.start(), d(2016, 1, 1));
        assert_eq!(w.end(), d(2016, 5, 31));
    }

    #[test]
    fn future_reference_has_no_window() {
        assert!(
            QueryWindow::for_reference(d(2024, 2, 1), d(2016, 1, 1), d(2024, 1, 20), 365).is_none()
        );
    }

    #[test]
    fn horizon_before_lower_bound_has_no_window() {
        assert!(
            QueryWindow::for_reference(d(2014, 1, 1), d(2016, 1, 1), d(2024, 1, 20), 365).is_none()
        );
    }

    #[test]
    fn single_day_window_on_release_day() {
        let w = QueryWindow::for_reference(d(2024, 1, 20), d(2016, 1, 1), d(2024, 1, 20), 365)
            .unwrap();
        assert_eq!(w.len_days(), 1);
        assert!(w.contains(d(2024, 1, 20)));
        assert!(!w.contains(d(2024, 1, 21)));
    }

    #[test]
    fn display_uses_tilde() {
        let w = QueryWindow::new(d(2024, 1, 1), d(2024, 1, 5)).unwrap();
        assert_eq!(w.to_string(), "2024-01-01~2024-01-05");
    }
}
