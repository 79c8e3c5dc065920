//! Series extraction: batch response → per-entity observations.
//!
//! Results are correlated with the submitted chunk by position. The API
//! does not send entity ids, so the correlation is checked as far as the
//! response allows: the group count must match, and when a result echoes its
//! group title it must equal the submitted group name. Any mismatch fails the
//! chunk instead of attributing a series to the wrong entity.

use super::provider::{FetchError, SearchResponse};
use crate::domain::{Entity, Observation, QueryWindow};
use chrono::NaiveDate;
use tracing::warn;

/// Round a ratio to an integer in `[0, 100]`, ties to even.
pub fn ratio_to_value(ratio: f64) -> u8 {
    if !ratio.is_finite() {
        return 0;
    }
    ratio.round_ties_even().clamp(0.0, 100.0) as u8
}

/// Convert a successful batch response into observations, in chunk order.
///
/// Periods outside `window` are dropped with a warning; an empty series
/// yields nothing for that entity.
pub fn extract_observations(
    response: &SearchResponse,
    chunk: &[Entity],
    window: &QueryWindow,
) -> Result<Vec<Observation>, FetchError> {
    if response.results.len() != chunk.len() {
        return Err(FetchError::ResponseMismatch(format!(
            "submitted {} groups for {window}, received {} series",
            chunk.len(),
            response.results.len()
        )));
    }

    let mut observations = Vec::new();

    for (position, (entity, series)) in chunk.iter().zip(&response.results).enumerate() {
        if let Some(title) = series.title.as_deref() {
            if title != entity.display_name {
                return Err(FetchError::ResponseMismatch(format!(
                    "series {position} is titled '{title}', expected '{}'",
                    entity.display_name
                )));
            }
        }

        for point in &series.data {
            let date = NaiveDate::parse_from_str(point.period.trim(), "%Y-%m-%d").map_err(|e| {
                FetchError::ResponseFormatChanged(format!(
                    "invalid period '{}' for {}: {e}",
                    point.period, entity.id
                ))
            })?;

            if !window.contains(date) {
                warn!(
                    entity = %entity.id,
                    %date,
                    window = %window,
                    "dropping period outside the requested window"
                );
                continue;
            }

            observations.push(Observation {
                entity_id: entity.id.clone(),
                display_name: entity.display_name.clone(),
                date,
                value: ratio_to_value(point.ratio),
            });
        }
    }

    Ok(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{SeriesPoint, SeriesResult};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window() -> QueryWindow {
        QueryWindow::new(d(2024, 1, 10), d(2024, 1, 20)).unwrap()
    }

    fn series(title: Option<&str>, points: &[(&str, f64)]) -> SeriesResult {
        SeriesResult {
            title: title.map(str::to_string),
            data: points
                .iter()
                .map(|(p, r)| SeriesPoint {
                    period: p.to_string(),
                    ratio: *r,
                })
                .collect(),
        }
    }

    fn chunk() -> Vec<Entity> {
        vec![
            Entity::new("M100", "Exhuma", d(2024, 1, 10)),
            Entity::new("M101", "Wonka", d(2024, 1, 10)),
        ]
    }

    #[test]
    fn rounds_ratio_to_nearest_integer() {
        assert_eq!(ratio_to_value(57.4), 57);
        assert_eq!(ratio_to_value(57.6), 58);
        assert_eq!(ratio_to_value(100.0), 100);
        assert_eq!(ratio_to_value(0.2), 0);
    }

    #[test]
    fn rounding_ties_go_to_even() {
        assert_eq!(ratio_to_value(56.5), 56);
        assert_eq!(ratio_to_value(57.5), 58);
        assert_eq!(ratio_to_value(0.5), 0);
    }

    #[test]
    fn out_of_range_ratios_are_clamped() {
        assert_eq!(ratio_to_value(-3.0), 0);
        assert_eq!(ratio_to_value(140.2), 100);
        assert_eq!(ratio_to_value(f64::NAN), 0);
    }

    #[test]
    fn zips_series_onto_entities_in_order() {
        let response = SearchResponse {
            results: vec![
                series(Some("Exhuma"), &[("2024-01-15", 57.4)]),
                series(Some("Wonka"), &[("2024-01-15", 3.0), ("2024-01-16", 4.9)]),
            ],
        };
        let obs = extract_observations(&response, &chunk(), &window()).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].entity_id, "M100");
        assert_eq!(obs[0].date, d(2024, 1, 15));
        assert_eq!(obs[0].value, 57);
        assert_eq!(obs[2].entity_id, "M101");
        assert_eq!(obs[2].value, 5);
    }

    #[test]
    fn empty_series_yields_nothing() {
        let response = SearchResponse {
            results: vec![series(None, &[]), series(None, &[("2024-01-11", 10.0)])],
        };
        let obs = extract_observations(&response, &chunk(), &window()).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].entity_id, "M101");
    }

    #[test]
    fn group_count_mismatch_fails_chunk() {
        let response = SearchResponse {
            results: vec![series(None, &[("2024-01-15", 1.0)])],
        };
        let err = extract_observations(&response, &chunk(), &window()).unwrap_err();
        assert!(matches!(err, FetchError::ResponseMismatch(_)));
    }

    #[test]
    fn swapped_titles_fail_chunk() {
        let response = SearchResponse {
            results: vec![series(Some("Wonka"), &[]), series(Some("Exhuma"), &[])],
        };
        let err = extract_observations(&response, &chunk(), &window()).unwrap_err();
        assert!(err.to_string().contains("expected 'Exhuma'"));
    }

    #[test]
    fn periods_outside_window_are_dropped() {
        let response = SearchResponse {
            results: vec![
                series(None, &[("2024-01-09", 5.0), ("2024-01-10", 6.0), ("2024-01-21", 7.0)]),
                series(None, &[]),
            ],
        };
        let obs = extract_observations(&response, &chunk(), &window()).unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].date, d(2024, 1, 10));
    }

    #[test]
    fn malformed_period_fails_chunk() {
        let response = SearchResponse {
            results: vec![series(None, &[("20240115", 5.0)]), series(None, &[])],
        };
        let err = extract_observations(&response, &chunk(), &window()).unwrap_err();
        assert!(matches!(err, FetchError::ResponseFormatChanged(_)));
    }
}
