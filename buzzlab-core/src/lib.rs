//! BuzzLab Core — catalog loading, bucket planning, batched rate-limited
//! fetching, series extraction and the resumable dataset store.
//!
//! This crate contains the whole collection pipeline:
//! - Domain types (entities, query windows, observations, record keys)
//! - Catalog loading with title cleaning and release-date cutoff
//! - Planning of entities into window buckets and fixed-size request batches
//! - A retrying fetcher with independent rate-limit and error backoff
//! - Extraction of daily series into bounded integer observations
//! - Resume index, keep-first merge and atomic dataset commit
//! - The daily performance gap filler

pub mod catalog;
pub mod config;
pub mod csv_io;
pub mod data;
pub mod domain;
pub mod performance;

pub use catalog::{load_catalog, Catalog, CatalogError};
pub use config::{ConfigError, CollectorConfig, Credentials};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: pipeline types can move across worker threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Entity>();
        require_sync::<domain::Entity>();
        require_send::<domain::QueryWindow>();
        require_sync::<domain::QueryWindow>();
        require_send::<domain::Observation>();
        require_sync::<domain::Observation>();
        require_send::<domain::RecordKey>();
        require_sync::<domain::RecordKey>();

        // Pipeline types
        require_send::<data::Plan>();
        require_sync::<data::Plan>();
        require_send::<data::RetryPolicy>();
        require_sync::<data::RetryPolicy>();
        require_send::<data::CollectSummary>();
        require_sync::<data::CollectSummary>();
        require_send::<data::ResumeIndex>();
        require_sync::<data::ResumeIndex>();
        require_send::<data::DatasetStore>();
        require_sync::<data::DatasetStore>();
        require_send::<data::DataLabProvider>();
        require_sync::<data::DataLabProvider>();
        require_send::<data::FetchError>();
        require_sync::<data::FetchError>();

        // Config
        require_send::<CollectorConfig>();
        require_sync::<CollectorConfig>();
    }

    /// The collector only sees providers through the trait object.
    #[test]
    fn provider_trait_is_object_safe() {
        fn _check(provider: &dyn data::TrendProvider, req: &data::SearchRequest) {
            let _ = provider.send(req);
        }
    }
}
