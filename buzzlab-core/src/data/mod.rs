//! Collection pipeline: planning, batching, rate-limited fetching,
//! series extraction and the resume/merge store.

pub mod backoff;
pub mod batch;
pub mod collect;
pub mod datalab;
pub mod extract;
pub mod fetcher;
pub mod plan;
pub mod provider;
pub mod store;

pub use backoff::{BackoffTimer, RecordingSleeper, RetryPolicy, Sleeper, ThreadSleeper};
pub use batch::{batch_count, split_batches, MAX_GROUP_SIZE};
pub use collect::{
    run_collection, ChunkFailure, CollectProgress, CollectSummary, Collector, LogProgress,
    NoProgress, RunPhase, RunReport,
};
pub use datalab::DataLabProvider;
pub use extract::extract_observations;
pub use fetcher::{BackoffReason, Fetcher};
pub use plan::{plan_buckets, Bucket, Plan, PlanOptions, DEFAULT_HORIZON_DAYS};
pub use provider::{ApiReply, FetchError, SearchRequest, SearchResponse, TrendProvider};
pub use store::{
    merge_rows, CommitOutcome, DatasetRow, DatasetStats, DatasetStore, PriorDataset, PriorState,
    ResumeIndex, StoreError,
};
