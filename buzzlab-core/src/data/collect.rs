//! Collection orchestrator — drives plan → batches → fetch → extract → merge.
//!
//! Per-run state machine:
//! `Idle → Planning → {Fetching ⇄ Backoff} → Extracting → Merging → Done`.
//! A chunk that exhausts its retries (or returns a response that cannot be
//! attributed) ends in a chunk-level failure; the run moves on to the next
//! chunk and still merges everything extracted so far.

use super::backoff::{RetryPolicy, Sleeper};
use super::batch::split_batches;
use super::extract::extract_observations;
use super::fetcher::{BackoffReason, Fetcher};
use super::plan::{plan_buckets, Plan, PlanOptions};
use super::provider::{FetchError, TrendProvider};
use super::store::{CommitOutcome, DatasetStore, ResumeIndex, StoreError};
use crate::domain::{Entity, Observation, QueryWindow};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Phase of a collection run, reported to [`CollectProgress::on_phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Planning,
    Fetching,
    Backoff,
    Extracting,
    Merging,
    Done,
}

/// Progress callbacks for a collection run. Every method has a no-op default.
pub trait CollectProgress: Send + Sync {
    fn on_phase(&self, _phase: RunPhase) {}

    /// Called once planning is done.
    fn on_plan(&self, _plan: &Plan, _batches: usize) {}

    /// Called before the fetcher sleeps between attempts.
    fn on_backoff(&self, _window: &QueryWindow, _attempt: u32, _wait: Duration, _reason: BackoffReason) {
    }

    /// Called after each batch, successful or not. `Ok` carries the number of
    /// observations kept from the batch.
    fn on_batch_complete(&self, _index: usize, _total: usize, _result: Result<usize, &FetchError>) {}
}

/// Progress reporter that does nothing.
pub struct NoProgress;

impl CollectProgress for NoProgress {}

/// Progress reporter that logs through `tracing`.
pub struct LogProgress;

impl CollectProgress for LogProgress {
    fn on_plan(&self, plan: &Plan, batches: usize) {
        info!(
            buckets = plan.buckets.len(),
            entities = plan.entity_count(),
            skipped = plan.skipped,
            batches,
            "collection planned"
        );
    }

    fn on_batch_complete(&self, index: usize, total: usize, result: Result<usize, &FetchError>) {
        match result {
            Ok(kept) => info!("[{}/{}] batch ok, {kept} new observations", index + 1, total),
            Err(e) => warn!("[{}/{}] batch failed: {e}", index + 1, total),
        }
    }
}

/// A chunk that could not be collected.
#[derive(Debug)]
pub struct ChunkFailure {
    pub window: QueryWindow,
    pub entity_ids: Vec<String>,
    pub error: FetchError,
}

/// Everything collected in one pass over a plan.
#[derive(Debug, Default)]
pub struct CollectSummary {
    /// New observations in fetch order, free of resume-index keys and of
    /// in-run duplicates.
    pub observations: Vec<Observation>,
    pub batches_total: usize,
    pub batches_succeeded: usize,
    /// Observations discarded because their key was already persisted.
    pub skipped_existing: usize,
    pub failures: Vec<ChunkFailure>,
}

impl CollectSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sequential batch collector. One request in flight at a time.
pub struct Collector<'a> {
    fetcher: Fetcher<'a>,
    group_size: usize,
    progress: &'a dyn CollectProgress,
}

impl<'a> Collector<'a> {
    pub fn new(
        provider: &'a dyn TrendProvider,
        policy: RetryPolicy,
        sleeper: &'a dyn Sleeper,
        group_size: usize,
        progress: &'a dyn CollectProgress,
    ) -> Self {
        Self {
            fetcher: Fetcher::new(provider, policy, sleeper).with_progress(progress),
            group_size,
            progress,
        }
    }

    /// Fetch every batch of `plan`, skipping keys present in `index`.
    pub fn collect(&self, plan: &Plan, index: &ResumeIndex) -> CollectSummary {
        let total = plan.batch_count(self.group_size);
        self.progress.on_plan(plan, total);

        let mut summary = CollectSummary {
            batches_total: total,
            ..CollectSummary::default()
        };
        let mut seen = HashSet::new();
        let mut batch_index = 0;

        for bucket in &plan.buckets {
            debug!(
                window = %bucket.window,
                entities = bucket.entities.len(),
                "collecting bucket"
            );

            for chunk in split_batches(&bucket.entities, self.group_size) {
                let result = self.collect_chunk(chunk, &bucket.window);

                match result {
                    Ok(observations) => {
                        summary.batches_succeeded += 1;
                        let mut kept = 0;
                        for obs in observations {
                            let key = obs.key();
                            if index.contains(&key) {
                                summary.skipped_existing += 1;
                                continue;
                            }
                            if seen.insert(key) {
                                summary.observations.push(obs);
                                kept += 1;
                            }
                        }
                        self.progress.on_batch_complete(batch_index, total, Ok(kept));
                    }
                    Err(error) => {
                        warn!(
                            window = %bucket.window,
                            first = %chunk[0].display_name,
                            "chunk failed: {error}"
                        );
                        self.progress.on_batch_complete(batch_index, total, Err(&error));
                        summary.failures.push(ChunkFailure {
                            window: bucket.window,
                            entity_ids: chunk.iter().map(|e| e.id.clone()).collect(),
                            error,
                        });
                    }
                }

                batch_index += 1;
            }
        }

        summary
    }

    fn collect_chunk(
        &self,
        chunk: &[Entity],
        window: &QueryWindow,
    ) -> Result<Vec<Observation>, FetchError> {
        self.progress.on_phase(RunPhase::Fetching);
        let response = self.fetcher.fetch_batch(chunk, window)?;
        self.progress.on_phase(RunPhase::Extracting);
        extract_observations(&response, chunk, window)
    }
}

/// Result of a full collection run.
#[derive(Debug)]
pub struct RunReport {
    pub planned_entities: usize,
    pub skipped_entities: usize,
    pub known_keys: usize,
    pub summary: CollectSummary,
    pub commit: CommitOutcome,
}

/// Plan, collect and merge in one run.
///
/// Only a failure to write the final dataset is returned as an error; chunk
/// failures are reported in `RunReport::summary`.
pub fn run_collection(
    entities: &[Entity],
    plan_options: &PlanOptions,
    collector: &Collector<'_>,
    store: &DatasetStore,
) -> Result<RunReport, StoreError> {
    let progress = collector.progress;
    progress.on_phase(RunPhase::Idle);

    progress.on_phase(RunPhase::Planning);
    let plan = plan_buckets(entities, plan_options);
    let prior = store.load_prior();
    let index = prior.resume_index();

    let summary = collector.collect(&plan, &index);

    progress.on_phase(RunPhase::Merging);
    let commit = store.commit(&prior, &summary.observations)?;
    if commit == CommitOutcome::Unchanged {
        info!("no new observations, dataset left untouched");
    }

    progress.on_phase(RunPhase::Done);
    Ok(RunReport {
        planned_entities: plan.entity_count(),
        skipped_entities: plan.skipped,
        known_keys: index.len(),
        summary,
        commit,
    })
}
