//! Resume/merge store for the persisted buzz dataset.
//!
//! The dataset is a single CSV file that is both the resume input and the
//! run output:
//! - read once at run start to build a [`ResumeIndex`]
//! - replaced once at run end with prior rows plus new rows
//! - written atomically (write to .tmp, rename into place)
//! - an unreadable prior file is treated as empty and moved to
//!   `{filename}.quarantined` before the replacement is written
//!
//! Merge order is prior-then-new with keep-first dedup, so a persisted row
//! is never overwritten by a re-fetch of the same key.

use crate::csv_io;
use crate::domain::{Observation, RecordKey};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Column order of the persisted dataset.
pub const DATASET_COLUMNS: [&str; 5] = [
    "buzz_id",
    "movieCd",
    "movie_nm",
    "buzz_date",
    "search_buzz_vol",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dataset I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("dataset encoding error: {0}")]
    Encoding(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One persisted observation row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(rename = "buzz_id")]
    pub record_key: String,
    #[serde(rename = "movieCd")]
    pub entity_id: String,
    #[serde(rename = "movie_nm")]
    pub display_name: String,
    #[serde(rename = "buzz_date")]
    pub date: NaiveDate,
    #[serde(rename = "search_buzz_vol")]
    pub value: u8,
}

impl DatasetRow {
    pub fn key(&self) -> RecordKey {
        RecordKey::from(self.record_key.clone())
    }
}

impl From<&Observation> for DatasetRow {
    fn from(obs: &Observation) -> Self {
        Self {
            record_key: obs.key().to_string(),
            entity_id: obs.entity_id.clone(),
            display_name: obs.display_name.clone(),
            date: obs.date,
            value: obs.value,
        }
    }
}

/// Keys already persisted. Built once per run and passed to the collector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeIndex {
    keys: HashSet<RecordKey>,
}

impl ResumeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: &[DatasetRow]) -> Self {
        rows.iter().map(DatasetRow::key).collect()
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl FromIterator<RecordKey> for ResumeIndex {
    fn from_iter<I: IntoIterator<Item = RecordKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// How the prior dataset was found at run start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorState {
    Missing,
    Loaded,
    Unreadable(String),
}

/// Rows read at run start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorDataset {
    pub rows: Vec<DatasetRow>,
    pub state: PriorState,
}

impl PriorDataset {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            state: PriorState::Missing,
        }
    }

    pub fn resume_index(&self) -> ResumeIndex {
        ResumeIndex::from_rows(&self.rows)
    }
}

/// Result of merging new observations into prior rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    /// Full replacement dataset, sorted by `(entity_id, date)`.
    pub rows: Vec<DatasetRow>,
    /// New rows that survived dedup.
    pub added: usize,
}

/// Prior rows first, then new rows; first occurrence of each key wins.
pub fn merge_rows(prior: &[DatasetRow], new: &[Observation]) -> Merged {
    let mut seen: HashSet<&str> = HashSet::with_capacity(prior.len() + new.len());
    let mut rows = Vec::with_capacity(prior.len() + new.len());

    for row in prior {
        if seen.insert(row.record_key.as_str()) {
            rows.push(row.clone());
        }
    }
    let prior_kept = rows.len();

    let new_rows: Vec<DatasetRow> = new.iter().map(DatasetRow::from).collect();
    for row in &new_rows {
        if seen.insert(row.record_key.as_str()) {
            rows.push(row.clone());
        }
    }
    let added = rows.len() - prior_kept;

    rows.sort_by(|a, b| a.entity_id.cmp(&b.entity_id).then(a.date.cmp(&b.date)));
    Merged { rows, added }
}

/// Outcome of the end-of-run write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing new; the prior file was left untouched.
    Unchanged,
    Written {
        total_rows: usize,
        added_rows: usize,
        quarantined: Option<PathBuf>,
    },
}

/// Summary statistics of a dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetStats {
    pub rows: usize,
    pub entities: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl DatasetStats {
    pub fn from_rows(rows: &[DatasetRow]) -> Self {
        let entities: BTreeSet<&str> = rows.iter().map(|r| r.entity_id.as_str()).collect();
        Self {
            rows: rows.len(),
            entities: entities.len(),
            first_date: rows.iter().map(|r| r.date).min(),
            last_date: rows.iter().map(|r| r.date).max(),
        }
    }
}

/// The persisted dataset file.
pub struct DatasetStore {
    path: PathBuf,
}

impl DatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Strictly read every row; any malformed row fails the whole read.
    pub fn read_rows(&self) -> Result<Vec<DatasetRow>, StoreError> {
        let bytes = fs::read(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let mut rdr = csv_io::reader(&bytes);
        let rows = rdr.deserialize().collect::<Result<Vec<DatasetRow>, _>>()?;
        Ok(rows)
    }

    /// Read the prior dataset for resume. Never fails: an unreadable file is
    /// logged and treated as empty.
    pub fn load_prior(&self) -> PriorDataset {
        if !self.exists() {
            return PriorDataset::empty();
        }

        match self.read_rows() {
            Ok(rows) => {
                info!(
                    path = %self.path.display(),
                    rows = rows.len(),
                    "loaded prior dataset"
                );
                PriorDataset {
                    rows,
                    state: PriorState::Loaded,
                }
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    "prior dataset unreadable, starting from empty: {e}"
                );
                PriorDataset {
                    rows: Vec::new(),
                    state: PriorState::Unreadable(e.to_string()),
                }
            }
        }
    }

    /// Merge `new` into `prior` and replace the dataset file.
    ///
    /// No write happens when `new` is empty.
    pub fn commit(
        &self,
        prior: &PriorDataset,
        new: &[Observation],
    ) -> Result<CommitOutcome, StoreError> {
        if new.is_empty() {
            return Ok(CommitOutcome::Unchanged);
        }

        let quarantined = match prior.state {
            PriorState::Unreadable(_) if self.exists() => Some(self.quarantine()?),
            _ => None,
        };

        let merged = merge_rows(&prior.rows, new);
        self.write_rows(&merged.rows)?;

        info!(
            path = %self.path.display(),
            total = merged.rows.len(),
            added = merged.added,
            "dataset written"
        );

        Ok(CommitOutcome::Written {
            total_rows: merged.rows.len(),
            added_rows: merged.added,
            quarantined,
        })
    }

    /// Serialize rows (BOM + header) and atomically replace the file.
    pub fn write_rows(&self, rows: &[DatasetRow]) -> Result<(), StoreError> {
        let mut wtr = csv_io::writer_with_bom();
        if rows.is_empty() {
            wtr.write_record(DATASET_COLUMNS)?;
        }
        for row in rows {
            wtr.serialize(row)?;
        }
        let data = wtr
            .into_inner()
            .map_err(|e| StoreError::Encoding(format!("failed to flush CSV writer: {e}")))?;

        csv_io::write_atomic(&self.path, &data).map_err(|e| StoreError::io(&self.path, e))
    }

    /// Move the current file aside to `{filename}.quarantined`.
    pub fn quarantine(&self) -> Result<PathBuf, StoreError> {
        let target = csv_io::sibling(&self.path, "quarantined");
        warn!(
            from = %self.path.display(),
            to = %target.display(),
            "quarantining unreadable dataset"
        );
        fs::rename(&self.path, &target).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(target)
    }

    /// BLAKE3 digest of the file bytes.
    pub fn digest(&self) -> Result<String, StoreError> {
        let bytes = fs::read(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}
