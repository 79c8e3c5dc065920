//! Film catalog loading.
//!
//! Reads the catalog CSV (`movieCd`, `title`, `openDt` as `YYYYMMDD`), drops
//! rows whose opening date does not parse or precedes the cutoff, and cleans
//! titles for use as search keywords.

use crate::csv_io;
use crate::domain::Entity;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const ID_COLUMN: &str = "movieCd";
const TITLE_COLUMN: &str = "title";
const DATE_COLUMN: &str = "openDt";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog is missing required column '{0}'")]
    MissingColumn(&'static str),
}

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    #[serde(rename = "movieCd")]
    movie_cd: String,
    #[serde(default)]
    title: String,
    #[serde(rename = "openDt", default)]
    open_dt: String,
}

/// Entities kept from a catalog plus counts of what was dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub entities: Vec<Entity>,
    pub unparseable_dates: usize,
    pub before_cutoff: usize,
}

/// Clean a title for keyword search: `/` and `:` become spaces, then trim.
pub fn clean_title(title: &str) -> String {
    title.replace(['/', ':'], " ").trim().to_string()
}

/// Parse an 8-digit `YYYYMMDD` date.
pub fn parse_open_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d").ok()
}

/// Load the catalog file, keeping films that opened on or after `cutoff`.
pub fn load_catalog(path: &Path, cutoff: NaiveDate) -> Result<Catalog, CatalogError> {
    if !path.is_file() {
        return Err(CatalogError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let catalog = parse_catalog(&bytes, cutoff)?;
    info!(
        path = %path.display(),
        films = catalog.entities.len(),
        unparseable_dates = catalog.unparseable_dates,
        before_cutoff = catalog.before_cutoff,
        "catalog loaded"
    );
    Ok(catalog)
}

/// Parse catalog CSV bytes (BOM optional).
pub fn parse_catalog(bytes: &[u8], cutoff: NaiveDate) -> Result<Catalog, CatalogError> {
    let mut rdr = csv_io::reader(bytes);
    let headers = rdr.headers()?.clone();
    for column in [ID_COLUMN, TITLE_COLUMN, DATE_COLUMN] {
        if !headers.iter().any(|h| h == column) {
            return Err(CatalogError::MissingColumn(column));
        }
    }

    let mut catalog = Catalog::default();
    for record in rdr.deserialize::<CatalogRecord>() {
        let record = record?;
        let Some(open_date) = parse_open_date(&record.open_dt) else {
            debug!(id = %record.movie_cd, open_dt = %record.open_dt, "unparseable opening date");
            catalog.unparseable_dates += 1;
            continue;
        };
        if open_date < cutoff {
            catalog.before_cutoff += 1;
            continue;
        }
        catalog.entities.push(Entity::new(
            record.movie_cd.trim(),
            clean_title(&record.title),
            open_date,
        ));
    }
    Ok(catalog)
}
