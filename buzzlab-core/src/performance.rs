//! Daily performance gap filler.
//!
//! Box-office feeds report a film's daily counts with holes: days inside a
//! film's run where every count is zero because nothing was reported. For
//! each film, such days between the first and last day with any positive
//! count are treated as gaps and filled by linear interpolation over row
//! position. Counts are then rounded (ties to even) to integers and the
//! `performance_id` column is renumbered from 1 in `(movie_id, date)` order.
//!
//! Films with no positive day are passed through untouched. Columns other
//! than the counts, the id and the date are copied verbatim.

use crate::csv_io;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const VALUE_COLUMNS: [&str; 4] = ["daily_audi_cnt", "daily_sales_amt", "screen_cnt", "show_cnt"];
const MOVIE_COLUMN: &str = "movie_id";
const DATE_COLUMN: &str = "performance_date";
const ID_COLUMN: &str = "performance_id";

#[derive(Debug, Error)]
pub enum PerformanceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("performance CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("performance table is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: invalid {column} '{value}'")]
    InvalidField {
        line: usize,
        column: &'static str,
        value: String,
    },
}

/// Summary of one adjustment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjustReport {
    pub rows: usize,
    pub movies: usize,
    /// Days inside an active span that were rebuilt by interpolation.
    pub filled_days: usize,
}

struct Layout {
    movie: usize,
    date: usize,
    id: Option<usize>,
    values: [usize; 4],
}

impl Layout {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, PerformanceError> {
        let find = |name: &'static str| headers.iter().position(|h| h == name);
        let require = |name: &'static str| find(name).ok_or(PerformanceError::MissingColumn(name));

        let mut values = [0; 4];
        for (slot, name) in values.iter_mut().zip(VALUE_COLUMNS) {
            *slot = require(name)?;
        }
        Ok(Self {
            movie: require(MOVIE_COLUMN)?,
            date: require(DATE_COLUMN)?,
            id: find(ID_COLUMN),
            values,
        })
    }
}

struct PerformanceRow {
    fields: Vec<String>,
    date: NaiveDate,
    values: [Option<f64>; 4],
    rewritten: bool,
}

impl PerformanceRow {
    fn parse(record: &csv::StringRecord, layout: &Layout, line: usize) -> Result<Self, PerformanceError> {
        let raw_date = record.get(layout.date).unwrap_or("").trim();
        let date = parse_date(raw_date).ok_or_else(|| PerformanceError::InvalidField {
            line,
            column: DATE_COLUMN,
            value: raw_date.to_string(),
        })?;

        let mut values = [None; 4];
        for ((slot, &idx), column) in values.iter_mut().zip(&layout.values).zip(VALUE_COLUMNS) {
            let raw = record.get(idx).unwrap_or("").trim();
            *slot = parse_count(raw).map_err(|_| PerformanceError::InvalidField {
                line,
                column,
                value: raw.to_string(),
            })?;
        }

        Ok(Self {
            fields: record.iter().map(str::to_string).collect(),
            date,
            values,
            rewritten: false,
        })
    }

    fn is_active(&self) -> bool {
        self.values.iter().flatten().any(|v| *v > 0.0)
    }

    fn is_blank(&self) -> bool {
        self.values.iter().flatten().sum::<f64>() == 0.0
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Timestamps written as "YYYY-MM-DD HH:MM:SS" keep their date part.
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Empty and NaN cells are missing values.
fn parse_count(raw: &str) -> Result<Option<f64>, std::num::ParseFloatError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw.parse()?;
    Ok((!value.is_nan()).then_some(value))
}

/// Fill missing points linearly between known neighbors.
///
/// Leading gaps become 0; trailing gaps carry the last known value.
pub fn interpolate_linear(series: &[Option<f64>]) -> Vec<f64> {
    let known: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|x| (i, x)))
        .collect();

    series
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if let Some(x) = v {
                return *x;
            }
            let next = known.partition_point(|(k, _)| *k < i);
            match (next.checked_sub(1).map(|p| known[p]), known.get(next)) {
                (None, _) => 0.0,
                (Some((_, last)), None) => last,
                (Some((i0, v0)), Some(&(i1, v1))) => {
                    v0 + (v1 - v0) * (i - i0) as f64 / (i1 - i0) as f64
                }
            }
        })
        .collect()
}

/// Rebuild one film's rows (sorted by date). Returns the number of gap days.
fn adjust_film(rows: &mut [PerformanceRow]) -> usize {
    let Some(first) = rows.iter().position(PerformanceRow::is_active) else {
        return 0;
    };
    let last = rows.iter().rposition(PerformanceRow::is_active).unwrap_or(first);

    let mut gaps = 0;
    for row in &mut rows[first..=last] {
        if row.is_blank() {
            row.values = [None; 4];
            gaps += 1;
        }
    }

    for col in 0..VALUE_COLUMNS.len() {
        let series: Vec<Option<f64>> = rows.iter().map(|r| r.values[col]).collect();
        for (row, v) in rows.iter_mut().zip(interpolate_linear(&series)) {
            row.values[col] = Some(v.round_ties_even());
        }
    }
    for row in rows.iter_mut() {
        row.rewritten = true;
    }
    gaps
}

/// Adjust a daily performance CSV held in memory; returns the new CSV bytes.
pub fn adjust_daily_performance(bytes: &[u8]) -> Result<(Vec<u8>, AdjustReport), PerformanceError> {
    let mut rdr = csv_io::reader(bytes);
    let headers = rdr.headers()?.clone();
    let layout = Layout::resolve(&headers)?;

    let mut by_movie: BTreeMap<String, Vec<PerformanceRow>> = BTreeMap::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = PerformanceRow::parse(&record, &layout, i + 2)?;
        let movie = record.get(layout.movie).unwrap_or("").trim().to_string();
        by_movie.entry(movie).or_default().push(row);
    }

    let mut report = AdjustReport {
        movies: by_movie.len(),
        ..AdjustReport::default()
    };
    for rows in by_movie.values_mut() {
        rows.sort_by_key(|r| r.date);
        report.filled_days += adjust_film(rows);
    }

    let mut out_headers: Vec<String> = headers.iter().map(str::to_string).collect();
    if layout.id.is_none() {
        out_headers.push(ID_COLUMN.to_string());
    }

    let mut wtr = csv_io::writer_with_bom();
    wtr.write_record(&out_headers)?;
    for (n, row) in by_movie.into_values().flatten().enumerate() {
        let mut fields = row.fields;
        if row.rewritten {
            for (&idx, value) in layout.values.iter().zip(row.values) {
                fields[idx] = format!("{}", value.unwrap_or(0.0) as i64);
            }
        }
        fields[layout.date] = row.date.format("%Y-%m-%d").to_string();
        let id = (n + 1).to_string();
        match layout.id {
            Some(idx) => fields[idx] = id,
            None => fields.push(id),
        }
        wtr.write_record(&fields)?;
        report.rows += 1;
    }

    let data = wtr.into_inner().map_err(|e| PerformanceError::Io {
        path: PathBuf::from("<memory>"),
        source: e.into_error(),
    })?;
    Ok((data, report))
}

/// Adjust `input` and atomically write the result to `output`.
pub fn adjust_file(input: &Path, output: &Path) -> Result<AdjustReport, PerformanceError> {
    let bytes = std::fs::read(input).map_err(|source| PerformanceError::Io {
        path: input.to_path_buf(),
        source,
    })?;
    let (data, report) = adjust_daily_performance(&bytes)?;
    csv_io::write_atomic(output, &data).map_err(|source| PerformanceError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows = report.rows,
        movies = report.movies,
        filled_days = report.filled_days,
        "daily performance adjusted"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjust(csv: &str) -> (Vec<Vec<String>>, AdjustReport) {
        let (bytes, report) = adjust_daily_performance(csv.as_bytes()).unwrap();
        let mut rdr = csv_io::reader(&bytes);
        let rows = rdr
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        (rows, report)
    }

    const HEADER: &str =
        "performance_id,movie_id,performance_date,daily_audi_cnt,daily_sales_amt,screen_cnt,show_cnt";

    #[test]
    fn interpolation_handles_edges() {
        let out = interpolate_linear(&[None, Some(10.0), None, None, Some(40.0), None]);
        assert_eq!(out, vec![0.0, 10.0, 20.0, 30.0, 40.0, 40.0]);
        assert_eq!(interpolate_linear(&[None, None]), vec![0.0, 0.0]);
    }

    #[test]
    fn zero_days_inside_run_are_interpolated() {
        let csv = format!(
            "{HEADER}\n\
             7,M1,2024-01-01,0,0,0,0\n\
             8,M1,2024-01-02,100,1000,10,20\n\
             9,M1,2024-01-03,0,0,0,0\n\
             10,M1,2024-01-04,0,0,0,0\n\
             11,M1,2024-01-05,400,4000,10,50\n\
             12,M1,2024-01-06,0,0,0,0\n"
        );
        let (rows, report) = adjust(&csv);

        assert_eq!(report.filled_days, 2);
        assert_eq!(rows[2][3], "200");
        assert_eq!(rows[3][3], "300");
        assert_eq!(rows[3][6], "40");
        assert_eq!(rows[0][3], "0");
        assert_eq!(rows[5][3], "0");
        let ids: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn rows_are_sorted_and_films_without_activity_untouched() {
        let csv = format!(
            "{HEADER}\n\
             1,M2,2024-01-02,0.0,0.0,0.0,0.0\n\
             2,M1,2024-01-02,5,50,1,1\n\
             3,M2,2024-01-01,0.0,0.0,0.0,0.0\n\
             4,M1,2024-01-01,3,30,1,1\n"
        );
        let (rows, report) = adjust(&csv);

        assert_eq!(report.movies, 2);
        assert_eq!(report.filled_days, 0);
        let order: Vec<(&str, &str)> = rows.iter().map(|r| (r[1].as_str(), r[2].as_str())).collect();
        assert_eq!(
            order,
            vec![
                ("M1", "2024-01-01"),
                ("M1", "2024-01-02"),
                ("M2", "2024-01-01"),
                ("M2", "2024-01-02"),
            ]
        );
        assert_eq!(rows[2][3], "0.0");
    }

    #[test]
    fn partial_zero_days_are_kept() {
        let csv = format!(
            "{HEADER}\n\
             1,M1,2024-01-01,10,100,1,1\n\
             2,M1,2024-01-02,0,0,1,0\n\
             3,M1,2024-01-03,30,300,1,1\n"
        );
        let (rows, report) = adjust(&csv);
        assert_eq!(report.filled_days, 0);
        assert_eq!(rows[1][3], "0");
        assert_eq!(rows[1][5], "1");
    }

    #[test]
    fn missing_id_column_is_appended() {
        let csv = "movie_id,performance_date,daily_audi_cnt,daily_sales_amt,screen_cnt,show_cnt\n\
                   M1,2024-01-01,1,1,1,1\n";
        let (bytes, _) = adjust_daily_performance(csv.as_bytes()).unwrap();
        let mut rdr = csv_io::reader(&bytes);
        assert_eq!(rdr.headers().unwrap().get(6), Some("performance_id"));
    }

    #[test]
    fn invalid_count_reports_line() {
        let csv = format!("{HEADER}\n1,M1,2024-01-01,abc,0,0,0\n");
        let err = adjust_daily_performance(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
