//! CSV candle ingestion.
//!
//! Expected columns: `timestamp,open,high,low,close,volume` with RFC 3339
//! timestamps. Malformed rows and out-of-order series are hard errors — the
//! engine's series contract is enforced here, before any computation runs.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use zonelab_core::domain::{validate_series, Candle, SeriesError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: csv::Error },

    #[error("malformed CSV row {row}: {source}")]
    Csv { row: usize, source: csv::Error },

    #[error("series contract violated: {0}")]
    Series(#[from] SeriesError),
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<CandleRow> for Candle {
    fn from(row: CandleRow) -> Self {
        Candle {
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        }
    }
}

/// Load and validate a candle series from a CSV file.
pub fn load_candles(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let mut candles = Vec::new();
    for (i, row) in reader.deserialize::<CandleRow>().enumerate() {
        let row = row.map_err(|source| LoadError::Csv { row: i + 1, source })?;
        candles.push(Candle::from(row));
    }

    validate_series(&candles)?;
    info!(path = %path.display(), bars = candles.len(), "loaded candle series");
    Ok(candles)
}
