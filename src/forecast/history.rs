//! Preparation of the training history
//!
//! The forecasting engine expects a `ds` date column and a `y` metric column.

use crate::error::{DemandcastError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use polars::prelude::*;
use tracing::{debug, info};

/// Name of the date column expected by the engine
pub const DS: &str = "ds";
/// Name of the metric column expected by the engine
pub const Y: &str = "y";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

/// Which source columns become the history table
#[derive(Debug, Clone)]
pub struct HistorySpec {
    pub date_column: String,
    pub metric_column: String,
    /// Extra columns carried through unchanged (e.g. categorical regressors)
    pub keep: Vec<String>,
}

impl HistorySpec {
    pub fn new(date_column: &str, metric_column: &str) -> Self {
        Self {
            date_column: date_column.to_string(),
            metric_column: metric_column.to_string(),
            keep: Vec::new(),
        }
    }

    /// Builder method to carry extra columns
    pub fn keep(mut self, columns: &[&str]) -> Self {
        self.keep = columns.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Build the history table: `ds` (Date), `y` (Float64) and the kept columns,
/// without rows holding nulls, sorted by `ds`.
pub fn prepare_history(df: &DataFrame, spec: &HistorySpec) -> Result<DataFrame> {
    for name in [&spec.date_column, &spec.metric_column]
        .into_iter()
        .chain(spec.keep.iter())
    {
        if df.get_column_index(name).is_none() {
            return Err(DemandcastError::Schema(format!("column '{}' not found", name)));
        }
    }
    for name in &spec.keep {
        if name == DS || name == Y {
            return Err(DemandcastError::Schema(format!(
                "kept column '{}' clashes with the engine's reserved names",
                name
            )));
        }
    }

    let ds = parse_dates(df.column(&spec.date_column)?.as_materialized_series())?;
    let y = df
        .column(&spec.metric_column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .with_name(Y.into());

    let mut columns: Vec<Column> = vec![ds.into(), y.clone().into()];
    for name in &spec.keep {
        columns.push(df.column(name)?.clone());
    }
    let frame = DataFrame::new(columns)?;

    let mut valid = vec![true; frame.height()];
    for column in frame.get_columns() {
        for (row, ok) in column
            .as_materialized_series()
            .is_not_null()
            .into_iter()
            .enumerate()
        {
            if ok != Some(true) {
                valid[row] = false;
            }
        }
    }
    for (row, value) in y.f64()?.into_iter().enumerate() {
        if value.map_or(true, f64::is_nan) {
            valid[row] = false;
        }
    }

    let mask = BooleanChunked::from_slice("valid".into(), &valid);
    let frame = frame.filter(&mask)?;
    let dropped = valid.len() - frame.height();
    if frame.height() == 0 {
        return Err(DemandcastError::EmptyData(
            "no complete rows in history".to_string(),
        ));
    }

    let frame = frame.sort([DS], SortMultipleOptions::default().with_maintain_order(true))?;

    info!(rows = frame.height(), dropped, "Prepared history");
    Ok(frame)
}

/// Parse a date-like series into a `Date` series named `ds`.
///
/// Datetimes are truncated to the day.
pub fn parse_dates(series: &Series) -> Result<Series> {
    let parsed = match series.dtype() {
        DataType::Date => series.clone(),
        DataType::Datetime(_, _) => series.cast(&DataType::Date)?,
        DataType::String => {
            let ca = series.str()?;
            let mut dates: Vec<Option<NaiveDate>> = Vec::with_capacity(ca.len());
            for (row, value) in ca.into_iter().enumerate() {
                match value {
                    None => dates.push(None),
                    Some(raw) if raw.trim().is_empty() => dates.push(None),
                    Some(raw) => {
                        let date = parse_date_str(raw).ok_or_else(|| {
                            DemandcastError::InvalidInput(format!(
                                "cannot parse '{}' as a date at row {}",
                                raw, row
                            ))
                        })?;
                        dates.push(Some(date));
                    }
                }
            }
            Series::new(DS.into(), dates)
        }
        other => {
            return Err(DemandcastError::Schema(format!(
                "date column '{}' has unsupported type {}",
                series.name(),
                other
            )))
        }
    };
    debug!(nulls = parsed.null_count(), "Parsed date column");
    Ok(parsed.with_name(DS.into()))
}

/// Parse one date or timestamp string, keeping only the date
pub fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.date());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.date_naive())
}

/// Calendar dates of a `Date` series
pub fn date_values(series: &Series) -> Result<Vec<Option<NaiveDate>>> {
    if series.dtype() != &DataType::Date {
        return Err(DemandcastError::Schema(format!(
            "column '{}' must be a Date, got {}",
            series.name(),
            series.dtype()
        )));
    }
    let epoch = NaiveDate::default();
    let days = series.cast(&DataType::Int32)?;
    let values = days
        .i32()?
        .into_iter()
        .map(|d| d.and_then(|d| epoch.checked_add_signed(TimeDelta::days(d as i64))))
        .collect();
    Ok(values)
}
