//! Future date frames and regressor alignment

use super::history::{date_values, DS};
use crate::error::{DemandcastError, Result};
use chrono::{Datelike, Months, NaiveDate, TimeDelta};
use polars::prelude::*;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Spacing of generated future dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Every `n` days
    Daily(u32),
    Weekly,
    /// First day of each month
    MonthStart,
}

impl Frequency {
    /// Parse a pandas-style offset alias: `D`, `<n>D`, `W`, `MS`
    pub fn parse(alias: &str) -> Result<Self> {
        let alias = alias.trim();
        match alias.to_uppercase().as_str() {
            "D" => return Ok(Frequency::Daily(1)),
            "W" | "1W" => return Ok(Frequency::Weekly),
            "MS" | "1MS" => return Ok(Frequency::MonthStart),
            _ => {}
        }

        let invalid = || DemandcastError::Configuration(format!("unsupported frequency '{}'", alias));
        let days = alias
            .strip_suffix(['D', 'd'])
            .ok_or_else(invalid)?
            .parse::<u32>()
            .map_err(|_| invalid())?;
        if days == 0 {
            return Err(invalid());
        }
        Ok(Frequency::Daily(days))
    }

    /// The date one step after `date`
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Frequency::Daily(n) => date.checked_add_signed(TimeDelta::days(*n as i64)),
            Frequency::Weekly => date.checked_add_signed(TimeDelta::days(7)),
            Frequency::MonthStart => date.with_day(1)?.checked_add_months(Months::new(1)),
        }
    }
}

/// Build a frame with a single `ds` column holding `periods` dates after the
/// last history date, optionally preceded by the distinct history dates.
pub fn make_future_frame(
    history: &DataFrame,
    periods: usize,
    freq: Frequency,
    include_history: bool,
) -> Result<DataFrame> {
    let known: BTreeSet<NaiveDate> = date_values(history.column(DS)?.as_materialized_series())?
        .into_iter()
        .flatten()
        .collect();
    let Some(&last) = known.iter().next_back() else {
        return Err(DemandcastError::EmptyData(
            "history has no dates to extend".to_string(),
        ));
    };

    let mut dates: Vec<NaiveDate> = if include_history {
        known.iter().copied().collect()
    } else {
        Vec::with_capacity(periods)
    };

    let mut current = last;
    for _ in 0..periods {
        current = freq.advance(current).ok_or_else(|| {
            DemandcastError::InvalidInput(format!("future dates overflow after {}", current))
        })?;
        dates.push(current);
    }

    debug!(rows = dates.len(), ?freq, include_history, "Built future frame");
    Ok(DataFrame::new(vec![Series::new(DS.into(), dates).into()])?)
}

/// Attach regressor values to a future frame.
///
/// Every future row is matched with the history rows sharing its date (one
/// output row per match). Dates absent from the history carry the values of
/// the last history row. Regressors come out as Float64.
pub fn attach_regressors(
    future: &DataFrame,
    history: &DataFrame,
    regressors: &[String],
) -> Result<DataFrame> {
    if regressors.is_empty() {
        return Ok(future.clone());
    }
    for name in regressors {
        if history.get_column_index(name).is_none() {
            return Err(DemandcastError::Schema(format!(
                "regressor '{}' not found in history",
                name
            )));
        }
    }

    let history_dates = date_values(history.column(DS)?.as_materialized_series())?;
    let mut rows_by_date: HashMap<NaiveDate, Vec<usize>> = HashMap::new();
    for (row, date) in history_dates.iter().enumerate() {
        if let Some(date) = date {
            rows_by_date.entry(*date).or_default().push(row);
        }
    }

    let future_dates = date_values(future.column(DS)?.as_materialized_series())?;
    let mut out_dates: Vec<Option<NaiveDate>> = Vec::with_capacity(future_dates.len());
    let mut matches: Vec<Option<usize>> = Vec::with_capacity(future_dates.len());
    for date in &future_dates {
        match date.and_then(|d| rows_by_date.get(&d)) {
            Some(rows) => {
                for &row in rows {
                    out_dates.push(*date);
                    matches.push(Some(row));
                }
            }
            None => {
                out_dates.push(*date);
                matches.push(None);
            }
        }
    }

    let mut columns: Vec<Column> = vec![Series::new(DS.into(), out_dates).into()];
    for name in regressors {
        let values: Vec<Option<f64>> = history
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();
        let fallback = values.last().copied().flatten();

        let aligned: Vec<Option<f64>> = matches
            .iter()
            .map(|m| match m {
                Some(row) => values[*row].or(fallback),
                None => fallback,
            })
            .collect();
        columns.push(Series::new(name.as_str().into(), aligned).into());
    }

    let frame = DataFrame::new(columns)?;
    debug!(
        rows = frame.height(),
        regressors = regressors.len(),
        "Attached regressors to future frame"
    );
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn history() -> DataFrame {
        DataFrame::new(vec![
            Series::new("ds".into(), vec![ymd(2024, 1, 30), ymd(2024, 1, 31), ymd(2024, 1, 31)]).into(),
            Series::new("product_bread".into(), vec![1i32, 1, 0]).into(),
            Series::new("product_cake".into(), vec![0i32, 0, 1]).into(),
        ])
        .unwrap()
    }

    fn dates(df: &DataFrame) -> Vec<Option<NaiveDate>> {
        date_values(df.column("ds").unwrap().as_materialized_series()).unwrap()
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!(Frequency::parse("1D").unwrap(), Frequency::Daily(1));
        assert_eq!(Frequency::parse("D").unwrap(), Frequency::Daily(1));
        assert_eq!(Frequency::parse("7D").unwrap(), Frequency::Daily(7));
        assert_eq!(Frequency::parse("W").unwrap(), Frequency::Weekly);
        assert_eq!(Frequency::parse("MS").unwrap(), Frequency::MonthStart);
        assert!(Frequency::parse("0D").is_err());
        assert!(Frequency::parse("Q").is_err());
    }

    #[test]
    fn test_month_start_advance() {
        let freq = Frequency::MonthStart;
        assert_eq!(freq.advance(ymd(2024, 1, 31)), Some(ymd(2024, 2, 1)));
        assert_eq!(freq.advance(ymd(2024, 12, 1)), Some(ymd(2025, 1, 1)));
    }

    #[test]
    fn test_make_future_frame() {
        let future = make_future_frame(&history(), 3, Frequency::Daily(1), false).unwrap();
        assert_eq!(
            dates(&future),
            vec![Some(ymd(2024, 2, 1)), Some(ymd(2024, 2, 2)), Some(ymd(2024, 2, 3))]
        );

        let with_history = make_future_frame(&history(), 2, Frequency::MonthStart, true).unwrap();
        assert_eq!(
            dates(&with_history),
            vec![
                Some(ymd(2024, 1, 30)),
                Some(ymd(2024, 1, 31)),
                Some(ymd(2024, 2, 1)),
                Some(ymd(2024, 3, 1)),
            ]
        );
    }

    #[test]
    fn test_attach_regressors_matches_and_fills() {
        let history = history();
        let future = make_future_frame(&history, 1, Frequency::Daily(1), true).unwrap();
        let regressors = vec!["product_bread".to_string(), "product_cake".to_string()];

        let attached = attach_regressors(&future, &history, &regressors).unwrap();

        // 2024-01-31 matches two history rows; 2024-02-01 carries the last row
        assert_eq!(attached.height(), 4);
        let bread: Vec<Option<f64>> = attached.column("product_bread").unwrap().f64().unwrap().into_iter().collect();
        let cake: Vec<Option<f64>> = attached.column("product_cake").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(bread, vec![Some(1.0), Some(1.0), Some(0.0), Some(0.0)]);
        assert_eq!(cake, vec![Some(0.0), Some(0.0), Some(1.0), Some(1.0)]);
    }

    #[test]
    fn test_attach_missing_regressor() {
        let history = history();
        let future = make_future_frame(&history, 1, Frequency::Weekly, false).unwrap();
        let result = attach_regressors(&future, &history, &["product_pie".to_string()]);
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }
}
