//! Forecasting engine seam
//!
//! The pipeline talks to any engine through [`Forecaster`]: fit on a history
//! table (`ds`, `y`, numeric regressors), then predict one row per future row.

use super::history::{DS, Y};
use crate::error::{DemandcastError, Result};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

pub const YHAT: &str = "yhat";
pub const YHAT_LOWER: &str = "yhat_lower";
pub const YHAT_UPPER: &str = "yhat_upper";

/// A model that can be fit on history and predict future rows
pub trait Forecaster {
    /// Fit on `history`, treating `regressors` as extra numeric inputs
    fn fit(&mut self, history: &DataFrame, regressors: &[String]) -> Result<()>;

    /// Predict `yhat`, `yhat_lower` and `yhat_upper` for every row of `future`.
    ///
    /// The output has `future.height()` rows in the same order, plus `ds`.
    fn predict(&self, future: &DataFrame) -> Result<DataFrame>;

    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Copy)]
struct SegmentStats {
    mean: f64,
    lower: f64,
    upper: f64,
}

impl SegmentStats {
    fn from_values(values: &mut [f64], interval_width: f64) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let tail = (1.0 - interval_width) / 2.0;
        Self {
            mean,
            lower: quantile(values, tail),
            upper: quantile(values, 1.0 - tail),
        }
    }
}

/// Linear-interpolated quantile of sorted, non-empty values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

type SegmentKey = Vec<Option<u64>>;

/// Baseline engine: the forecast for a row is the mean metric of the history
/// rows with identical regressor values, with an empirical interval.
///
/// Regressor combinations never seen in history fall back to the global
/// statistics.
#[derive(Debug, Clone)]
pub struct SegmentMeanForecaster {
    interval_width: f64,
    regressors: Vec<String>,
    segments: HashMap<SegmentKey, SegmentStats>,
    global: Option<SegmentStats>,
}

impl SegmentMeanForecaster {
    pub fn new(interval_width: f64) -> Result<Self> {
        if !(interval_width > 0.0 && interval_width < 1.0) {
            return Err(DemandcastError::Configuration(format!(
                "interval_width must be in (0, 1), got {}",
                interval_width
            )));
        }
        Ok(Self {
            interval_width,
            regressors: Vec::new(),
            segments: HashMap::new(),
            global: None,
        })
    }

    pub fn is_fitted(&self) -> bool {
        self.global.is_some()
    }

    /// Number of distinct regressor combinations seen during fit
    pub fn n_segments(&self) -> usize {
        self.segments.len()
    }

    fn regressor_values(&self, df: &DataFrame) -> Result<Vec<Vec<Option<f64>>>> {
        self.regressors
            .iter()
            .map(|name| {
                let column = df.column(name).map_err(|_| {
                    DemandcastError::Schema(format!("regressor '{}' not found", name))
                })?;
                let values = column
                    .as_materialized_series()
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .collect();
                Ok(values)
            })
            .collect()
    }
}

fn segment_key(columns: &[Vec<Option<f64>>], row: usize) -> SegmentKey {
    columns
        .iter()
        .map(|values| {
            values[row]
                .filter(|v| !v.is_nan())
                // -0.0 and 0.0 share a segment
                .map(|v| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() })
        })
        .collect()
}

impl Forecaster for SegmentMeanForecaster {
    fn fit(&mut self, history: &DataFrame, regressors: &[String]) -> Result<()> {
        if history.get_column_index(Y).is_none() {
            return Err(DemandcastError::Schema(format!("history has no '{}' column", Y)));
        }
        self.regressors = regressors.to_vec();
        let columns = self.regressor_values(history)?;

        let y = history
            .column(Y)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let mut all = Vec::with_capacity(y.len());
        let mut grouped: HashMap<SegmentKey, Vec<f64>> = HashMap::new();
        for (row, value) in y.f64()?.into_iter().enumerate() {
            let Some(value) = value.filter(|v| !v.is_nan()) else {
                continue;
            };
            all.push(value);
            grouped.entry(segment_key(&columns, row)).or_default().push(value);
        }
        if all.is_empty() {
            return Err(DemandcastError::EmptyData(
                "no metric values to fit".to_string(),
            ));
        }

        self.global = Some(SegmentStats::from_values(&mut all, self.interval_width));
        self.segments = grouped
            .into_iter()
            .map(|(key, mut values)| (key, SegmentStats::from_values(&mut values, self.interval_width)))
            .collect();

        info!(
            engine = self.name(),
            rows = history.height(),
            segments = self.segments.len(),
            "Fitted forecaster"
        );
        Ok(())
    }

    fn predict(&self, future: &DataFrame) -> Result<DataFrame> {
        let global = self.global.ok_or_else(|| {
            DemandcastError::Forecast("model must be fitted before prediction".to_string())
        })?;
        let columns = self.regressor_values(future)?;

        let n = future.height();
        let mut yhat = Vec::with_capacity(n);
        let mut lower = Vec::with_capacity(n);
        let mut upper = Vec::with_capacity(n);
        let mut unseen = 0usize;
        for row in 0..n {
            let stats = match self.segments.get(&segment_key(&columns, row)) {
                Some(stats) => *stats,
                None => {
                    unseen += 1;
                    global
                }
            };
            yhat.push(stats.mean);
            lower.push(stats.lower);
            upper.push(stats.upper);
        }
        if unseen > 0 {
            debug!(rows = unseen, "Rows without a fitted segment use global statistics");
        }

        Ok(DataFrame::new(vec![
            future.column(DS)?.clone(),
            Series::new(YHAT.into(), yhat).into(),
            Series::new(YHAT_LOWER.into(), lower).into(),
            Series::new(YHAT_UPPER.into(), upper).into(),
        ])?)
    }

    fn name(&self) -> &str {
        "segment_mean"
    }
}
