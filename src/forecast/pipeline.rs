//! End-to-end forecasting pipeline
//!
//! Stages: history → indicator encoding → fit → future frame → predict →
//! decode → output table.

use super::engine::{Forecaster, YHAT, YHAT_LOWER, YHAT_UPPER};
use super::future::{attach_regressors, make_future_frame};
use super::history::{prepare_history, HistorySpec, DS};
use crate::config::ForecastConfig;
use crate::encoding::{regressor_columns, sanitize_column_names, CategoricalRoundTrip, IndicatorSet};
use crate::error::{DemandcastError, Result};
use crate::utils::sink::{TableId, TableSink};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info};

/// Output of one pipeline run
#[derive(Debug, Clone)]
pub struct ForecastRun {
    /// `ds`, the categorical columns, `yhat`, `yhat_lower`, `yhat_upper`
    pub forecast: DataFrame,
    /// Level sets recorded while encoding the history
    pub indicator_sets: Vec<IndicatorSet>,
    pub history_rows: usize,
    /// Where the forecast was written, if it was persisted
    pub table: Option<TableId>,
}

/// Runs a [`Forecaster`] over a source table with categorical regressors
pub struct ForecastPipeline {
    config: ForecastConfig,
    roundtrip: CategoricalRoundTrip,
}

impl ForecastPipeline {
    pub fn new(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        let roundtrip = CategoricalRoundTrip::new()
            .with_codec(config.codec)
            .with_ambiguity(config.ambiguity);
        Ok(Self { config, roundtrip })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Fit `engine` on `source` and return the decoded forecast table
    pub fn run<F: Forecaster + ?Sized>(&self, source: &DataFrame, engine: &mut F) -> Result<ForecastRun> {
        let start = Instant::now();
        let categorical: Vec<&str> = self
            .config
            .categorical_columns
            .iter()
            .map(|c| c.as_str())
            .collect();

        let spec = HistorySpec::new(&self.config.date_column, &self.config.metric_column).keep(&categorical);
        let history = prepare_history(source, &spec)?;
        let history_rows = history.height();

        let (encoded, sets) = self.roundtrip.encode_many(&history, &categorical)?;
        let regressors = regressor_columns(&sets);
        info!(
            columns = sets.len(),
            regressors = regressors.len(),
            "Encoded categorical regressors"
        );

        engine.fit(&encoded, &regressors)?;

        let future = make_future_frame(
            &encoded,
            self.config.periods,
            self.config.frequency()?,
            self.config.include_history,
        )?;
        let mut future = attach_regressors(&future, &encoded, &regressors)?;
        debug!(rows = future.height(), "Future frame ready");

        let predictions = engine.predict(&future)?;
        if predictions.height() != future.height() {
            return Err(DemandcastError::Forecast(format!(
                "{} returned {} rows for {} future rows",
                engine.name(),
                predictions.height(),
                future.height()
            )));
        }
        for name in [YHAT, YHAT_LOWER, YHAT_UPPER] {
            let column = predictions.column(name).map_err(|_| {
                DemandcastError::Forecast(format!("{} did not produce '{}'", engine.name(), name))
            })?;
            future.with_column(column.clone())?;
        }

        let decoded = self.roundtrip.decode_sets(&future, &sets)?;

        let mut selected: Vec<String> = vec![DS.to_string()];
        selected.extend(sets.iter().map(|s| s.source.clone()));
        selected.extend([YHAT, YHAT_LOWER, YHAT_UPPER].map(String::from));
        let mut forecast = decoded.select(selected)?;

        if self.config.sanitize_output {
            forecast = sanitize_column_names(&forecast)?;
        }

        info!(
            engine = engine.name(),
            rows = forecast.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Forecast complete"
        );

        Ok(ForecastRun {
            forecast,
            indicator_sets: sets,
            history_rows,
            table: None,
        })
    }

    /// Run, then write the forecast to the configured destination through `sink`
    pub fn run_and_persist<F, S>(&self, source: &DataFrame, engine: &mut F, sink: &S) -> Result<ForecastRun>
    where
        F: Forecaster + ?Sized,
        S: TableSink + ?Sized,
    {
        let table = self.config.destination_table()?.ok_or_else(|| {
            DemandcastError::Configuration("no destination table configured".to_string())
        })?;

        let mut run = self.run(source, engine)?;
        sink.write(&mut run.forecast, &table, self.config.if_exists)?;
        run.table = Some(table);
        Ok(run)
    }
}
