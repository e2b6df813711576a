//! Forecasting around categorical regressors
//!
//! - [`history`]: source table → `ds`/`y` history
//! - [`future`]: future date frames and regressor alignment
//! - [`engine`]: the [`Forecaster`] seam and a baseline engine
//! - [`pipeline`]: the end-to-end run

pub mod engine;
pub mod future;
pub mod history;
pub mod pipeline;

pub use engine::{Forecaster, SegmentMeanForecaster, YHAT, YHAT_LOWER, YHAT_UPPER};
pub use future::{attach_regressors, make_future_frame, Frequency};
pub use history::{prepare_history, HistorySpec, DS, Y};
pub use pipeline::{ForecastPipeline, ForecastRun};
