//! Demandcast - categorical regressors around demand forecasting
//!
//! This crate turns categorical columns into numeric indicator regressors for
//! a forecasting engine, and turns the engine's output back into a readable
//! table with the categorical columns restored.
//!
//! # Modules
//!
//! - [`encoding`] - One-hot encode and decode, label codecs, name sanitizing
//! - [`forecast`] - History preparation, future frames, engine seam, pipeline
//! - [`config`] - Pipeline configuration
//! - [`utils`] - Table loading, saving and warehouse sinks
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

pub mod config;
pub mod encoding;
pub mod forecast;
pub mod utils;

// Services
pub mod cli;

pub use error::{DemandcastError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{DemandcastError, Result};

    // Configuration
    pub use crate::config::{ForecastConfig, ProjectConfig};

    // Encoding
    pub use crate::encoding::{
        sanitize_column_names, sanitize_identifier, AmbiguityPolicy, CategoricalRoundTrip,
        IndicatorSet, LabelCodec, NullPolicy,
    };

    // Forecasting
    pub use crate::forecast::{
        ForecastPipeline, ForecastRun, Forecaster, Frequency, HistorySpec, SegmentMeanForecaster,
    };

    // Table I/O
    pub use crate::utils::{DataLoader, DataSaver, IfExists, LocalWarehouse, TableId, TableSink};
}
