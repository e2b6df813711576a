//! Categorical regressor encoding
//!
//! Provides the one-hot round-trip used around the forecasting engine:
//! - Categorical column → indicator columns (encode)
//! - Indicator columns → categorical column (decode, by prefix or by recorded level set)
//! - Identifier sanitization for level labels and warehouse column names

mod codec;
mod dummies;

pub use codec::{sanitize_column_names, sanitize_identifier, LabelCodec, LEVEL_SEPARATOR};
pub use dummies::{AmbiguityPolicy, CategoricalRoundTrip, IndicatorSet, Level, NullPolicy};

use polars::prelude::*;

/// Names of every indicator column across `sets`, in set and level order
pub fn regressor_columns(sets: &[IndicatorSet]) -> Vec<String> {
    sets.iter()
        .flat_map(|set| set.levels.iter().map(|l| l.column.clone()))
        .collect()
}

/// Distinct values of a categorical column, in order of first observation
pub fn observed_levels(df: &DataFrame, column: &str) -> crate::Result<Vec<String>> {
    let series = df
        .column(column)
        .map_err(|_| crate::DemandcastError::Schema(format!("column '{}' not found", column)))?
        .as_materialized_series()
        .cast(&DataType::String)?;

    let mut seen = std::collections::HashSet::new();
    let levels = series
        .str()?
        .into_iter()
        .flatten()
        .filter(|v| seen.insert(v.to_string()))
        .map(|v| v.to_string())
        .collect();
    Ok(levels)
}
