//! One-hot encoding round-trip for categorical regressors
//!
//! [`CategoricalRoundTrip::encode`] replaces a categorical column with one
//! indicator column per level. [`CategoricalRoundTrip::decode`] and
//! [`CategoricalRoundTrip::decode_set`] collapse such a set of indicator
//! columns back into one categorical column.
//!
//! # Decode tie-break policy
//!
//! A row is *ambiguous* when its indicator columns have no unique maximum,
//! or when that maximum is not positive (all zero, all null). What happens
//! to such rows is controlled by [`AmbiguityPolicy`]; `FirstMax` picks the
//! first column holding the maximum, in column order.

use super::codec::{LabelCodec, LEVEL_SEPARATOR};
use crate::error::{DemandcastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

/// How nulls in a categorical column are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NullPolicy {
    /// Fail with `MissingValues`
    #[default]
    Error,
    /// Leave every indicator of the row at zero
    AllZero,
}

/// What decode does with a row lacking a unique positive maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AmbiguityPolicy {
    /// Fail with `AmbiguousLevel`
    #[default]
    Error,
    /// Take the first column holding the row maximum
    FirstMax,
    /// Emit a null value for the row
    Null,
}

impl NullPolicy {
    /// Parse a policy name as used on the command line
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "error" => Ok(NullPolicy::Error),
            "zero" | "all_zero" | "allzero" => Ok(NullPolicy::AllZero),
            other => Err(DemandcastError::InvalidInput(format!(
                "unknown null policy '{}'",
                other
            ))),
        }
    }
}

impl AmbiguityPolicy {
    /// Parse a policy name as used on the command line
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "error" => Ok(AmbiguityPolicy::Error),
            "first" | "first_max" | "firstmax" => Ok(AmbiguityPolicy::FirstMax),
            "null" => Ok(AmbiguityPolicy::Null),
            other => Err(DemandcastError::InvalidInput(format!(
                "unknown ambiguity policy '{}'",
                other
            ))),
        }
    }
}

/// One encoded level: the original label and the indicator column holding it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub label: String,
    pub column: String,
}

/// The indicator columns produced for one categorical column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Name of the categorical column that was encoded
    pub source: String,
    /// Common prefix of every indicator column (`source` + `_`)
    pub prefix: String,
    /// Codec used to build the column names
    pub codec: LabelCodec,
    /// Levels in order of first observation
    pub levels: Vec<Level>,
}

impl IndicatorSet {
    /// Number of levels
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Indicator column names, in level order
    pub fn columns(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.column.as_str()).collect()
    }

    /// Original labels, in level order
    pub fn labels(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.label.as_str()).collect()
    }

    /// Save several indicator sets as pretty JSON
    pub fn save_all(sets: &[IndicatorSet], path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(sets)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load indicator sets written by [`IndicatorSet::save_all`]
    pub fn load_all(path: impl AsRef<Path>) -> Result<Vec<IndicatorSet>> {
        let json = std::fs::read_to_string(path)?;
        let sets: Vec<IndicatorSet> = serde_json::from_str(&json)?;
        Ok(sets)
    }
}

/// Encoder/decoder for categorical regressors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoricalRoundTrip {
    codec: LabelCodec,
    null_policy: NullPolicy,
    ambiguity: AmbiguityPolicy,
}

impl CategoricalRoundTrip {
    /// Create a round-trip with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the label codec
    pub fn with_codec(mut self, codec: LabelCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Builder method to set the null policy used by encode
    pub fn with_null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    /// Builder method to set the ambiguity policy used by decode
    pub fn with_ambiguity(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    pub fn codec(&self) -> LabelCodec {
        self.codec
    }

    /// Replace categorical `column` with one indicator column per level.
    ///
    /// Indicator columns are `Int32` and appended after the remaining
    /// columns, in order of first observation of each level.
    pub fn encode(&self, df: &DataFrame, column: &str) -> Result<(DataFrame, IndicatorSet)> {
        let series = df
            .column(column)
            .map_err(|_| DemandcastError::Schema(format!("column '{}' not found", column)))?
            .as_materialized_series();

        let as_string = series.cast(&DataType::String)?;
        let ca = as_string.str()?;

        let null_count = ca.null_count();
        if null_count > 0 && self.null_policy == NullPolicy::Error {
            return Err(DemandcastError::MissingValues(format!(
                "column '{}' has {} null values",
                column, null_count
            )));
        }

        let mut levels: Vec<Level> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        let mut codes: Vec<Option<usize>> = Vec::with_capacity(ca.len());

        for value in ca.into_iter() {
            let Some(label) = value else {
                codes.push(None);
                continue;
            };
            let idx = match index.get(label) {
                Some(&idx) => idx,
                None => {
                    let name = self.codec.column_name(column, label)?;
                    if let Some(first) = owners.get(&name) {
                        return Err(DemandcastError::SanitizationCollision {
                            column: column.to_string(),
                            first: first.clone(),
                            second: label.to_string(),
                        });
                    }
                    owners.insert(name.clone(), label.to_string());
                    index.insert(label.to_string(), levels.len());
                    levels.push(Level {
                        label: label.to_string(),
                        column: name,
                    });
                    levels.len() - 1
                }
            };
            codes.push(Some(idx));
        }

        if levels.is_empty() {
            return Err(DemandcastError::EmptyData(format!(
                "column '{}' has no values to encode",
                column
            )));
        }

        let mut result = df.drop(column)?;
        for level in &levels {
            if result.get_column_index(&level.column).is_some() {
                return Err(DemandcastError::Schema(format!(
                    "indicator column '{}' already exists",
                    level.column
                )));
            }
        }

        for (idx, level) in levels.iter().enumerate() {
            let values: Vec<i32> = codes
                .iter()
                .map(|code| if *code == Some(idx) { 1 } else { 0 })
                .collect();
            result.with_column(Series::new(level.column.as_str().into(), values))?;
        }

        debug!(column = %column, levels = levels.len(), "Encoded categorical column");

        let set = IndicatorSet {
            source: column.to_string(),
            prefix: format!("{}{}", column, LEVEL_SEPARATOR),
            codec: self.codec,
            levels,
        };
        Ok((result, set))
    }

    /// Encode several categorical columns, returning one indicator set per column
    pub fn encode_many(
        &self,
        df: &DataFrame,
        columns: &[&str],
    ) -> Result<(DataFrame, Vec<IndicatorSet>)> {
        let mut result = df.clone();
        let mut sets = Vec::with_capacity(columns.len());
        for column in columns {
            let (encoded, set) = self.encode(&result, column)?;
            result = encoded;
            sets.push(set);
        }
        Ok((result, sets))
    }

    /// Collapse every column whose name starts with `prefix` into one column.
    ///
    /// The value of each row is the matched column name with `prefix`
    /// stripped. The new column is named `prefix` without trailing `_`.
    /// Labels sanitized by [`LabelCodec::Identifier`] come back in their
    /// sanitized form; use [`CategoricalRoundTrip::decode_set`] to restore
    /// the original labels.
    pub fn decode(&self, df: &DataFrame, prefix: &str) -> Result<DataFrame> {
        let matched: Vec<String> = df
            .get_column_names()
            .iter()
            .filter(|name| name.as_str().starts_with(prefix))
            .map(|name| name.to_string())
            .collect();

        if matched.is_empty() {
            return Err(DemandcastError::Schema(format!(
                "no columns match prefix '{}'",
                prefix
            )));
        }

        let output = prefix.trim_end_matches(LEVEL_SEPARATOR);
        if output.is_empty() {
            return Err(DemandcastError::Schema(format!(
                "prefix '{}' does not name an output column",
                prefix
            )));
        }
        if df.get_column_index(output).is_some() {
            return Err(DemandcastError::Schema(format!(
                "output column '{}' already exists",
                output
            )));
        }

        let labels: Vec<String> = matched
            .iter()
            .map(|name| name[prefix.len()..].to_string())
            .collect();

        self.collapse(df, &matched, &labels, output, prefix)
    }

    /// Collapse the columns of a recorded indicator set back into `set.source`.
    ///
    /// Every column of the set must be present, and no other column may share
    /// the set's prefix.
    pub fn decode_set(&self, df: &DataFrame, set: &IndicatorSet) -> Result<DataFrame> {
        self.decode_set_among(df, set, &HashSet::new())
    }

    /// Decode several recorded sets from one table.
    ///
    /// Columns and output names owned by one set never count against the
    /// prefix of another, so sources such as `product` and `product_name`
    /// decode side by side.
    pub fn decode_sets(&self, df: &DataFrame, sets: &[IndicatorSet]) -> Result<DataFrame> {
        let mut owned: HashSet<&str> = HashSet::new();
        for set in sets {
            for column in set.columns() {
                if !owned.insert(column) {
                    return Err(DemandcastError::Schema(format!(
                        "indicator column '{}' belongs to more than one set",
                        column
                    )));
                }
            }
        }
        owned.extend(sets.iter().map(|s| s.source.as_str()));

        let mut result = df.clone();
        for set in sets {
            result = self.decode_set_among(&result, set, &owned)?;
        }
        Ok(result)
    }

    fn decode_set_among(
        &self,
        df: &DataFrame,
        set: &IndicatorSet,
        owned_elsewhere: &HashSet<&str>,
    ) -> Result<DataFrame> {
        if set.is_empty() {
            return Err(DemandcastError::Schema(format!(
                "indicator set for '{}' has no levels",
                set.source
            )));
        }

        let expected: HashSet<&str> = set.columns().into_iter().collect();
        for column in &expected {
            if df.get_column_index(column).is_none() {
                return Err(DemandcastError::Schema(format!(
                    "indicator column '{}' not found",
                    column
                )));
            }
        }

        let extras: Vec<String> = df
            .get_column_names()
            .iter()
            .filter(|name| {
                name.as_str().starts_with(&set.prefix)
                    && !expected.contains(name.as_str())
                    && !owned_elsewhere.contains(name.as_str())
            })
            .map(|name| name.to_string())
            .collect();
        if !extras.is_empty() {
            return Err(DemandcastError::Schema(format!(
                "columns {:?} share prefix '{}' but are not part of the indicator set",
                extras, set.prefix
            )));
        }

        if df.get_column_index(&set.source).is_some() {
            return Err(DemandcastError::Schema(format!(
                "output column '{}' already exists",
                set.source
            )));
        }

        let columns: Vec<String> = set.levels.iter().map(|l| l.column.clone()).collect();
        let labels: Vec<String> = set.levels.iter().map(|l| l.label.clone()).collect();
        self.collapse(df, &columns, &labels, &set.source, &set.prefix)
    }

    fn collapse(
        &self,
        df: &DataFrame,
        columns: &[String],
        labels: &[String],
        output: &str,
        prefix: &str,
    ) -> Result<DataFrame> {
        let mut values: Vec<Vec<Option<f64>>> = Vec::with_capacity(columns.len());
        for name in columns {
            let series = df.column(name)?.as_materialized_series();
            if !is_indicator_dtype(series.dtype()) {
                return Err(DemandcastError::Schema(format!(
                    "indicator column '{}' has non-numeric type {}",
                    name,
                    series.dtype()
                )));
            }
            let as_f64 = series.cast(&DataType::Float64)?;
            let ca = as_f64.f64()?;
            values.push(ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect());
        }

        let mut decoded: Vec<Option<String>> = Vec::with_capacity(df.height());
        let mut ambiguous = 0usize;

        for row in 0..df.height() {
            match activation(values.iter().map(|col| col[row])) {
                Activation::Unique(idx) => decoded.push(Some(labels[idx].clone())),
                Activation::Ambiguous(first) => {
                    ambiguous += 1;
                    match self.ambiguity {
                        AmbiguityPolicy::Error => {
                            return Err(DemandcastError::AmbiguousLevel {
                                prefix: prefix.to_string(),
                                row,
                            });
                        }
                        AmbiguityPolicy::FirstMax => {
                            decoded.push(first.map(|idx| labels[idx].clone()))
                        }
                        AmbiguityPolicy::Null => decoded.push(None),
                    }
                }
            }
        }

        if ambiguous > 0 {
            warn!(prefix = %prefix, rows = ambiguous, policy = ?self.ambiguity, "Resolved ambiguous indicator rows");
        }

        let mut result = df.clone();
        for name in columns {
            result = result.drop(name)?;
        }
        result.with_column(Series::new(output.into(), decoded))?;

        debug!(output = %output, levels = columns.len(), "Decoded indicator columns");
        Ok(result)
    }
}

enum Activation {
    /// Index of the unique positive maximum
    Unique(usize),
    /// First index holding the maximum, if any value was present
    Ambiguous(Option<usize>),
}

fn activation<I: Iterator<Item = Option<f64>>>(row: I) -> Activation {
    let mut best: Option<(usize, f64)> = None;
    let mut tied = false;

    for (idx, value) in row.enumerate() {
        let Some(value) = value else { continue };
        match best {
            Some((_, max)) if value < max => {}
            Some((_, max)) if value == max => tied = true,
            _ => {
                best = Some((idx, value));
                tied = false;
            }
        }
    }

    match best {
        Some((idx, max)) if !tied && max > 0.0 => Activation::Unique(idx),
        Some((idx, _)) => Activation::Ambiguous(Some(idx)),
        None => Activation::Ambiguous(None),
    }
}

fn is_indicator_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|n| n.to_string()).collect()
    }

    fn int_column(df: &DataFrame, name: &str) -> Vec<i32> {
        df.column(name)
            .unwrap()
            .i32()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    fn str_column(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_basic_scenario() {
        let df = df!("cat" => &["A", "B", "A"]).unwrap();
        let (encoded, set) = CategoricalRoundTrip::new().encode(&df, "cat").unwrap();

        assert_eq!(column_names(&encoded), vec!["cat_A", "cat_B"]);
        assert_eq!(int_column(&encoded, "cat_A"), vec![1, 0, 1]);
        assert_eq!(int_column(&encoded, "cat_B"), vec![0, 1, 0]);
        assert_eq!(set.labels(), vec!["A", "B"]);
        assert_eq!(set.prefix, "cat_");
    }

    #[test]
    fn test_levels_in_first_observed_order() {
        let df = df!("cat" => &["z", "a", "m", "a", "z"]).unwrap();
        let (_, set) = CategoricalRoundTrip::new().encode(&df, "cat").unwrap();
        assert_eq!(set.labels(), vec!["z", "a", "m"]);
    }

    #[test]
    fn test_encode_keeps_other_columns() {
        let df = df!(
            "y" => &[1.0, 2.0],
            "cat" => &["A", "B"],
        )
        .unwrap();
        let (encoded, _) = CategoricalRoundTrip::new().encode(&df, "cat").unwrap();
        assert_eq!(column_names(&encoded), vec!["y", "cat_A", "cat_B"]);
    }

    #[test]
    fn test_encode_missing_column() {
        let df = df!("cat" => &["A"]).unwrap();
        let result = CategoricalRoundTrip::new().encode(&df, "dog");
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }

    #[test]
    fn test_encode_integer_levels() {
        let df = df!("store" => &[10i64, 20, 10]).unwrap();
        let (encoded, set) = CategoricalRoundTrip::new().encode(&df, "store").unwrap();
        assert_eq!(set.labels(), vec!["10", "20"]);
        assert_eq!(int_column(&encoded, "store_10"), vec![1, 0, 1]);
    }

    #[test]
    fn test_encode_null_policy() {
        let df = df!("cat" => &[Some("A"), None, Some("B")]).unwrap();

        let strict = CategoricalRoundTrip::new().encode(&df, "cat");
        assert!(matches!(strict, Err(DemandcastError::MissingValues(_))));

        let lenient = CategoricalRoundTrip::new().with_null_policy(NullPolicy::AllZero);
        let (encoded, _) = lenient.encode(&df, "cat").unwrap();
        assert_eq!(int_column(&encoded, "cat_A"), vec![1, 0, 0]);
        assert_eq!(int_column(&encoded, "cat_B"), vec![0, 0, 1]);
    }

    #[test]
    fn test_encode_detects_sanitization_collision() {
        let df = df!("city" => &["a b", "a-b"]).unwrap();
        let result = CategoricalRoundTrip::new().encode(&df, "city");
        match result {
            Err(DemandcastError::SanitizationCollision { first, second, .. }) => {
                assert_eq!(first, "a b");
                assert_eq!(second, "a-b");
            }
            other => panic!("expected collision, got {:?}", other.map(|_| ())),
        }

        // Verbatim names keep the labels apart
        let verbatim = CategoricalRoundTrip::new().with_codec(LabelCodec::Verbatim);
        assert!(verbatim.encode(&df, "city").is_ok());
    }

    #[test]
    fn test_encode_rejects_existing_indicator_name() {
        let df = df!(
            "cat" => &["A", "B"],
            "cat_A" => &[5, 6],
        )
        .unwrap();
        let result = CategoricalRoundTrip::new().encode(&df, "cat");
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }

    #[test]
    fn test_decode_basic_scenario() {
        let df = df!(
            "cat_A" => &[1, 0, 1],
            "cat_B" => &[0, 1, 0],
        )
        .unwrap();
        let decoded = CategoricalRoundTrip::new().decode(&df, "cat_").unwrap();

        assert_eq!(column_names(&decoded), vec!["cat"]);
        assert_eq!(
            str_column(&decoded, "cat"),
            vec![Some("A".into()), Some("B".into()), Some("A".into())]
        );
    }

    #[test]
    fn test_decode_no_matching_prefix() {
        let df = df!("cat_A" => &[1]).unwrap();
        let result = CategoricalRoundTrip::new().decode(&df, "dog_");
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }

    #[test]
    fn test_decode_relaxed_argmax() {
        let df = df!(
            "cat_A" => &[0.2, 0.7],
            "cat_B" => &[0.8, 0.1],
        )
        .unwrap();
        let decoded = CategoricalRoundTrip::new().decode(&df, "cat_").unwrap();
        assert_eq!(
            str_column(&decoded, "cat"),
            vec![Some("B".into()), Some("A".into())]
        );
    }

    #[test]
    fn test_decode_ambiguity_policies() {
        let df = df!(
            "cat_A" => &[0, 1, 1],
            "cat_B" => &[0, 1, 0],
        )
        .unwrap();

        let strict = CategoricalRoundTrip::new().decode(&df, "cat_");
        assert!(matches!(
            strict,
            Err(DemandcastError::AmbiguousLevel { row: 0, .. })
        ));

        let first = CategoricalRoundTrip::new()
            .with_ambiguity(AmbiguityPolicy::FirstMax)
            .decode(&df, "cat_")
            .unwrap();
        assert_eq!(
            str_column(&first, "cat"),
            vec![Some("A".into()), Some("A".into()), Some("A".into())]
        );

        let nulls = CategoricalRoundTrip::new()
            .with_ambiguity(AmbiguityPolicy::Null)
            .decode(&df, "cat_")
            .unwrap();
        assert_eq!(str_column(&nulls, "cat"), vec![None, None, Some("A".into())]);
    }

    #[test]
    fn test_decode_all_null_row_first_max_is_null() {
        let df = df!(
            "cat_A" => &[None, Some(1.0)],
            "cat_B" => &[None, Some(0.0)],
        )
        .unwrap();
        let decoded = CategoricalRoundTrip::new()
            .with_ambiguity(AmbiguityPolicy::FirstMax)
            .decode(&df, "cat_")
            .unwrap();
        assert_eq!(str_column(&decoded, "cat"), vec![None, Some("A".into())]);
    }

    #[test]
    fn test_decode_rejects_string_indicator() {
        let df = df!("cat_A" => &["1"]).unwrap();
        let result = CategoricalRoundTrip::new().decode(&df, "cat_");
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }

    #[test]
    fn test_decode_rejects_output_clash() {
        let df = df!(
            "cat" => &["x"],
            "cat_A" => &[1],
        )
        .unwrap();
        let result = CategoricalRoundTrip::new().decode(&df, "cat_");
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }

    #[test]
    fn test_decode_accepts_boolean_indicators() {
        let df = df!(
            "cat_A" => &[true, false],
            "cat_B" => &[false, true],
        )
        .unwrap();
        let decoded = CategoricalRoundTrip::new().decode(&df, "cat_").unwrap();
        assert_eq!(
            str_column(&decoded, "cat"),
            vec![Some("A".into()), Some("B".into())]
        );
    }

    #[test]
    fn test_decode_set_restores_original_labels() {
        let df = df!("city" => &["New York", "Paris", "New York"]).unwrap();
        let rt = CategoricalRoundTrip::new();
        let (encoded, set) = rt.encode(&df, "city").unwrap();
        assert!(encoded.column("city_New_York").is_ok());

        let lossy = rt.decode(&encoded, "city_").unwrap();
        assert_eq!(
            str_column(&lossy, "city"),
            vec![
                Some("New_York".into()),
                Some("Paris".into()),
                Some("New_York".into())
            ]
        );

        let exact = rt.decode_set(&encoded, &set).unwrap();
        assert!(exact.equals(&df));
    }

    #[test]
    fn test_decode_set_rejects_foreign_prefixed_column() {
        let df = df!("product" => &["a", "b"]).unwrap();
        let rt = CategoricalRoundTrip::new();
        let (mut encoded, set) = rt.encode(&df, "product").unwrap();
        encoded
            .with_column(Series::new("product_id".into(), &[1, 2]))
            .unwrap();

        let result = rt.decode_set(&encoded, &set);
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }

    #[test]
    fn test_decode_set_requires_every_column() {
        let df = df!("cat" => &["A", "B"]).unwrap();
        let rt = CategoricalRoundTrip::new();
        let (encoded, set) = rt.encode(&df, "cat").unwrap();
        let partial = encoded.drop("cat_B").unwrap();

        let result = rt.decode_set(&partial, &set);
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }

    #[test]
    fn test_single_level_round_trip() {
        let df = df!("cat" => &["only"]).unwrap();
        let rt = CategoricalRoundTrip::new();
        let (encoded, set) = rt.encode(&df, "cat").unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(int_column(&encoded, "cat_only"), vec![1]);

        let decoded = rt.decode(&encoded, "cat_").unwrap();
        assert!(decoded.equals(&df));
    }

    #[test]
    fn test_null_round_trip_with_null_policy() {
        let df = df!("cat" => &[Some("A"), None, Some("B")]).unwrap();
        let rt = CategoricalRoundTrip::new()
            .with_null_policy(NullPolicy::AllZero)
            .with_ambiguity(AmbiguityPolicy::Null);
        let (encoded, set) = rt.encode(&df, "cat").unwrap();
        let decoded = rt.decode_set(&encoded, &set).unwrap();
        assert!(decoded.equals_missing(&df));
    }

    #[test]
    fn test_encode_many() {
        let df = df!(
            "dc" => &["north", "south"],
            "product" => &["bread", "bread"],
        )
        .unwrap();
        let (encoded, sets) = CategoricalRoundTrip::new()
            .encode_many(&df, &["dc", "product"])
            .unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(
            column_names(&encoded),
            vec!["dc_north", "dc_south", "product_bread"]
        );
    }

    #[test]
    fn test_indicator_set_labels_and_persistence() {
        let df = df!("cat" => &["New York", "Paris"]).unwrap();
        let (_, set) = CategoricalRoundTrip::new().encode(&df, "cat").unwrap();

        assert_eq!(set.columns(), vec!["cat_New_York", "cat_Paris"]);
        assert_eq!(set.labels(), vec!["New York", "Paris"]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels.json");
        IndicatorSet::save_all(&[set.clone()], &path).unwrap();
        let loaded = IndicatorSet::load_all(&path).unwrap();
        assert_eq!(loaded, vec![set]);
    }

    #[test]
    fn test_decode_sets_with_nested_prefixes() {
        let df = df!(
            "product" => &["a", "b", "a"],
            "product_name" => &["bread", "cake", "cake"],
        )
        .unwrap();
        let rt = CategoricalRoundTrip::new();
        let (encoded, sets) = rt.encode_many(&df, &["product", "product_name"]).unwrap();

        // `product_name_*` shares the `product_` prefix but belongs to its own set
        assert!(matches!(
            rt.decode_set(&encoded, &sets[0]),
            Err(DemandcastError::Schema(_))
        ));

        let decoded = rt.decode_sets(&encoded, &sets).unwrap();
        for column in ["product", "product_name"] {
            assert!(decoded
                .column(column)
                .unwrap()
                .as_materialized_series()
                .equals(df.column(column).unwrap().as_materialized_series()));
        }
        assert_eq!(decoded.width(), 2);
    }

    #[test]
    fn test_decode_sets_still_rejects_unowned_columns() {
        let df = df!("product" => &["a", "b"]).unwrap();
        let rt = CategoricalRoundTrip::new();
        let (encoded, sets) = rt.encode_many(&df, &["product"]).unwrap();
        let mut encoded = encoded;
        encoded
            .with_column(Series::new("product_c".into(), vec![0i32, 0]))
            .unwrap();

        assert!(matches!(
            rt.decode_sets(&encoded, &sets),
            Err(DemandcastError::Schema(_))
        ));
    }

    #[test]
    fn test_decode_sets_rejects_shared_columns() {
        let df = df!("cat" => &["A", "B"]).unwrap();
        let rt = CategoricalRoundTrip::new();
        let (encoded, set) = rt.encode(&df, "cat").unwrap();

        let result = rt.decode_sets(&encoded, &[set.clone(), set]);
        assert!(matches!(result, Err(DemandcastError::Schema(_))));
    }

    #[test]
    fn test_null_policy_parse() {
        assert_eq!(NullPolicy::parse("zero").unwrap(), NullPolicy::AllZero);
        assert_eq!(NullPolicy::parse("Error").unwrap(), NullPolicy::Error);
        assert!(matches!(
            NullPolicy::parse("drop"),
            Err(DemandcastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_ambiguity_policy_parse() {
        assert_eq!(AmbiguityPolicy::parse("first").unwrap(), AmbiguityPolicy::FirstMax);
        assert_eq!(AmbiguityPolicy::parse("NULL").unwrap(), AmbiguityPolicy::Null);
        assert!(AmbiguityPolicy::parse("random").is_err());
    }
}
