//! Level label codecs and identifier sanitization
//!
//! Warehouse tables only accept column names made of ASCII letters, digits
//! and underscores. [`sanitize_identifier`] applies that rule; the same rule
//! backs [`LabelCodec::Identifier`] when level labels become indicator
//! column names.

use crate::error::{DemandcastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Separator placed between a categorical column name and a level label
pub const LEVEL_SEPARATOR: char = '_';

/// How a level label is turned into the suffix of an indicator column name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelCodec {
    /// Use the label unchanged. Decoding by prefix alone is lossless.
    Verbatim,
    /// Restrict the label to `[A-Za-z0-9_]`. Lossy on its own; the recorded
    /// `IndicatorSet` maps sanitized names back to the original labels.
    #[default]
    Identifier,
}

impl LabelCodec {
    /// Encode a level label into a column-name suffix
    pub fn encode_label(&self, label: &str) -> Result<String> {
        match self {
            LabelCodec::Verbatim => Ok(label.to_string()),
            LabelCodec::Identifier => {
                let clean = sanitize_identifier(label);
                if clean.is_empty() {
                    return Err(DemandcastError::InvalidLevel(format!(
                        "label '{}' has no identifier characters",
                        label
                    )));
                }
                Ok(clean)
            }
        }
    }

    /// Full indicator column name for `label` under categorical column `source`
    pub fn column_name(&self, source: &str, label: &str) -> Result<String> {
        let suffix = self.encode_label(label)?;
        Ok(format!("{}{}{}", source, LEVEL_SEPARATOR, suffix))
    }

    /// Parse a codec name as used on the command line
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "verbatim" | "raw" => Ok(LabelCodec::Verbatim),
            "identifier" | "ident" | "bigquery" => Ok(LabelCodec::Identifier),
            other => Err(DemandcastError::InvalidInput(format!(
                "unknown label codec '{}'",
                other
            ))),
        }
    }
}

/// Rewrite `name` into a warehouse-safe identifier.
///
/// Every character outside `[A-Za-z0-9_]` becomes `_`, runs of `_` collapse
/// into one, and leading/trailing `_` are stripped. The result may be empty.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

/// Sanitize every column name of `df` for export to a schema-enforcing store.
///
/// Fails if a name has no identifier characters at all, or if two columns
/// collapse to the same identifier.
pub fn sanitize_column_names(df: &DataFrame) -> Result<DataFrame> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut renames: Vec<(String, String)> = Vec::new();

    for name in df.get_column_names() {
        let original = name.to_string();
        let clean = sanitize_identifier(&original);
        if clean.is_empty() {
            return Err(DemandcastError::InvalidInput(format!(
                "column '{}' has no identifier characters",
                original
            )));
        }
        if let Some(first) = seen.insert(clean.clone(), original.clone()) {
            return Err(DemandcastError::SanitizationCollision {
                column: clean,
                first,
                second: original,
            });
        }
        if clean != original {
            renames.push((original, clean));
        }
    }

    // Every target name is clean and unique, so no rename can clash with a
    // column that has not been renamed yet.
    let mut result = df.clone();
    for (old, new) in renames {
        result.rename(&old, new.into())?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_identifier_rules() {
        assert_eq!(sanitize_identifier("New York"), "New_York");
        assert_eq!(sanitize_identifier("  a--b  "), "a_b");
        assert_eq!(sanitize_identifier("__x__y__"), "x_y");
        assert_eq!(sanitize_identifier("café"), "caf");
        assert_eq!(sanitize_identifier("already_clean_1"), "already_clean_1");
        assert_eq!(sanitize_identifier("!!!"), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for name in ["New York", "a  b", "x.y.z", "_lead", "trail_"] {
            let once = sanitize_identifier(name);
            assert_eq!(sanitize_identifier(&once), once);
        }
    }

    #[test]
    fn test_codec_column_name() {
        let name = LabelCodec::Identifier.column_name("city", "New York").unwrap();
        assert_eq!(name, "city_New_York");

        let name = LabelCodec::Verbatim.column_name("city", "New York").unwrap();
        assert_eq!(name, "city_New York");
    }

    #[test]
    fn test_identifier_codec_rejects_empty_label() {
        let result = LabelCodec::Identifier.encode_label("???");
        assert!(matches!(result, Err(DemandcastError::InvalidLevel(_))));
    }

    #[test]
    fn test_codec_parse() {
        assert_eq!(LabelCodec::parse("verbatim").unwrap(), LabelCodec::Verbatim);
        assert_eq!(LabelCodec::parse("Identifier").unwrap(), LabelCodec::Identifier);
        assert!(LabelCodec::parse("base64").is_err());
    }

    #[test]
    fn test_sanitize_column_names() {
        let df = df!(
            "ds" => &["2024-01-01"],
            "product name" => &["bread"],
            "yhat (mean)" => &[1.5],
        )
        .unwrap();

        let clean = sanitize_column_names(&df).unwrap();
        let names: Vec<String> = clean
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["ds", "product_name", "yhat_mean"]);
    }

    #[test]
    fn test_sanitize_column_names_collision() {
        let df = df!(
            "a b" => &[1],
            "a-b" => &[2],
        )
        .unwrap();

        let result = sanitize_column_names(&df);
        assert!(matches!(
            result,
            Err(DemandcastError::SanitizationCollision { .. })
        ));
    }
}
