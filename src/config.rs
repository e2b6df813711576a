//! Pipeline configuration
//!
//! Configuration is passed explicitly to the components that need it. Values
//! missing from a config file fall back to defaults, and the project settings
//! fall back to the `DEMANDCAST_PROJECT_ID` and `DEMANDCAST_CREDENTIALS`
//! environment variables.

use crate::encoding::{AmbiguityPolicy, LabelCodec};
use crate::error::{DemandcastError, Result};
use crate::forecast::Frequency;
use crate::utils::sink::{IfExists, TableId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Credential source and project identifier for warehouse I/O
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Service account key file
    pub credentials: Option<PathBuf>,
    /// Project that unqualified table ids belong to
    pub project_id: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            credentials: std::env::var("DEMANDCAST_CREDENTIALS").ok().map(PathBuf::from),
            project_id: std::env::var("DEMANDCAST_PROJECT_ID").ok(),
        }
    }
}

/// The fields of a service account key file that demandcast reads
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            DemandcastError::Configuration(format!(
                "cannot read credentials {}: {}",
                path.display(),
                e
            ))
        })?;
        let key: Self = serde_json::from_str(&json)?;
        Ok(key)
    }
}

impl ProjectConfig {
    /// Explicit project id, else the one named in the credentials file
    pub fn resolve_project_id(&self) -> Result<Option<String>> {
        if let Some(id) = &self.project_id {
            return Ok(Some(id.clone()));
        }
        match &self.credentials {
            Some(path) => Ok(Some(ServiceAccountKey::from_file(path)?.project_id)),
            None => Ok(None),
        }
    }
}

/// Configuration of one forecasting run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub project: ProjectConfig,

    /// Input table file (CSV, Parquet or JSON)
    pub source: Option<PathBuf>,

    /// Destination table id (`project.dataset.table` or `dataset.table`)
    pub destination: Option<String>,

    /// Behavior when the destination table exists
    pub if_exists: IfExists,

    /// Root directory of the local warehouse sink
    pub warehouse_root: PathBuf,

    /// Name of the timestamp column in the source table
    pub date_column: String,

    /// Name of the metric column in the source table
    pub metric_column: String,

    /// Categorical regressors to one-hot encode
    pub categorical_columns: Vec<String>,

    /// Number of future periods to forecast
    pub periods: usize,

    /// Step between future dates (`1D`, `7D`, `W`, `MS`)
    pub frequency: String,

    /// Also predict over the history dates
    pub include_history: bool,

    /// Width of the prediction interval, in (0, 1)
    pub interval_width: f64,

    pub codec: LabelCodec,

    pub ambiguity: AmbiguityPolicy,

    /// Sanitize output column names for a schema-enforcing store
    pub sanitize_output: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            project: ProjectConfig::default(),
            source: None,
            destination: None,
            if_exists: IfExists::Replace,
            warehouse_root: PathBuf::from("./warehouse"),
            date_column: "ds".to_string(),
            metric_column: "y".to_string(),
            categorical_columns: Vec::new(),
            periods: 30,
            frequency: "1D".to_string(),
            include_history: true,
            interval_width: 0.8,
            codec: LabelCodec::Identifier,
            ambiguity: AmbiguityPolicy::Error,
            sanitize_output: true,
        }
    }
}

impl ForecastConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Builder method to set the source and metric columns
    pub fn with_columns(mut self, date_column: &str, metric_column: &str) -> Self {
        self.date_column = date_column.to_string();
        self.metric_column = metric_column.to_string();
        self
    }

    /// Builder method to set the categorical regressors
    pub fn with_categorical(mut self, columns: &[&str]) -> Self {
        self.categorical_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Builder method to set the forecast horizon
    pub fn with_horizon(mut self, periods: usize, frequency: &str) -> Self {
        self.periods = periods;
        self.frequency = frequency.to_string();
        self
    }

    /// Builder method to set the interval width
    pub fn with_interval_width(mut self, width: f64) -> Self {
        self.interval_width = width;
        self
    }

    /// Builder method to set the destination table
    pub fn with_destination(mut self, table: &str, if_exists: IfExists) -> Self {
        self.destination = Some(table.to_string());
        self.if_exists = if_exists;
        self
    }

    pub fn with_codec(mut self, codec: LabelCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Parsed future-date frequency
    pub fn frequency(&self) -> Result<Frequency> {
        Frequency::parse(&self.frequency)
    }

    /// Destination table qualified with the resolved project id
    pub fn destination_table(&self) -> Result<Option<TableId>> {
        let Some(dest) = &self.destination else {
            return Ok(None);
        };
        let project = self.project.resolve_project_id()?;
        TableId::parse(dest, project.as_deref()).map(Some)
    }

    /// Check parameter ranges and column names
    pub fn validate(&self) -> Result<()> {
        if self.periods == 0 {
            return Err(DemandcastError::Configuration(
                "periods must be at least 1".to_string(),
            ));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(DemandcastError::Configuration(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        if self.date_column.is_empty() || self.metric_column.is_empty() {
            return Err(DemandcastError::Configuration(
                "date_column and metric_column must be set".to_string(),
            ));
        }
        for column in &self.categorical_columns {
            if column == &self.date_column || column == &self.metric_column {
                return Err(DemandcastError::Configuration(format!(
                    "'{}' cannot be both categorical and the date or metric column",
                    column
                )));
            }
        }
        self.frequency()?;
        Ok(())
    }
}
