//! Tabular persistence sinks
//!
//! A [`TableSink`] accepts a finished table and a destination [`TableId`].
//! [`LocalWarehouse`] is a filesystem-backed sink that lays tables out as
//! `root/project/dataset/table.csv`.

use super::data_loader::DataLoader;
use crate::error::{DemandcastError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

/// What a sink does when the destination table already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IfExists {
    /// Refuse to write
    #[default]
    Fail,
    /// Overwrite the table
    Replace,
    /// Add rows; the column names must match
    Append,
}

impl IfExists {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "fail" => Ok(IfExists::Fail),
            "replace" => Ok(IfExists::Replace),
            "append" => Ok(IfExists::Append),
            other => Err(DemandcastError::InvalidInput(format!(
                "unknown if_exists mode '{}'",
                other
            ))),
        }
    }
}

/// Fully qualified warehouse table identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableId {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableId {
    /// Parse `project.dataset.table`, or `dataset.table` qualified with `default_project`
    pub fn parse(id: &str, default_project: Option<&str>) -> Result<Self> {
        let parts: Vec<&str> = id.trim().trim_matches('`').split('.').collect();
        let (project, dataset, table) = match parts.as_slice() {
            [project, dataset, table] => (project.to_string(), *dataset, *table),
            [dataset, table] => {
                let project = default_project.ok_or_else(|| {
                    DemandcastError::Configuration(format!(
                        "table id '{}' has no project and none is configured",
                        id
                    ))
                })?;
                (project.to_string(), *dataset, *table)
            }
            _ => {
                return Err(DemandcastError::InvalidInput(format!(
                    "table id '{}' must be project.dataset.table or dataset.table",
                    id
                )))
            }
        };

        if project.is_empty()
            || !project
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(DemandcastError::InvalidInput(format!(
                "invalid project id '{}'",
                project
            )));
        }
        for part in [dataset, table] {
            if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(DemandcastError::InvalidInput(format!(
                    "invalid identifier '{}' in table id '{}'",
                    part, id
                )));
            }
        }

        Ok(Self {
            project,
            dataset: dataset.to_string(),
            table: table.to_string(),
        })
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Destination for finished tables
pub trait TableSink {
    /// Write `df` to `table`, honoring `mode` when the table exists
    fn write(&self, df: &mut DataFrame, table: &TableId, mode: IfExists) -> Result<()>;
}

/// Filesystem-backed warehouse storing one CSV file per table
#[derive(Debug, Clone)]
pub struct LocalWarehouse {
    root: PathBuf,
}

impl LocalWarehouse {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `table`
    pub fn table_path(&self, table: &TableId) -> PathBuf {
        self.root
            .join(&table.project)
            .join(&table.dataset)
            .join(format!("{}.csv", table.table))
    }

    pub fn exists(&self, table: &TableId) -> bool {
        self.table_path(table).exists()
    }

    /// Read a stored table
    pub fn read(&self, table: &TableId) -> Result<DataFrame> {
        let path = self.table_path(table);
        if !path.exists() {
            return Err(DemandcastError::Schema(format!("table {} not found", table)));
        }
        DataLoader::new().load_csv(&path, b',')
    }

    fn append(&self, df: &mut DataFrame, table: &TableId, path: &Path) -> Result<()> {
        let existing = DataLoader::read_header(path, b',')?;
        let incoming: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        if existing != incoming {
            return Err(DemandcastError::Schema(format!(
                "cannot append to {}: columns {:?} do not match {:?}",
                table, incoming, existing
            )));
        }

        let mut file = OpenOptions::new().append(true).open(path)?;
        CsvWriter::new(&mut file).include_header(false).finish(df)?;
        Ok(())
    }
}

impl TableSink for LocalWarehouse {
    fn write(&self, df: &mut DataFrame, table: &TableId, mode: IfExists) -> Result<()> {
        let path = self.table_path(table);
        let exists = path.exists();

        match (exists, mode) {
            (true, IfExists::Fail) => {
                return Err(DemandcastError::Configuration(format!(
                    "table {} already exists",
                    table
                )));
            }
            (true, IfExists::Append) => {
                self.append(df, table, &path)?;
            }
            _ => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let mut file = File::create(&path)?;
                CsvWriter::new(&mut file).finish(df)?;
            }
        }

        info!(table = %table, rows = df.height(), mode = ?mode, "Wrote table");
        Ok(())
    }
}
