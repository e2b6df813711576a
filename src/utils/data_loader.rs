//! Table loading and saving

use crate::error::{DemandcastError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// On-disk table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Parquet,
    Json,
}

impl TableFormat {
    /// Detect the format from a file extension; unknown extensions read as CSV
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "tsv" => TableFormat::Tsv,
            "parquet" | "pq" => TableFormat::Parquet,
            "json" | "jsonl" => TableFormat::Json,
            _ => TableFormat::Csv,
        }
    }
}

/// Rows scanned to infer CSV column types
const INFER_SCHEMA_ROWS: usize = 1000;

/// Loader for source tables
pub struct DataLoader;

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self
    }

    /// Load a delimited text file with a header row
    pub fn load_csv(&self, path: &Path, delimiter: u8) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| {
            DemandcastError::Data(format!("cannot open {}: {}", path.display(), e))
        })?;

        let parse_opts = CsvParseOptions::default().with_separator(delimiter);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()?;
        Ok(df)
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;
        Ok(ParquetReader::new(file).finish()?)
    }

    /// Load a JSON file
    pub fn load_json(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;
        Ok(JsonReader::new(file).finish()?)
    }

    /// Detect the file format from the extension and load
    pub fn load_auto(&self, path: &Path) -> Result<DataFrame> {
        let df = match TableFormat::from_path(path) {
            TableFormat::Csv => self.load_csv(path, b',')?,
            TableFormat::Tsv => self.load_csv(path, b'\t')?,
            TableFormat::Parquet => self.load_parquet(path)?,
            TableFormat::Json => self.load_json(path)?,
        };
        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded table");
        Ok(df)
    }

    /// Column names from the header of a delimited file, without loading rows
    pub fn read_header(path: &Path, delimiter: u8) -> Result<Vec<String>> {
        let file = File::open(path)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_n_rows(Some(0))
            .with_infer_schema_length(Some(0))
            .with_parse_options(CsvParseOptions::default().with_separator(delimiter))
            .into_reader_with_file_handle(file)
            .finish()?;
        Ok(df.get_column_names().iter().map(|n| n.to_string()).collect())
    }
}

/// Save tables to the format implied by the path
pub struct DataSaver;

impl DataSaver {
    pub fn save_auto(df: &mut DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = File::create(path)?;
        match TableFormat::from_path(path) {
            TableFormat::Csv => CsvWriter::new(&mut file).finish(df)?,
            TableFormat::Tsv => CsvWriter::new(&mut file).with_separator(b'\t').finish(df)?,
            TableFormat::Parquet => {
                ParquetWriter::new(file).finish(df)?;
            }
            TableFormat::Json => JsonWriter::new(&mut file).finish(df)?,
        }
        debug!(path = %path.display(), rows = df.height(), "Saved table");
        Ok(())
    }
}
