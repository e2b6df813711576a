//! Demandcast CLI Module
//!
//! Command-line interface for encoding, decoding, sanitizing and forecasting.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ForecastConfig;
use crate::encoding::{
    observed_levels, sanitize_column_names, AmbiguityPolicy, CategoricalRoundTrip, IndicatorSet,
    LabelCodec, NullPolicy,
};
use crate::forecast::{ForecastPipeline, SegmentMeanForecaster};
use crate::utils::{DataLoader, DataSaver, LocalWarehouse};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = if visible_len < W { W - visible_len } else { 0 };
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "demandcast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Categorical regressor round-trip and demand forecast assembly")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// One-hot encode categorical columns into indicator columns
    Encode {
        /// Input data file (CSV, TSV, JSON, or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Categorical columns to encode (comma separated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        columns: Vec<String>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Write the recorded level sets to this JSON file
        #[arg(long)]
        levels: Option<PathBuf>,

        /// Label codec (identifier, verbatim)
        #[arg(long, default_value = "identifier")]
        codec: String,

        /// Null handling (error, zero)
        #[arg(long, default_value = "error")]
        nulls: String,
    },

    /// Collapse indicator columns back into categorical columns
    Decode {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Indicator column prefix, e.g. `product_name_`
        #[arg(short, long, required_unless_present = "levels", conflicts_with = "levels")]
        prefix: Option<String>,

        /// Level sets written by `encode --levels`
        #[arg(long)]
        levels: Option<PathBuf>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Rows without a single active indicator (error, first, null)
        #[arg(long, default_value = "error")]
        on_ambiguous: String,
    },

    /// Rewrite column names as warehouse-safe identifiers
    Sanitize {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run the forecasting pipeline described by a config file
    Forecast {
        /// Pipeline configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Source data file, overriding `source` in the config
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Also save the forecast to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show data information
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// List the levels of this categorical column
        #[arg(long)]
        column: Option<String>,
    },
}

// ─── Data loading ──────────────────────────────────────────────────────────────

pub fn load_data(path: &Path) -> anyhow::Result<DataFrame> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    Ok(DataLoader::new().load_auto(path)?)
}

fn save_data(df: &mut DataFrame, path: &Path) -> anyhow::Result<()> {
    step_run(&format!("Saving → {}", path.display()));
    DataSaver::save_auto(df, path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));
    Ok(())
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_encode(
    data_path: &Path,
    columns: &[String],
    output_path: &Path,
    levels_path: Option<&Path>,
    codec: &str,
    nulls: &str,
) -> anyhow::Result<()> {
    section("Encode");

    step_run("Loading data");
    let start = Instant::now();
    let df = load_data(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let roundtrip = CategoricalRoundTrip::new()
        .with_codec(LabelCodec::parse(codec)?)
        .with_null_policy(NullPolicy::parse(nulls)?);

    let columns: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
    step_run(&format!("Encoding {}", columns.join(", ").cyan()));
    let start = Instant::now();
    let (mut encoded, sets) = roundtrip.encode_many(&df, &columns)?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    for set in &sets {
        println!("  {:<24} {} levels", set.source.white(), set.len());
    }
    println!();

    save_data(&mut encoded, output_path)?;

    if let Some(path) = levels_path {
        IndicatorSet::save_all(&sets, path)?;
        step_ok(&format!("Level sets → {}", path.display()));
    }

    println!();
    Ok(())
}

pub fn cmd_decode(
    data_path: &Path,
    prefix: Option<&str>,
    levels_path: Option<&Path>,
    output_path: &Path,
    on_ambiguous: &str,
) -> anyhow::Result<()> {
    section("Decode");

    step_run("Loading data");
    let df = load_data(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let roundtrip = CategoricalRoundTrip::new().with_ambiguity(AmbiguityPolicy::parse(on_ambiguous)?);

    let start = Instant::now();
    let mut decoded = match (prefix, levels_path) {
        (_, Some(path)) => {
            let sets = IndicatorSet::load_all(path)?;
            let sources: Vec<&str> = sets.iter().map(|s| s.source.as_str()).collect();
            step_run(&format!("Decoding {}", sources.join(", ").cyan()));
            let decoded = roundtrip.decode_sets(&df, &sets)?;
            step_done(&format!("{} sets in {:?}", sets.len(), start.elapsed()));
            decoded
        }
        (Some(prefix), None) => {
            step_run(&format!("Decoding prefix {}", prefix.cyan()));
            let decoded = roundtrip.decode(&df, prefix)?;
            step_done(&format!("{:?}", start.elapsed()));
            decoded
        }
        (None, None) => anyhow::bail!("Either --prefix or --levels is required"),
    };

    save_data(&mut decoded, output_path)?;
    println!();
    Ok(())
}

pub fn cmd_sanitize(data_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    section("Sanitize");

    step_run("Loading data");
    let df = load_data(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let mut sanitized = sanitize_column_names(&df)?;

    println!();
    for (before, after) in df.get_column_names().iter().zip(sanitized.get_column_names()) {
        if before.as_str() != after.as_str() {
            println!("  {:<28} {} {}", muted(before.as_str()), dim("→"), after.as_str().white());
        }
    }
    println!();

    save_data(&mut sanitized, output_path)?;
    println!();
    Ok(())
}

pub fn cmd_forecast(
    config_path: &Path,
    data_path: Option<&Path>,
    output_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Forecast");

    let mut config = ForecastConfig::from_file(config_path)?;
    if let Some(path) = data_path {
        config.source = Some(path.to_path_buf());
    }
    let Some(source) = config.source.clone() else {
        anyhow::bail!("No source table: pass --data or set `source` in {}", config_path.display());
    };

    step_run("Loading data");
    let start = Instant::now();
    let df = load_data(&source)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let pipeline = ForecastPipeline::new(config)?;
    let mut engine = SegmentMeanForecaster::new(pipeline.config().interval_width)?;

    step_run(&format!("Forecasting {} periods", pipeline.config().periods));
    let start = Instant::now();
    let mut run = if pipeline.config().destination.is_some() {
        let sink = LocalWarehouse::new(&pipeline.config().warehouse_root);
        pipeline.run_and_persist(&df, &mut engine, &sink)?
    } else {
        pipeline.run(&df, &mut engine)?
    };
    step_done(&format!("{:?}", start.elapsed()));

    if let Some(path) = output_path {
        save_data(&mut run.forecast, path)?;
    }

    println!();
    line_box_top();
    line_box(&kv("History rows ", &run.history_rows.to_string()));
    line_box(&kv("Regressors   ", &run.indicator_sets.iter().map(|s| s.len()).sum::<usize>().to_string()));
    line_box(&kv("Output rows  ", &run.forecast.height().to_string()));
    if let Some(table) = &run.table {
        line_box(&kv("Table        ", &table.to_string()));
    }
    line_box_bottom();
    println!();

    println!("{}", run.forecast.head(Some(10)));
    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path, column: Option<&str>) -> anyhow::Result<()> {
    section("Data Info");

    let df = load_data(data_path)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), df.height());
    println!("  {:<12} {}", muted("Columns"), df.width());
    println!("  {:<12} {:.2} MB", muted("Memory"), df.estimated_size() as f64 / 1024.0 / 1024.0);
    println!();

    println!("  {:<20} {:<12} {:>6} {:>8}", muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"));
    println!("  {}", dim(&"─".repeat(50)));

    for col in df.get_columns() {
        println!(
            "  {:<20} {:<12} {:>6} {:>8}",
            col.name(),
            format!("{:?}", col.dtype()).truecolor(140, 140, 140),
            col.null_count(),
            col.n_unique().unwrap_or(0)
        );
    }

    if let Some(column) = column {
        let levels = observed_levels(&df, column)?;
        section(&format!("Levels of {}", column));
        for level in &levels {
            println!("  {}", level);
        }
    }

    println!();
    Ok(())
}
