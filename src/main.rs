//! Demandcast - Main Entry Point

use clap::Parser;
use demandcast::cli::{cmd_decode, cmd_encode, cmd_forecast, cmd_info, cmd_sanitize, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demandcast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encode { data, columns, output, levels, codec, nulls } => {
            cmd_encode(&data, &columns, &output, levels.as_deref(), &codec, &nulls)?;
        }
        Commands::Decode { data, prefix, levels, output, on_ambiguous } => {
            cmd_decode(&data, prefix.as_deref(), levels.as_deref(), &output, &on_ambiguous)?;
        }
        Commands::Sanitize { data, output } => {
            cmd_sanitize(&data, &output)?;
        }
        Commands::Forecast { config, data, output } => {
            cmd_forecast(&config, data.as_deref(), output.as_deref())?;
        }
        Commands::Info { data, column } => {
            cmd_info(&data, column.as_deref())?;
        }
    }

    Ok(())
}
