//! CLI tool for inspecting database schemas

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use schema_scan::engines::mysql::MySqlTypeClassifier;
use schema_scan::{init_logging, Factory, Source, SourceConfiguration};

/// Entry point for the schema-tool CLI
#[derive(Parser)]
#[command(name = "schema-tool")]
#[command(about = "Introspect a database schema into a normalized table model", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every base table and print the normalized items
    Scan {
        /// Path to the source configuration file (TOML, YAML or JSON)
        #[arg(short, long, value_name = "CONFIG")]
        config: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Output file ('-' for stdout)
        #[arg(short, long, value_name = "OUTPUT", default_value = "-")]
        output: PathBuf,
    },
    /// List base tables, marking the excluded ones
    Tables {
        /// Path to the source configuration file (TOML, YAML or JSON)
        #[arg(short, long, value_name = "CONFIG")]
        config: PathBuf,
    },
    /// Classify a single MySQL column type token, e.g. "bigint(20) unsigned"
    Classify {
        /// Column type as reported by SHOW FULL COLUMNS
        token: String,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum OutputFormat {
    Json,
    Yaml,
}

fn write_output(output: &Path, text: &str) -> Result<()> {
    if output.to_string_lossy() == "-" {
        io::stdout().write_all(text.as_bytes())?;
    } else {
        let mut out_file = File::create(output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        out_file.write_all(text.as_bytes())?;
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<SourceConfiguration> {
    SourceConfiguration::from_file(path)
        .await
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            config,
            format,
            output,
        } => {
            let configuration = load_config(&config).await?;
            let mut source = Source::new(configuration, Vec::new());
            source.load().await.context("scan failed")?;

            let mut text = match format {
                OutputFormat::Json => serde_json::to_string_pretty(source.items())?,
                OutputFormat::Yaml => serde_yaml::to_string(source.items())?,
            };
            if !text.ends_with('\n') {
                text.push('\n');
            }
            write_output(&output, &text)?;
            source.close().await?;
        }
        Commands::Tables { config } => {
            let configuration = load_config(&config).await?;
            let connection = Factory::connect(&configuration).await?;
            let scanner = Factory::scanner(&configuration, connection.clone())?;

            for table in scanner.tables().await? {
                if configuration.excludes.contains(&table) {
                    println!("{} (excluded)", table);
                } else {
                    println!("{}", table);
                }
            }
            connection.close().await?;
        }
        Commands::Classify { token } => {
            let info = MySqlTypeClassifier::new()
                .classify(&token)
                .with_context(|| format!("malformed type token: {}", token))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
