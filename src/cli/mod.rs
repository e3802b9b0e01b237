//! CLI module for ragstore.

pub mod commands;

use clap::{Parser, Subcommand};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {s}")),
        }
    }
}

/// Document ingestion and similarity retrieval over Qdrant.
#[derive(Debug, Parser)]
#[command(name = "ragstore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List vector store collections
    Collections,

    /// Chunk, embed and store a file or inline text
    Ingest(commands::IngestArgs),

    /// Search a collection
    Search(commands::SearchArgs),

    /// Delete a collection
    Delete(commands::DeleteArgs),

    /// Serve the JSON tool protocol over stdio
    Serve,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
