use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args};

use super::provider::ProviderArgs;
use crate::cli::OutputFormat;
use crate::models::Config;
use crate::services::{IngestInput, Pipeline};

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("input").required(true).args(["file", "text"])))]
pub struct IngestArgs {
    #[arg(help = "File to ingest, relative to the upload directory")]
    pub file: Option<PathBuf>,

    #[arg(long, short = 't', help = "Ingest inline text instead of a file")]
    pub text: Option<String>,

    #[arg(long, help = "Source label stored with inline text")]
    pub source: Option<String>,

    #[arg(long, short = 'c', required = true, help = "Destination collection")]
    pub collection: String,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

pub async fn handle_ingest(args: IngestArgs, config: Arc<Config>, format: OutputFormat) -> Result<()> {
    let input = match (args.file, args.text) {
        (Some(file), _) => IngestInput::File(file),
        (None, Some(text)) => IngestInput::Text {
            text,
            source: args.source,
        },
        (None, None) => anyhow::bail!("either a file or --text is required"),
    };

    let pipeline = Pipeline::new(config)?;
    let request = args.provider.to_request();
    let report = pipeline
        .ingest(input, &args.collection, request.as_ref())
        .await
        .context("ingest failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            if report.created_collection {
                println!(
                    "Created collection '{}' (vector size {})",
                    report.collection, report.vector_size
                );
            }
            println!(
                "Ingested {} chunks into '{}'",
                report.chunks, report.collection
            );
        }
    }
    Ok(())
}
