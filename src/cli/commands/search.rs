use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use super::provider::ProviderArgs;
use crate::cli::OutputFormat;
use crate::models::Config;
use crate::services::{Pipeline, format_results};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'c', required = true, help = "Collection to search")]
    pub collection: String,

    #[arg(long, short = 'n', help = "Maximum number of results to return")]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

pub async fn handle_search(args: SearchArgs, config: Arc<Config>, format: OutputFormat) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }

    let pipeline = Pipeline::new(config)?;
    let request = args.provider.to_request();
    let results = pipeline
        .retrieve(query, &args.collection, request.as_ref(), args.limit)
        .await
        .context("search failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Text => println!("{}", format_results(&results)),
    }
    Ok(())
}
