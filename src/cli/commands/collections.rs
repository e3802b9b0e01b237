use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::OutputFormat;
use crate::models::Config;
use crate::services::Pipeline;

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(required = true, help = "Collection to delete")]
    pub collection: String,
}

pub async fn handle_collections(config: Arc<Config>, format: OutputFormat) -> Result<()> {
    let pipeline = Pipeline::new(config)?;
    let collections = pipeline
        .list_collections()
        .await
        .context("failed to list collections")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&collections)?),
        OutputFormat::Text if collections.is_empty() => println!("No collections."),
        OutputFormat::Text => {
            for name in collections {
                println!("{name}");
            }
        }
    }
    Ok(())
}

pub async fn handle_delete(args: DeleteArgs, config: Arc<Config>, format: OutputFormat) -> Result<()> {
    let pipeline = Pipeline::new(config)?;
    pipeline
        .delete_collection(&args.collection)
        .await
        .with_context(|| format!("failed to delete collection '{}'", args.collection))?;

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "deleted": args.collection })
        ),
        OutputFormat::Text => println!("Deleted collection '{}'", args.collection),
    }
    Ok(())
}
