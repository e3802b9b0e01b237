use std::sync::Arc;

use anyhow::{Context, Result};

use crate::models::Config;
use crate::server::ToolServer;
use crate::services::Pipeline;

pub async fn handle_serve(config: Arc<Config>) -> Result<()> {
    let pipeline = Pipeline::new(config).context("failed to initialize pipeline")?;
    ToolServer::new(Arc::new(pipeline))
        .run_stdio()
        .await
        .context("tool server failed")
}
