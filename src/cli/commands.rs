use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::cli::config::AuditorConfig;
use crate::pipeline::{AnalysisKind, AuditPipeline};
use crate::server::HttpServer;

/// Run the HTTP API server
pub async fn serve(addr: Option<String>) -> Result<()> {
    let mut config = AuditorConfig::load_default()?;

    if let Some(addr) = addr {
        config.server.listen_addr = addr;
    }

    if config.completion.api_key.is_none() {
        // The server still starts; every request will explain the missing key
        info!("GROQ_API_KEY is not set - analysis requests will fail until it is");
    }

    let server_settings = config.server.clone();
    let pipeline = Arc::new(AuditPipeline::from_config(config)?);

    HttpServer::new(server_settings, pipeline).run().await
}

/// Run the pipeline once for a URL and print the result
pub async fn run_once(url: String, kind: AnalysisKind) -> Result<()> {
    let config = AuditorConfig::load_default()?;
    let pipeline = AuditPipeline::from_config(config)?;

    let result = pipeline
        .run(&url, kind)
        .await
        .context(format!("Request failed for: {}", url))?;

    println!("{}", result);

    Ok(())
}
