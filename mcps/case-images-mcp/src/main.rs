//! Case Images MCP Server
//!
//! Multi-term case image search with load-more and ZIP archives.
//!
//! # Configuration
//! Set `CASE_IMAGES_API_KEY` and `CASE_IMAGES_ENGINE_ID` (or
//! `CASE_IMAGES_GENERATIVE_API_KEY`), or configure in
//! `<config dir>/case-images/config.toml`.

use case_aggregator::Config;
use case_images_mcp::CaseImagesMcpServer;
use rmcp::{transport::stdio, ServiceExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    case_common::init_tracing(&["case_images_mcp", "case_aggregator"])?;

    tracing::info!("Starting Case Images MCP Server");

    let config = Config::load()?;
    tracing::info!("Archives will be written to {}", config.archive.output_dir.display());

    let server = CaseImagesMcpServer::new(config)?;
    let service = server.serve(stdio()).await?;

    tracing::info!("Server running, waiting for requests...");
    service.waiting().await?;

    tracing::info!("Server shutting down");
    Ok(())
}
