//! MCP server exposing the case image search session

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use std::sync::Arc;

use case_aggregator::{Config, SearchSession};

use crate::handlers;
use crate::params::*;

/// The case image MCP server
///
/// All clones share one [`SearchSession`], so results and offsets persist
/// across tool calls for the lifetime of the process.
#[derive(Clone)]
pub struct CaseImagesMcpServer {
    session: Arc<SearchSession>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CaseImagesMcpServer {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let session = SearchSession::from_config(&config)?;
        tracing::info!("Image source: {}", session.provider_name());

        Ok(Self {
            session: Arc::new(session),
            tool_router: Self::tool_router(),
        })
    }

    #[tool(
        description = "Search images for one or more case subjects (one per line). Each subject is paged independently; results accumulate across calls and terms that return nothing are listed in failed_terms."
    )]
    async fn search_cases(
        &self,
        Parameters(params): Parameters<SearchCasesParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::search_cases(&self.session, params).await
    }

    #[tool(
        description = "Fetch the next batch of images for a subject from a previous search, using that search's options. New images are appended to the subject's results."
    )]
    async fn load_more(
        &self,
        Parameters(params): Parameters<LoadMoreParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::load_more(&self.session, params).await
    }

    #[tool(description = "Get the accumulated results and resume offsets of this session")]
    async fn get_results(
        &self,
        Parameters(params): Parameters<GetResultsParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::get_results(&self.session, params).await
    }

    #[tool(
        description = "Download every accumulated image of a subject and save them as one ZIP archive. Images that fail fall back to their thumbnail; the archive is named after how many succeeded."
    )]
    async fn download_archive(
        &self,
        Parameters(params): Parameters<DownloadArchiveParams>,
    ) -> Result<CallToolResult, McpError> {
        handlers::download_archive(&self.session, params).await
    }

    #[tool(description = "Clear all results and offsets and start a fresh session")]
    async fn reset_session(&self) -> Result<CallToolResult, McpError> {
        handlers::reset_session(&self.session).await
    }

    #[tool(description = "Show the active image source, result budgets, filters and archive directory")]
    async fn get_config(&self) -> Result<CallToolResult, McpError> {
        handlers::get_config(&self.session)
    }
}

#[tool_handler]
impl rmcp::ServerHandler for CaseImagesMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Case image search server. Search several subjects at once, load more \
                 results per subject, and download a subject's images as a ZIP archive. \
                 Results and resume offsets persist for the session."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
