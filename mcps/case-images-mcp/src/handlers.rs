//! Tool handlers
//!
//! Each handler takes the shared search session and its params and renders
//! the outcome as a JSON tool result.

use case_aggregator::{CaseResult, Language, OffsetTable, SearchRequest, SearchSession, SessionSettings};
use case_common::{json_success, text_success, McpResult, ResultExt};
use rmcp::model::CallToolResult;
use serde::Serialize;

use crate::error::ToolError;
use crate::params::*;

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<CaseResult>,
    pub offsets: OffsetTable,
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse<'a> {
    pub provider: &'a str,
    #[serde(flatten)]
    pub settings: &'a SessionSettings,
}

/// `en`, `pt` or `es`; anything else falls back to English
pub fn parse_language(code: &str) -> Language {
    match code.trim().to_ascii_lowercase().as_str() {
        "pt" => Language::Pt,
        "es" => Language::Es,
        _ => Language::En,
    }
}

/// Replace inline image data with a short marker
///
/// Generated images carry their bytes as `data:` URLs, which would swamp a
/// tool response.
pub fn strip_inline_payloads(mut results: Vec<CaseResult>) -> Vec<CaseResult> {
    for image in results.iter_mut().flat_map(|r| r.images.iter_mut()) {
        if image.is_inline() {
            let mime = image
                .image_url
                .trim_start_matches("data:")
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string();
            let size = image
                .image_url
                .split_once(',')
                .map(|(_, payload)| payload.len())
                .unwrap_or_default();
            image.image_url = format!("data:{};base64,<{} characters omitted>", mime, size);
        }
    }
    results
}

pub async fn search_cases(
    session: &SearchSession,
    params: SearchCasesParams,
) -> McpResult<CallToolResult> {
    let request = SearchRequest {
        search_terms: params.search_terms,
        max_results: params.max_results,
        language: params.language.as_deref().map(parse_language),
    };

    let mut report = session.search(request).await.map_err(ToolError).to_mcp_err()?;
    report.results = strip_inline_payloads(report.results);
    json_success(&report)
}

pub async fn load_more(
    session: &SearchSession,
    params: LoadMoreParams,
) -> McpResult<CallToolResult> {
    let mut report = session
        .load_more(&params.search_term)
        .await
        .map_err(ToolError)
        .to_mcp_err()?;
    report.results = strip_inline_payloads(report.results);
    json_success(&report)
}

pub async fn get_results(
    session: &SearchSession,
    params: GetResultsParams,
) -> McpResult<CallToolResult> {
    let mut results = session.results().await;
    if !params.include_generated_payloads {
        results = strip_inline_payloads(results);
    }

    json_success(&ResultsResponse {
        results,
        offsets: session.offsets().await,
    })
}

pub async fn download_archive(
    session: &SearchSession,
    params: DownloadArchiveParams,
) -> McpResult<CallToolResult> {
    let summary = session
        .archive(&params.search_term)
        .await
        .map_err(ToolError)
        .to_mcp_err()?;
    json_success(&summary)
}

pub async fn reset_session(session: &SearchSession) -> McpResult<CallToolResult> {
    session.reset().await;
    Ok(text_success("Session reset: results and offsets cleared"))
}

pub fn get_config(session: &SearchSession) -> McpResult<CallToolResult> {
    json_success(&ConfigResponse {
        provider: session.provider_name(),
        settings: session.settings(),
    })
}
