//! Stateful search session
//!
//! Holds the cumulative per-term results and the offset table between
//! calls. Every search or load-more runs under one async lock, so the
//! offset table is read and written atomically with respect to other
//! operations.

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::archive::{ArchiveAssembler, HttpImageFetcher, ImageFetcher};
use crate::config::Config;
use crate::error::{SessionError, SessionResult, ValidationError};
use crate::merger::{self, FailedTerm};
use crate::orchestrator::SearchOrchestrator;
use crate::pacing::{IntervalPacer, Pacer};
use crate::paginator::{Paginator, MAX_PAGES_PER_CALL};
use crate::providers::{build_http_client, build_provider, ImageSourceProvider};
use crate::types::{CaseResult, Language, OffsetTable, SearchFilters, SearchTerm};

/// Tunables of a session, derived from [`Config`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSettings {
    /// Budget used when a request does not name one
    pub max_results: usize,
    pub page_size: usize,
    pub max_pages: usize,
    pub filters: SearchFilters,
    pub output_dir: PathBuf,
    pub compression_level: i64,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        let mut filters = config.custom_search.filters();
        filters.language = config.generative.language;
        Self {
            max_results: config.search.max_results,
            page_size: config.search.page_size,
            max_pages: config.search.max_pages.clamp(1, MAX_PAGES_PER_CALL),
            filters,
            output_dir: config.archive.output_dir.clone(),
            compression_level: config.archive.compression_level,
        }
    }
}

/// One search submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    /// Newline-separated term list
    pub search_terms: String,
    pub max_results: Option<usize>,
    pub language: Option<Language>,
}

/// What a search or load-more returns to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    /// Cumulative results after this call
    pub results: Vec<CaseResult>,
    /// Requested terms that produced no images this call
    pub failed_terms: Vec<FailedTerm>,
    /// Terms that returned images but were cut short by a provider error
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub truncated_terms: Vec<FailedTerm>,
    /// Summary line shown when any term failed or was cut short
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Where an archive was written and how it went
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub file_name: String,
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SearchOptions {
    budget: usize,
    filters: SearchFilters,
}

#[derive(Debug, Default)]
struct SessionState {
    results: Vec<CaseResult>,
    offsets: OffsetTable,
    last_options: Option<SearchOptions>,
}

/// Search session shared by all tool calls
pub struct SearchSession {
    provider: Arc<dyn ImageSourceProvider>,
    orchestrator: SearchOrchestrator,
    assembler: ArchiveAssembler,
    settings: SessionSettings,
    state: Mutex<SessionState>,
}

impl SearchSession {
    /// Build a session with the provider and HTTP stack described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        let provider = build_provider(config, client.clone());
        let fetcher: Arc<dyn ImageFetcher> = Arc::new(HttpImageFetcher::new(client));
        let page_pacer: Arc<dyn Pacer> =
            Arc::new(IntervalPacer::from_millis(config.search.page_delay_ms));
        let fetch_pacer: Arc<dyn Pacer> =
            Arc::new(IntervalPacer::from_millis(config.archive.fetch_delay_ms));

        Ok(Self::new(
            provider,
            fetcher,
            page_pacer,
            fetch_pacer,
            SessionSettings::from_config(config),
        ))
    }

    pub fn new(
        provider: Arc<dyn ImageSourceProvider>,
        fetcher: Arc<dyn ImageFetcher>,
        page_pacer: Arc<dyn Pacer>,
        fetch_pacer: Arc<dyn Pacer>,
        settings: SessionSettings,
    ) -> Self {
        let page_size = settings.page_size.clamp(1, provider.max_page_size().max(1));
        let paginator = Arc::new(Paginator::new(Arc::clone(&provider), page_pacer));
        let orchestrator = SearchOrchestrator::new(paginator, page_size, settings.max_pages);
        let assembler = ArchiveAssembler::new(fetcher, fetch_pacer, settings.compression_level);

        Self {
            provider,
            orchestrator,
            assembler,
            settings,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Search every term in the request, resuming each from its offset
    #[instrument(skip(self, request))]
    pub async fn search(&self, request: SearchRequest) -> SessionResult<SearchReport> {
        let terms = SearchTerm::parse_list(&request.search_terms);
        if terms.is_empty() {
            return Err(ValidationError::NoSearchTerms.into());
        }
        self.check_credentials()?;

        let mut filters = self.settings.filters;
        if let Some(language) = request.language {
            filters.language = language;
        }
        let options = SearchOptions {
            budget: request.max_results.unwrap_or(self.settings.max_results).max(1),
            filters,
        };

        let mut state = self.state.lock().await;
        state.last_options = Some(options);
        Ok(self.run(&mut state, &terms, options).await)
    }

    /// Fetch the next batch for one term with the options of the last search
    #[instrument(skip(self))]
    pub async fn load_more(&self, term: &str) -> SessionResult<SearchReport> {
        let term = SearchTerm::new(term).ok_or(ValidationError::NoSearchTerms)?;
        self.check_credentials()?;

        let mut state = self.state.lock().await;
        let options = state.last_options.ok_or(SessionError::NoPreviousSearch)?;
        Ok(self.run(&mut state, &[term], options).await)
    }

    /// Download the term's accumulated images and write them as one ZIP
    #[instrument(skip(self))]
    pub async fn archive(&self, term: &str) -> SessionResult<ArchiveSummary> {
        let images = {
            let state = self.state.lock().await;
            state
                .results
                .iter()
                .find(|r| r.term.as_str() == term.trim())
                .map(|r| (r.term.clone(), r.images.clone()))
        };
        let (term, images) = images.ok_or_else(|| SessionError::UnknownTerm(term.to_string()))?;

        let report = self.assembler.build_archive(&term, &images).await?;
        let Some(bundle) = report.bundle else {
            return Err(SessionError::ArchiveFailed {
                term: term.to_string(),
                attempted: images.len(),
            });
        };

        tokio::fs::create_dir_all(&self.settings.output_dir).await?;
        let path = self.settings.output_dir.join(&bundle.file_name);
        tokio::fs::write(&path, &bundle.bytes).await?;
        info!("Wrote archive to {}", path.display());

        Ok(ArchiveSummary {
            path,
            file_name: bundle.file_name,
            succeeded: report.succeeded,
            failed: report.failed,
            total: images.len(),
        })
    }

    /// Cumulative results of this session
    pub async fn results(&self) -> Vec<CaseResult> {
        self.state.lock().await.results.clone()
    }

    pub async fn offsets(&self) -> OffsetTable {
        self.state.lock().await.offsets.clone()
    }

    /// Forget all results, offsets and the last search options
    pub async fn reset(&self) {
        *self.state.lock().await = SessionState::default();
        info!("Session reset");
    }

    fn check_credentials(&self) -> Result<(), ValidationError> {
        match self.provider.missing_credential() {
            Some(name) => Err(ValidationError::MissingCredential(name)),
            None => Ok(()),
        }
    }

    async fn run(
        &self,
        state: &mut SessionState,
        terms: &[SearchTerm],
        options: SearchOptions,
    ) -> SearchReport {
        let batch = self
            .orchestrator
            .search_all(terms, options.budget, &options.filters, &state.offsets)
            .await;
        let merged = merger::merge(&state.results, &batch.outcomes, terms);
        let truncated_terms: Vec<FailedTerm> = batch
            .outcomes
            .iter()
            .filter(|outcome| !outcome.images().is_empty())
            .filter_map(|outcome| {
                outcome.error().map(|e| FailedTerm {
                    term: outcome.term.clone(),
                    error: Some(e.to_string()),
                })
            })
            .collect();

        state.offsets = batch.offsets;
        state.results = merged.results;

        let message = summary_message(&merged.failed_terms, &truncated_terms);
        if let Some(message) = &message {
            warn!("{}", message);
        }

        SearchReport {
            results: state.results.clone(),
            failed_terms: merged.failed_terms,
            truncated_terms,
            message,
        }
    }
}

/// `Could not retrieve results for: a, b.`
fn failure_message(failed: &[FailedTerm]) -> Option<String> {
    if failed.is_empty() {
        return None;
    }
    let names: Vec<&str> = failed.iter().map(|f| f.term.as_str()).collect();
    Some(format!("Could not retrieve results for: {}.", names.join(", ")))
}

/// `Results for a were cut short (<error>).`, one sentence per term
fn truncation_message(truncated: &[FailedTerm]) -> Option<String> {
    if truncated.is_empty() {
        return None;
    }
    let sentences: Vec<String> = truncated
        .iter()
        .map(|t| match &t.error {
            Some(error) => format!("Results for {} were cut short ({}).", t.term, error),
            None => format!("Results for {} were cut short.", t.term),
        })
        .collect();
    Some(sentences.join(" "))
}

fn summary_message(failed: &[FailedTerm], truncated: &[FailedTerm]) -> Option<String> {
    match (failure_message(failed), truncation_message(truncated)) {
        (Some(failed), Some(truncated)) => Some(format!("{} {}", failed, truncated)),
        (failed, truncated) => failed.or(truncated),
    }
}
