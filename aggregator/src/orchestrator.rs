//! Concurrent search over many terms
//!
//! Every term gets its own pagination pipeline on a tokio task. Pipelines
//! share nothing but the provider and pacer, so a failing term never
//! affects its siblings. Outcomes come back in input order.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::error::ProviderError;
use crate::paginator::{PageLimits, Paginator, TermPage, MAX_PAGES_PER_CALL};
use crate::types::{OffsetTable, SearchFilters, SearchTerm, TermOutcome, TermResult};

/// Outcomes of one orchestration call together with the updated offsets
#[derive(Debug, Clone, PartialEq)]
pub struct SearchBatch {
    /// One outcome per requested term, in request order
    pub outcomes: Vec<TermOutcome>,
    /// The input table with every requested term's offset updated
    pub offsets: OffsetTable,
}

/// Runs one paginator pipeline per term
pub struct SearchOrchestrator {
    paginator: Arc<Paginator>,
    page_size: usize,
    max_pages: usize,
}

impl SearchOrchestrator {
    pub fn new(paginator: Arc<Paginator>, page_size: usize, max_pages: usize) -> Self {
        Self {
            paginator,
            page_size: page_size.max(1),
            max_pages: max_pages.clamp(1, MAX_PAGES_PER_CALL),
        }
    }

    /// Search all `terms` concurrently, each resuming from its offset
    #[instrument(skip_all, fields(terms = terms.len(), budget = budget))]
    pub async fn search_all(
        &self,
        terms: &[SearchTerm],
        budget: usize,
        filters: &SearchFilters,
        offsets: &OffsetTable,
    ) -> SearchBatch {
        let limits = PageLimits {
            budget,
            page_size: self.page_size,
            max_pages: self.max_pages,
        };

        let handles: Vec<_> = terms
            .iter()
            .map(|term| {
                let paginator = Arc::clone(&self.paginator);
                let term = term.clone();
                let filters = *filters;
                let offset = offsets.get(&term);
                tokio::spawn(async move { paginator.paginate(&term, offset, limits, &filters).await })
            })
            .collect();

        let joined = join_all(handles).await;

        let mut next_offsets = offsets.clone();
        let mut outcomes = Vec::with_capacity(terms.len());

        for (term, joined) in terms.iter().zip(joined) {
            let prior = offsets.get(term);
            let outcome = match joined {
                Ok(term_page) => outcome_for(term.clone(), prior, term_page),
                Err(e) => {
                    error!(%term, error = %e, "search task failed");
                    TermOutcome {
                        term: term.clone(),
                        result: TermResult::Failed {
                            error: ProviderError::Unexpected(e.to_string()),
                        },
                        new_offset: prior,
                    }
                }
            };
            next_offsets = next_offsets.with_offset(term.clone(), outcome.new_offset);
            outcomes.push(outcome);
        }

        let fetched: usize = outcomes.iter().map(|o| o.images().len()).sum();
        info!("Fetched {} images across {} terms", fetched, outcomes.len());

        SearchBatch {
            outcomes,
            offsets: next_offsets,
        }
    }
}

/// Classify a finished pipeline: nothing fetched plus an error is a failure
fn outcome_for(term: SearchTerm, prior: usize, term_page: TermPage) -> TermOutcome {
    let TermPage { page, error } = term_page;
    match error {
        Some(error) if page.images.is_empty() => TermOutcome {
            term,
            result: TermResult::Failed { error },
            new_offset: prior,
        },
        error => TermOutcome {
            term,
            new_offset: prior + page.images.len(),
            result: TermResult::Fetched { page, error },
        },
    }
}
