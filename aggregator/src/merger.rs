//! Folding search outcomes into the cumulative per-term results

use std::collections::HashSet;

use crate::types::{CaseResult, SearchTerm, TermOutcome};

/// A requested term that produced no images in this call
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FailedTerm {
    pub term: SearchTerm,
    /// Provider error message, when the term failed rather than came back empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Merged results and the terms that came back empty
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutput {
    pub results: Vec<CaseResult>,
    pub failed_terms: Vec<FailedTerm>,
}

/// Merge `outcomes` into `prior`
///
/// Images only ever accumulate: a term with new images gets them appended
/// after its existing ones, and a term with nothing new keeps its prior
/// entry as is. Merged terms come first in outcome order, then the
/// untouched prior entries in their original order. A requested term with
/// no outcome at all is reported as failed.
pub fn merge(
    prior: &[CaseResult],
    outcomes: &[TermOutcome],
    requested_terms: &[SearchTerm],
) -> MergeOutput {
    let mut results = Vec::with_capacity(prior.len() + outcomes.len());
    let mut failed_terms = Vec::new();
    let mut merged: HashSet<&SearchTerm> = HashSet::new();

    for outcome in outcomes {
        if outcome.images().is_empty() {
            failed_terms.push(FailedTerm {
                term: outcome.term.clone(),
                error: outcome.error().map(|e| e.to_string()),
            });
            continue;
        }
        if !merged.insert(&outcome.term) {
            continue;
        }

        let page = outcome.page();
        let existing = prior.iter().find(|r| r.term == outcome.term);

        let (images, total_results) = match existing {
            Some(existing) => {
                let mut images = existing.images.clone();
                images.extend(page.images);
                (images, page.total_results.or(existing.total_results))
            }
            None => (page.images, page.total_results),
        };

        results.push(CaseResult {
            term: outcome.term.clone(),
            images,
            total_results,
            current_page: page.current_page,
            total_pages: page.total_pages,
            has_more: page.has_more,
        });
    }

    for term in requested_terms {
        if !outcomes.iter().any(|o| &o.term == term) {
            failed_terms.push(FailedTerm {
                term: term.clone(),
                error: None,
            });
        }
    }

    results.extend(
        prior
            .iter()
            .filter(|r| !merged.contains(&r.term))
            .cloned(),
    );

    MergeOutput {
        results,
        failed_terms,
    }
}
