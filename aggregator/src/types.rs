//! Core data model shared by providers, the paginator, the orchestrator,
//! the merger and the archive assembler.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::Deref;

use crate::error::ProviderError;

// ============================================================================
// Search terms
// ============================================================================

/// A single search subject: non-empty and trimmed
///
/// Terms are compared by exact string match. No case folding or inner
/// whitespace normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Build a term from raw input, returning `None` if it is blank
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Parse a newline-separated term list
    ///
    /// Lines are trimmed, blank lines dropped and exact duplicates removed,
    /// keeping the first occurrence.
    pub fn parse_list(input: &str) -> Vec<SearchTerm> {
        let mut seen = HashSet::new();
        input
            .lines()
            .filter_map(SearchTerm::new)
            .filter(|term| seen.insert(term.clone()))
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix used for image ids: whitespace runs become `-`
    pub fn id_prefix(&self) -> String {
        self.0.split_whitespace().collect::<Vec<_>>().join("-")
    }
}

impl Deref for SearchTerm {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SearchTerm {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Search filters and options
// ============================================================================

/// Safe-search level sent to the search provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SafeSearch {
    Off,
    #[default]
    Medium,
    High,
}

impl SafeSearch {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafeSearch::Off => "off",
            SafeSearch::Medium => "medium",
            SafeSearch::High => "high",
        }
    }
}

/// Requested image size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    Small,
    Medium,
    #[default]
    Large,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Small => "small",
            ImageSize::Medium => "medium",
            ImageSize::Large => "large",
        }
    }
}

/// Requested image type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Face,
    #[default]
    Photo,
    Clipart,
    Lineart,
}

impl ImageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageType::Face => "face",
            ImageType::Photo => "photo",
            ImageType::Clipart => "clipart",
            ImageType::Lineart => "lineart",
        }
    }
}

/// Filters applied to every page request
///
/// The search variant sends the safe-search, size and type filters; the
/// generation variant only reads `language`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SearchFilters {
    #[serde(default)]
    pub safe_search: SafeSearch,
    #[serde(default)]
    pub image_size: ImageSize,
    #[serde(default)]
    pub image_type: ImageType,
    #[serde(default)]
    pub language: Language,
}

/// Language for generated descriptions (generation variant only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Pt,
    Es,
}

impl Language {
    /// Name used inside generation prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Pt => "Portuguese",
            Language::Es => "Spanish",
        }
    }
}

// ============================================================================
// Image records and pages
// ============================================================================

/// Metadata attached to images produced by the generation variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Prompt-ready description of the scene
    pub description: String,
    /// Short category such as `mugshot` or `courtroom`
    pub image_type: String,
    pub year: i32,
    pub generated_filename: String,
}

/// A single image found (or generated) for a term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// `<term-prefix>-<absolute start index>`; unique within one term's pages
    pub id: String,
    /// Remote URL, or a `data:` URL for generated images
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display domain or attribution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Page the image was found on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedImage>,
}

impl ImageRecord {
    /// Build the stable id for the item at `absolute_index` (1-based)
    pub fn make_id(term: &SearchTerm, absolute_index: usize) -> String {
        format!("{}-{}", term.id_prefix(), absolute_index)
    }

    /// Whether the image bytes are embedded in `image_url`
    pub fn is_inline(&self) -> bool {
        self.image_url.starts_with("data:")
    }
}

/// What a provider returns for a single page request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderPage {
    pub images: Vec<ImageRecord>,
    /// Total matches reported by the provider, if known
    pub total_results: Option<u64>,
}

/// Aggregated result of paginating one term in one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub images: Vec<ImageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    pub current_page: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl PageResult {
    /// The result attached to a term whose pipeline failed outright
    pub fn empty() -> Self {
        Self {
            images: Vec::new(),
            total_results: None,
            current_page: 1,
            total_pages: 0,
            has_more: false,
        }
    }
}

// ============================================================================
// Orchestration outcomes
// ============================================================================

/// Result of one term's pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum TermResult {
    /// Pagination ran; `error` is set when it was truncated by a provider error
    Fetched {
        page: PageResult,
        error: Option<ProviderError>,
    },
    /// Nothing could be fetched for the term
    Failed { error: ProviderError },
}

/// Per-term outcome of one orchestration call
#[derive(Debug, Clone, PartialEq)]
pub struct TermOutcome {
    pub term: SearchTerm,
    pub result: TermResult,
    /// Resume cursor for the next "load more" on this term
    pub new_offset: usize,
}

impl TermOutcome {
    /// Images fetched in this call (empty for failed terms)
    pub fn images(&self) -> &[ImageRecord] {
        match &self.result {
            TermResult::Fetched { page, .. } => &page.images,
            TermResult::Failed { .. } => &[],
        }
    }

    /// Pagination state; failed terms report [`PageResult::empty`]
    pub fn page(&self) -> PageResult {
        match &self.result {
            TermResult::Fetched { page, .. } => page.clone(),
            TermResult::Failed { .. } => PageResult::empty(),
        }
    }

    pub fn error(&self) -> Option<&ProviderError> {
        match &self.result {
            TermResult::Fetched { error, .. } => error.as_ref(),
            TermResult::Failed { error } => Some(error),
        }
    }
}

/// Display-level aggregate of everything fetched for a term this session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub term: SearchTerm,
    /// Append-only across "load more" calls
    pub images: Vec<ImageRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
    pub current_page: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

// ============================================================================
// Offset table
// ============================================================================

/// Per-term resume offsets, owned by the caller and passed through each call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OffsetTable(BTreeMap<SearchTerm, usize>);

impl OffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset for a term; unseen terms start at zero
    pub fn get(&self, term: &str) -> usize {
        self.0.get(term).copied().unwrap_or(0)
    }

    /// A copy of this table with `term` set to `offset`
    pub fn with_offset(&self, term: SearchTerm, offset: usize) -> Self {
        let mut next = self.clone();
        next.0.insert(term, offset);
        next
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SearchTerm, &usize)> {
        self.0.iter()
    }
}

impl FromIterator<(SearchTerm, usize)> for OffsetTable {
    fn from_iter<I: IntoIterator<Item = (SearchTerm, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> SearchTerm {
        SearchTerm::new(s).unwrap()
    }

    #[test]
    fn test_search_term_trims_and_rejects_blank() {
        assert_eq!(term("  Al Capone \t").as_str(), "Al Capone");
        assert!(SearchTerm::new("   ").is_none());
        assert!(SearchTerm::new("").is_none());
    }

    #[test]
    fn test_parse_list_drops_blank_lines_and_duplicates() {
        let terms = SearchTerm::parse_list("Al Capone\n\n  Ted Bundy \nAl Capone\nal capone\n");
        let names: Vec<&str> = terms.iter().map(|t| t.as_str()).collect();
        assert_eq!(names, vec!["Al Capone", "Ted Bundy", "al capone"]);
    }

    #[test]
    fn test_image_id_replaces_whitespace_runs() {
        let t = term("Bonnie  and\tClyde");
        assert_eq!(ImageRecord::make_id(&t, 11), "Bonnie-and-Clyde-11");
    }

    #[test]
    fn test_offset_table_with_offset_leaves_original_untouched() {
        let table = OffsetTable::new().with_offset(term("a"), 10);
        let next = table.with_offset(term("b"), 5);

        assert_eq!(table.get("a"), 10);
        assert_eq!(table.get("b"), 0);
        assert_eq!(next.get("a"), 10);
        assert_eq!(next.get("b"), 5);
        assert_eq!(next.len(), 2);
    }

    #[test]
    fn test_offset_table_serializes_as_map() {
        let table = OffsetTable::new().with_offset(term("Al Capone"), 20);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"Al Capone":20}"#);
    }

    #[test]
    fn test_failed_outcome_reports_empty_page() {
        let outcome = TermOutcome {
            term: term("x"),
            result: TermResult::Failed {
                error: ProviderError::Request("timeout".into()),
            },
            new_offset: 7,
        };

        assert!(outcome.images().is_empty());
        assert_eq!(outcome.page(), PageResult::empty());
        assert!(outcome.error().is_some());
    }

    #[test]
    fn test_filter_defaults() {
        let filters = SearchFilters::default();
        assert_eq!(filters.safe_search.as_str(), "medium");
        assert_eq!(filters.image_size.as_str(), "large");
        assert_eq!(filters.image_type.as_str(), "photo");
    }

    #[test]
    fn test_language_deserializes_from_code() {
        let lang: Language = serde_json::from_str("\"pt\"").unwrap();
        assert_eq!(lang.display_name(), "Portuguese");
    }
}
