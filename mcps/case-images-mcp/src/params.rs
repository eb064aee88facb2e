//! Parameter types for the case image tools

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchCasesParams {
    #[schemars(description = "Names or case subjects to search for, one per line")]
    pub search_terms: String,

    #[schemars(description = "Images to fetch per term in this call (default from config, at most 100 per call)")]
    pub max_results: Option<usize>,

    #[schemars(description = "Language for generated descriptions: 'en', 'pt' or 'es' (generation provider only)")]
    pub language: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LoadMoreParams {
    #[schemars(description = "A term from a previous search to fetch the next batch for")]
    pub search_term: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct GetResultsParams {
    #[schemars(description = "Include the base64 data of generated images (default: false)")]
    #[serde(default)]
    pub include_generated_payloads: bool,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DownloadArchiveParams {
    #[schemars(description = "The term whose accumulated images should be downloaded as a ZIP")]
    pub search_term: String,
}
