//! Image search API provider
//!
//! Issues one `searchType=image` request per page and normalizes the items
//! into [`ImageRecord`]s.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::ImageSourceProvider;
use crate::config::CustomSearchConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::types::{ImageRecord, ProviderPage, SearchFilters, SearchTerm};

/// The API never returns more than this many items per request
pub const MAX_PAGE_SIZE: usize = 10;

/// Paginated image search provider
pub struct CustomSearchProvider {
    client: Client,
    api_key: String,
    search_engine_id: String,
    endpoint: String,
}

impl CustomSearchProvider {
    pub fn new(client: Client, config: &CustomSearchConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            search_engine_id: config.search_engine_id.clone(),
            endpoint: config.endpoint.clone(),
        }
    }
}

// API response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    search_information: Option<SearchInformation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchInformation {
    total_results: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    link: String,
    title: Option<String>,
    display_link: Option<String>,
    image: Option<ItemImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemImage {
    context_link: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    thumbnail_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Extract `error.message` from an error body, if there is one
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
}

/// `totalResults` arrives as a decimal string; zero counts as unknown
fn parse_total(info: Option<SearchInformation>) -> Option<u64> {
    info.and_then(|i| i.total_results)
        .and_then(|total| total.parse::<u64>().ok())
        .filter(|total| *total > 0)
}

fn normalize(term: &SearchTerm, absolute_index: usize, item: SearchItem) -> ImageRecord {
    let image = item.image;
    let (context_link, width, height, thumbnail_url) = match image {
        Some(i) => (i.context_link, i.width, i.height, i.thumbnail_link),
        None => (None, None, None, None),
    };

    ImageRecord {
        id: ImageRecord::make_id(term, absolute_index),
        article_url: Some(context_link.unwrap_or_else(|| item.link.clone())),
        image_url: item.link,
        title: item.title,
        source: item.display_link,
        width,
        height,
        thumbnail_url,
        generated: None,
    }
}

#[async_trait]
impl ImageSourceProvider for CustomSearchProvider {
    fn name(&self) -> &str {
        "custom_search"
    }

    fn max_page_size(&self) -> usize {
        MAX_PAGE_SIZE
    }

    fn missing_credential(&self) -> Option<&'static str> {
        if self.api_key.trim().is_empty() {
            Some("Google API key")
        } else if self.search_engine_id.trim().is_empty() {
            Some("Custom Search Engine ID")
        } else {
            None
        }
    }

    #[instrument(skip(self, filters), fields(term = %term))]
    async fn fetch_page(
        &self,
        term: &SearchTerm,
        start_index: usize,
        page_size: usize,
        filters: &SearchFilters,
    ) -> ProviderResult<ProviderPage> {
        let num = page_size.clamp(1, MAX_PAGE_SIZE);

        let params = [
            ("key", self.api_key.clone()),
            ("cx", self.search_engine_id.clone()),
            ("q", term.to_string()),
            ("searchType", "image".to_string()),
            ("safe", filters.safe_search.as_str().to_string()),
            ("imgSize", filters.image_size.as_str().to_string()),
            ("imgType", filters.image_type.as_str().to_string()),
            ("num", num.to_string()),
            ("start", start_index.max(1).to_string()),
        ];

        debug!(start_index, num, "requesting image page");

        let response = self.client.get(&self.endpoint).query(&params).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
            warn!(status = status.as_u16(), %message, "image search request failed");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SearchResponse = serde_json::from_str(&body)?;
        let total_results = parse_total(parsed.search_information);

        let images: Vec<ImageRecord> = parsed
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| normalize(term, start_index + index, item))
            .collect();

        debug!(count = images.len(), ?total_results, "received image page");

        Ok(ProviderPage {
            images,
            total_results,
        })
    }
}
