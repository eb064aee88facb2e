//! Image source providers
//!
//! This module provides a trait-based abstraction over where images come
//! from. Two providers exist: a paginated image search API and a generation
//! API that synthesizes images from generated descriptions. One is selected
//! by configuration and the rest of the pipeline treats them the same.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, HttpConfig, ProviderKind};
use crate::error::ProviderResult;
use crate::pacing::{IntervalPacer, Pacer};
use crate::types::{ProviderPage, SearchFilters, SearchTerm};

pub mod custom_search;
pub mod generative;

pub use custom_search::CustomSearchProvider;
pub use generative::GenerativeProvider;

/// A source of images for a search term, addressed page by page
#[async_trait]
pub trait ImageSourceProvider: Send + Sync {
    /// Name of this provider, used in logs and status output
    fn name(&self) -> &str;

    /// Largest number of items a single page request may ask for
    fn max_page_size(&self) -> usize;

    /// Human-readable name of the first missing credential, if any
    fn missing_credential(&self) -> Option<&'static str>;

    /// Fetch one page of images for `term`
    ///
    /// `start_index` is 1-based. A page with no images means the provider has
    /// nothing more for this term; it is not an error.
    async fn fetch_page(
        &self,
        term: &SearchTerm,
        start_index: usize,
        page_size: usize,
        filters: &SearchFilters,
    ) -> ProviderResult<ProviderPage>;
}

/// Build the HTTP client shared by providers and the image fetcher
pub fn build_http_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(&config.user_agent)
        .build()?;
    Ok(client)
}

/// Build the provider selected by `config.provider.kind`
pub fn build_provider(config: &Config, client: Client) -> Arc<dyn ImageSourceProvider> {
    match config.provider.kind {
        ProviderKind::CustomSearch => {
            tracing::info!("Using custom search provider at {}", config.custom_search.endpoint);
            Arc::new(CustomSearchProvider::new(client, &config.custom_search))
        }
        ProviderKind::Generative => {
            tracing::info!(
                "Using generative provider ({} / {})",
                config.generative.text_model,
                config.generative.image_model
            );
            let pacer: Arc<dyn Pacer> =
                Arc::new(IntervalPacer::from_millis(config.search.page_delay_ms));
            Arc::new(GenerativeProvider::new(client, &config.generative, pacer))
        }
    }
}
