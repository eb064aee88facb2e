//! Page-by-page fetching for a single term
//!
//! Starting at the term's resume offset, pages are requested sequentially
//! until the result budget is met, a page comes back empty, the page
//! ceiling is reached, or a provider error stops the walk. Images from the
//! pages that did succeed are always kept.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::pacing::Pacer;
use crate::providers::ImageSourceProvider;
use crate::types::{ImageRecord, PageResult, SearchFilters, SearchTerm};

/// Pages one call may request, whatever the configuration says
pub const MAX_PAGES_PER_CALL: usize = 10;

/// Limits applied to one pagination call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    /// Result budget for this call
    pub budget: usize,
    /// Items requested per page
    pub page_size: usize,
    /// Hard ceiling on pages per call
    pub max_pages: usize,
}

impl PageLimits {
    /// Number of page requests this call may issue
    pub fn planned_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.budget.div_ceil(self.page_size).min(self.max_pages)
    }
}

/// Outcome of paginating one term
#[derive(Debug, Clone, PartialEq)]
pub struct TermPage {
    pub page: PageResult,
    /// The provider error that cut pagination short, if any
    pub error: Option<ProviderError>,
}

/// Walks a provider's pages for one term
pub struct Paginator {
    provider: Arc<dyn ImageSourceProvider>,
    pacer: Arc<dyn Pacer>,
}

impl Paginator {
    pub fn new(provider: Arc<dyn ImageSourceProvider>, pacer: Arc<dyn Pacer>) -> Self {
        Self { provider, pacer }
    }

    /// Fetch up to `limits.budget` images for `term`, starting after `offset`
    pub async fn paginate(
        &self,
        term: &SearchTerm,
        offset: usize,
        limits: PageLimits,
        filters: &SearchFilters,
    ) -> TermPage {
        let mut images = Vec::new();
        let mut total_results = None;
        let mut error = None;

        for page in 0..limits.planned_pages() {
            if page > 0 {
                self.pacer.pause().await;
            }

            let start_index = offset + page * limits.page_size + 1;
            match self
                .provider
                .fetch_page(term, start_index, limits.page_size, filters)
                .await
            {
                Ok(result) => {
                    if page == 0 {
                        total_results = result.total_results;
                    }
                    if result.images.is_empty() {
                        debug!(%term, start_index, "empty page, stopping");
                        break;
                    }
                    images.extend(result.images);
                }
                Err(e) => {
                    warn!(%term, start_index, error = %e, "page request failed, stopping");
                    error = Some(e);
                    break;
                }
            }
        }

        let page = summarize(images, total_results, offset, limits);
        TermPage { page, error }
    }
}

fn summarize(
    images: Vec<ImageRecord>,
    total_results: Option<u64>,
    offset: usize,
    limits: PageLimits,
) -> PageResult {
    let page_size = limits.page_size.max(1);
    let fetched = images.len();

    let current_page = offset / page_size + 1;
    let total_pages = match total_results {
        Some(total) => (total as usize).div_ceil(page_size),
        None => fetched.div_ceil(page_size),
    };
    let has_more = fetched >= limits.budget && total_pages > current_page;

    PageResult {
        images,
        total_results,
        current_page,
        total_pages,
        has_more,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderResult;
    use crate::pacing::CountingPacer;
    use crate::types::ProviderPage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves `available` items for any term, `page_size` at a time
    struct StubProvider {
        available: usize,
        total: Option<u64>,
        fail_at_start: Option<usize>,
        starts: Mutex<Vec<usize>>,
    }

    impl StubProvider {
        fn new(available: usize, total: Option<u64>) -> Self {
            Self {
                available,
                total,
                fail_at_start: None,
                starts: Mutex::new(Vec::new()),
            }
        }

        fn starts(&self) -> Vec<usize> {
            self.starts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageSourceProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn max_page_size(&self) -> usize {
            10
        }

        fn missing_credential(&self) -> Option<&'static str> {
            None
        }

        async fn fetch_page(
            &self,
            term: &SearchTerm,
            start_index: usize,
            page_size: usize,
            _filters: &SearchFilters,
        ) -> ProviderResult<ProviderPage> {
            self.starts.lock().unwrap().push(start_index);
            if self.fail_at_start == Some(start_index) {
                return Err(ProviderError::Api {
                    status: 429,
                    message: "quota".into(),
                });
            }
            let first = start_index;
            let last = (start_index + page_size - 1).min(self.available);
            let images = (first..=last)
                .map(|i| ImageRecord {
                    id: ImageRecord::make_id(term, i),
                    image_url: format!("https://img.example/{}.jpg", i),
                    title: None,
                    source: None,
                    article_url: None,
                    width: None,
                    height: None,
                    thumbnail_url: None,
                    generated: None,
                })
                .collect();
            Ok(ProviderPage {
                images,
                total_results: self.total,
            })
        }
    }

    fn limits(budget: usize) -> PageLimits {
        PageLimits {
            budget,
            page_size: 10,
            max_pages: 10,
        }
    }

    fn term() -> SearchTerm {
        SearchTerm::new("Al Capone").unwrap()
    }

    #[test]
    fn test_planned_pages() {
        assert_eq!(limits(100).planned_pages(), 10);
        assert_eq!(limits(25).planned_pages(), 3);
        assert_eq!(limits(500).planned_pages(), 10);
        assert_eq!(limits(0).planned_pages(), 0);
    }

    #[tokio::test]
    async fn test_fetches_budget_with_pauses_between_pages() {
        let provider = Arc::new(StubProvider::new(1000, Some(1230)));
        let pacer = Arc::new(CountingPacer::new());
        let paginator = Paginator::new(provider.clone(), pacer.clone());

        let result = paginator
            .paginate(&term(), 0, limits(100), &SearchFilters::default())
            .await;

        assert!(result.error.is_none());
        assert_eq!(result.page.images.len(), 100);
        assert_eq!(result.page.total_results, Some(1230));
        assert_eq!(result.page.current_page, 1);
        assert_eq!(result.page.total_pages, 123);
        assert!(result.page.has_more);
        assert_eq!(provider.starts(), vec![1, 11, 21, 31, 41, 51, 61, 71, 81, 91]);
        assert_eq!(pacer.pauses(), 9);
    }

    #[tokio::test]
    async fn test_resumes_from_offset() {
        let provider = Arc::new(StubProvider::new(1000, Some(1230)));
        let paginator = Paginator::new(provider.clone(), Arc::new(CountingPacer::new()));

        let result = paginator
            .paginate(&term(), 100, limits(20), &SearchFilters::default())
            .await;

        assert_eq!(provider.starts(), vec![101, 111]);
        assert_eq!(result.page.images[0].id, "Al-Capone-101");
        assert_eq!(result.page.current_page, 11);
    }

    #[tokio::test]
    async fn test_stops_on_empty_page() {
        let provider = Arc::new(StubProvider::new(23, None));
        let paginator = Paginator::new(provider.clone(), Arc::new(CountingPacer::new()));

        let result = paginator
            .paginate(&term(), 0, limits(100), &SearchFilters::default())
            .await;

        assert_eq!(result.page.images.len(), 23);
        assert_eq!(provider.starts(), vec![1, 11, 21, 31]);
        assert_eq!(result.page.total_results, None);
        assert_eq!(result.page.total_pages, 3);
        assert!(!result.page.has_more);
    }

    #[tokio::test]
    async fn test_error_keeps_images_from_earlier_pages() {
        let mut stub = StubProvider::new(1000, Some(500));
        stub.fail_at_start = Some(21);
        let provider = Arc::new(stub);
        let paginator = Paginator::new(provider.clone(), Arc::new(CountingPacer::new()));

        let result = paginator
            .paginate(&term(), 0, limits(100), &SearchFilters::default())
            .await;

        assert_eq!(result.page.images.len(), 20);
        assert!(matches!(result.error, Some(ProviderError::Api { status: 429, .. })));
        assert!(!result.page.has_more);
        assert_eq!(provider.starts(), vec![1, 11, 21]);
    }

    #[tokio::test]
    async fn test_error_on_first_page_yields_nothing() {
        let mut stub = StubProvider::new(1000, Some(500));
        stub.fail_at_start = Some(1);
        let paginator = Paginator::new(Arc::new(stub), Arc::new(CountingPacer::new()));

        let result = paginator
            .paginate(&term(), 0, limits(100), &SearchFilters::default())
            .await;

        assert!(result.page.images.is_empty());
        assert!(result.error.is_some());
    }

    #[test]
    fn test_has_more_requires_full_budget() {
        let image = |i: usize| ImageRecord {
            id: i.to_string(),
            image_url: String::new(),
            title: None,
            source: None,
            article_url: None,
            width: None,
            height: None,
            thumbnail_url: None,
            generated: None,
        };

        // Short of budget even though more pages exist
        let short = summarize((0..15).map(image).collect(), Some(500), 0, limits(20));
        assert!(!short.has_more);

        // Budget met but no pages beyond the current one
        let last = summarize((0..10).map(image).collect(), Some(10), 0, limits(10));
        assert_eq!(last.total_pages, 1);
        assert!(!last.has_more);
    }
}
