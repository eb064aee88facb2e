//! End-to-end session tests: search, load more and archive against mocked
//! search and image hosts.

use std::io::{Cursor, Read};

use case_aggregator::{Config, SearchRequest, SearchSession, SessionError, ValidationError};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, output: &TempDir) -> Config {
    let mut config = Config::default();
    config.custom_search.api_key = "test-key".to_string();
    config.custom_search.search_engine_id = "test-cx".to_string();
    config.custom_search.endpoint = format!("{}/customsearch/v1", server.uri());
    config.search.page_delay_ms = 0;
    config.archive.fetch_delay_ms = 0;
    config.archive.output_dir = output.path().to_path_buf();
    config
}

/// A search page with `count` items numbered from `from`
fn page(server: &MockServer, from: usize, count: usize, total: &str) -> Value {
    let items: Vec<Value> = (from..from + count)
        .map(|i| {
            json!({
                "link": format!("{}/img/{}", server.uri(), i),
                "title": format!("Capone {}", i),
                "displayLink": "archive.example",
                "image": { "thumbnailLink": format!("{}/thumb/{}", server.uri(), i) }
            })
        })
        .collect();
    json!({ "searchInformation": { "totalResults": total }, "items": items })
}

async fn mount_page(server: &MockServer, term: &str, start: usize, body: Value) {
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("q", term))
        .and(query_param("start", start.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn request(terms: &str, max_results: usize) -> SearchRequest {
    SearchRequest {
        search_terms: terms.to_string(),
        max_results: Some(max_results),
        language: None,
    }
}

#[tokio::test]
async fn test_search_then_load_more_accumulates() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    for start in [1, 11, 21, 31] {
        mount_page(&server, "Al Capone", start, page(&server, start, 10, "1230")).await;
    }
    mount_page(
        &server,
        "XYZ_NoSuchTerm123",
        1,
        json!({ "searchInformation": { "totalResults": "0" } }),
    )
    .await;

    let session = SearchSession::from_config(&config(&server, &output)).unwrap();

    let report = session
        .search(request("Al Capone\n\nXYZ_NoSuchTerm123\n", 20))
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    let capone = &report.results[0];
    assert_eq!(capone.term.as_str(), "Al Capone");
    assert_eq!(capone.images.len(), 20);
    assert_eq!(capone.total_results, Some(1230));
    assert!(capone.has_more);
    assert_eq!(report.failed_terms.len(), 1);
    assert_eq!(report.failed_terms[0].term.as_str(), "XYZ_NoSuchTerm123");
    assert_eq!(
        report.message.as_deref(),
        Some("Could not retrieve results for: XYZ_NoSuchTerm123.")
    );
    assert_eq!(session.offsets().await.get("Al Capone"), 20);

    let report = session.load_more("Al Capone").await.unwrap();

    let capone = &report.results[0];
    assert_eq!(capone.images.len(), 40);
    assert_eq!(capone.images[20].id, "Al-Capone-21");
    assert_eq!(capone.current_page, 3);
    assert!(report.failed_terms.is_empty());
    assert!(report.message.is_none());
    assert_eq!(session.offsets().await.get("Al Capone"), 40);
}

#[tokio::test]
async fn test_archive_writes_partial_bundle() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_page(&server, "Al Capone", 1, page(&server, 1, 3, "3")).await;
    mount_page(&server, "Al Capone", 11, json!({})).await;

    Mock::given(method("GET"))
        .and(path("/img/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"png-bytes".to_vec(), "image/png"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thumb/2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"thumb-bytes".to_vec(), "image/jpeg"),
        )
        .mount(&server)
        .await;
    // /img/2, /img/3 and /thumb/3 are unmatched and answer 404

    let session = SearchSession::from_config(&config(&server, &output)).unwrap();
    let report = session.search(request("Al Capone", 20)).await.unwrap();
    assert_eq!(report.results[0].images.len(), 3);
    assert!(!report.results[0].has_more);

    let summary = session.archive("Al Capone").await.unwrap();

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.file_name, "Al_Capone_images_2of3.zip");
    assert_eq!(summary.path, output.path().join("Al_Capone_images_2of3.zip"));

    let bytes = std::fs::read(&summary.path).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<String> = archive.file_names().map(|n| n.to_string()).collect();
    names.sort();
    assert_eq!(names, vec!["1_Capone_1.png", "2_Capone_2.jpg"]);

    let mut contents = String::new();
    archive
        .by_name("2_Capone_2.jpg")
        .unwrap()
        .read_to_string(&mut contents)
        .unwrap();
    assert_eq!(contents, "thumb-bytes");
}

#[tokio::test]
async fn test_archive_with_no_downloads_fails() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_page(&server, "Ted Bundy", 1, page(&server, 1, 2, "2")).await;

    let session = SearchSession::from_config(&config(&server, &output)).unwrap();
    session.search(request("Ted Bundy", 10)).await.unwrap();

    let err = session.archive("Ted Bundy").await.unwrap_err();

    assert!(matches!(
        err,
        SessionError::ArchiveFailed { attempted: 2, .. }
    ));
    assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_validation_happens_before_any_request() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let session = SearchSession::from_config(&config(&server, &output)).unwrap();
    let err = session.search(request("  \n \n", 10)).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Validation(ValidationError::NoSearchTerms)
    ));

    let mut missing = config(&server, &output);
    missing.custom_search.search_engine_id = String::new();
    let session = SearchSession::from_config(&missing).unwrap();
    let err = session.search(request("Al Capone", 10)).await.unwrap_err();
    assert_eq!(err.to_string(), "Please provide a Custom Search Engine ID.");
}

#[tokio::test]
async fn test_session_errors_for_out_of_order_calls() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();
    let session = SearchSession::from_config(&config(&server, &output)).unwrap();

    assert!(matches!(
        session.load_more("Al Capone").await,
        Err(SessionError::NoPreviousSearch)
    ));
    assert!(matches!(
        session.archive("Al Capone").await,
        Err(SessionError::UnknownTerm(_))
    ));
}

#[tokio::test]
async fn test_reset_forgets_results_and_offsets() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_page(&server, "Al Capone", 1, page(&server, 1, 5, "5")).await;

    let session = SearchSession::from_config(&config(&server, &output)).unwrap();
    session.search(request("Al Capone", 10)).await.unwrap();
    assert_eq!(session.results().await.len(), 1);

    session.reset().await;

    assert!(session.results().await.is_empty());
    assert!(session.offsets().await.is_empty());
    assert!(matches!(
        session.load_more("Al Capone").await,
        Err(SessionError::NoPreviousSearch)
    ));
}

#[tokio::test]
async fn test_truncated_term_is_reported_with_its_partial_results() {
    let server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    mount_page(&server, "Al Capone", 1, page(&server, 1, 10, "1230")).await;
    Mock::given(method("GET"))
        .and(path("/customsearch/v1"))
        .and(query_param("start", "11"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let session = SearchSession::from_config(&config(&server, &output)).unwrap();
    let report = session.search(request("Al Capone", 20)).await.unwrap();

    assert_eq!(report.results[0].images.len(), 10);
    assert!(report.failed_terms.is_empty());
    assert_eq!(report.truncated_terms.len(), 1);
    assert_eq!(report.truncated_terms[0].term.as_str(), "Al Capone");
    assert_eq!(
        report.truncated_terms[0].error.as_deref(),
        Some("provider returned 429: Too Many Requests")
    );
    assert_eq!(
        report.message.as_deref(),
        Some("Results for Al Capone were cut short (provider returned 429: Too Many Requests).")
    );
    assert_eq!(session.offsets().await.get("Al Capone"), 10);
}
