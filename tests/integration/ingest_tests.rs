//! Integration tests for the ingest pipeline
//!
//! These tests use wiremock to stand in for the job site and run the
//! full discover / collect / reconcile / fetch / checkpoint cycle against
//! both store backends.

use dice_harvest::config::UserAgentConfig;
use dice_harvest::crawler::{build_http_client, DetailFetcher, HttpDetailFetcher, HttpPageLoader};
use dice_harvest::ingest::{IngestOrchestrator, IngestSettings};
use dice_harvest::storage::{Field, JsonFileStore, SqliteStore, Store};
use dice_harvest::{FetchError, HarvestError, IngestPhase, SearchQuery, WorkplaceType};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn settings(base_url: &str) -> IngestSettings {
    IngestSettings {
        base_url: base_url.to_string(),
        page_delay: Duration::from_millis(1),
        item_delay: Duration::from_millis(1),
        page_timeout: Duration::from_secs(5),
        checkpoint_interval: 2,
        max_flush_failures: 3,
        final_flush_attempts: 2,
    }
}

fn orchestrator<S: Store>(
    base_url: &str,
    store: S,
) -> IngestOrchestrator<HttpPageLoader, HttpDetailFetcher, S> {
    let client = build_http_client(&user_agent(), Duration::from_secs(5))
        .expect("Failed to build client");
    IngestOrchestrator::new(
        HttpPageLoader::new(client.clone()),
        HttpDetailFetcher::new(client, base_url),
        store,
        settings(base_url),
    )
}

fn results_page(total_pages: Option<u32>, ids: &[&str]) -> String {
    let indicator = total_pages
        .map(|n| format!(r#"<section aria-label="Page 1 of {}"><span>1</span></section>"#, n))
        .unwrap_or_default();
    let cards: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<div class="card"><a data-testid="job-search-job-detail-link" href="/job-detail/{}?searchlink=search">Job {}</a></div>"#,
                id, id
            )
        })
        .collect();
    format!("<html><body>{}{}</body></html>", indicator, cards)
}

fn detail_page(title: &str) -> String {
    format!(
        r#"<html><head><meta property="og:publish_date" content="2025-09-01T00:00:00Z"></head>
        <body>
            <h1 data-cy="jobTitle">{}</h1>
            <a data-cy="companyNameLink">Acme</a>
            <li data-cy="location">Remote</li>
            <div data-cy="locationDetails"><span>Remote</span><span>Contract</span></div>
            <div data-cy="skillsList"><span>Rust</span><span>SQL</span></div>
            <span data-cy="postedDate">Posted 2 days ago | Updated 1 day ago</span>
            <div id="jobDescription">Write software.</div>
        </body></html>"#,
        title
    )
}

/// Mounts two result pages: {A, B} and {B, C}
async fn mount_listing(server: &MockServer, page_two_status: u16) {
    // More specific mock first; the page-1 mock would also match page 2
    let page_two = if page_two_status == 200 {
        ResponseTemplate::new(200).set_body_string(results_page(None, &["B", "C"]))
    } else {
        ResponseTemplate::new(page_two_status)
    };
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("page", "2"))
        .respond_with(page_two)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("q", "engineer"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(Some(2), &["A", "B"])))
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str, status: u16, expected_calls: u64) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_string(detail_page(&format!("Engineer {}", id)))
    } else {
        ResponseTemplate::new(status)
    };
    Mock::given(method("GET"))
        .and(path(format!("/job-detail/{}", id)))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_ingest_sqlite() {
    let server = MockServer::start().await;
    let base_url = format!("{}/jobs", server.uri());
    mount_listing(&server, 200).await;
    for id in ["A", "B", "C"] {
        // Each posting is fetched once across both runs
        mount_detail(&server, id, 200, 1).await;
    }

    let dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteStore::new(&dir.path().join("jobs.db")).expect("Failed to open DB");
    let mut orchestrator = orchestrator(&base_url, store);

    let first_query = SearchQuery::new("engineer", None, None).unwrap();
    let first = orchestrator.run(&first_query).await.expect("First run failed");

    assert_eq!(first.total_pages, 2);
    assert!(!first.pages_degraded);
    assert_eq!(first.links_collected, 3);
    assert_eq!(first.new_records, 3);
    assert_eq!(first.checkpoints, vec![2, 3]);
    assert_eq!(first.phase(), IngestPhase::Done);

    let second_query = SearchQuery::new("engineer", None, Some(WorkplaceType::Remote)).unwrap();
    let second = orchestrator.run(&second_query).await.expect("Second run failed");
    assert_eq!(second.to_fetch, 0);
    assert_eq!(second.known, 3);
    assert_eq!(second.tagged_records, 3);

    let store = orchestrator.into_store();
    assert_eq!(store.count().unwrap(), 3);

    let a = format!("{}/job-detail/A", server.uri());
    let record = store.get(&a).unwrap().expect("A should be stored");
    assert_eq!(record.title, Field::Value("Engineer A".to_string()));
    assert_eq!(record.company.as_str(), "Acme");
    assert_eq!(record.skills, vec!["Rust", "SQL"]);
    assert_eq!(record.updated_date.as_str(), "1 day ago");
    assert_eq!(record.salary, Field::NotAvailable);
    assert_eq!(
        record.searches,
        vec![
            "q=engineer".to_string(),
            "filters.workplaceTypes=Remote&q=engineer".to_string()
        ]
    );
}

#[tokio::test]
async fn test_repeat_run_adds_nothing() {
    let server = MockServer::start().await;
    let base_url = format!("{}/jobs", server.uri());
    mount_listing(&server, 200).await;
    for id in ["A", "B", "C"] {
        mount_detail(&server, id, 200, 1).await;
    }

    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(&dir.path().join("jobs.db")).unwrap();
    let mut orchestrator = orchestrator(&base_url, store);
    let query = SearchQuery::new("engineer", None, None).unwrap();

    orchestrator.run(&query).await.unwrap();
    let again = orchestrator.run(&query).await.unwrap();

    assert_eq!(again.to_fetch, 0);
    assert_eq!(again.tagged_records, 0);
    let b = format!("{}/job-detail/B", server.uri());
    assert_eq!(
        orchestrator.store().get(&b).unwrap().unwrap().searches,
        vec!["q=engineer"]
    );
}

#[tokio::test]
async fn test_failed_page_and_item_are_skipped_json() {
    let server = MockServer::start().await;
    let base_url = format!("{}/jobs", server.uri());
    mount_listing(&server, 503).await;
    mount_detail(&server, "A", 200, 1).await;
    mount_detail(&server, "B", 500, 1).await;

    let dir = TempDir::new().unwrap();
    let corpus = dir.path().join("dice_job_data.json");
    let store = JsonFileStore::new(&corpus).unwrap();
    let mut orchestrator = orchestrator(&base_url, store);

    let query = SearchQuery::new("engineer", None, None).unwrap();
    let report = orchestrator.run(&query).await.expect("Run failed");

    assert_eq!(report.failed_pages, vec![2]);
    assert_eq!(report.links_collected, 2);
    assert_eq!(
        report.skipped,
        vec![format!("{}/job-detail/B", server.uri())]
    );
    assert_eq!(report.new_records, 1);

    // The checkpoint reached disk
    let reopened = JsonFileStore::new(&corpus).unwrap();
    assert_eq!(reopened.count().unwrap(), 1);
    let contents = std::fs::read_to_string(&corpus).unwrap();
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(value[0]["title"], "Engineer A");
    assert_eq!(value[0]["salary"], "N/A");
    assert_eq!(value[0]["searches"][0], "q=engineer");
}

#[tokio::test]
async fn test_missing_pagination_falls_back_to_one_page() {
    let server = MockServer::start().await;
    let base_url = format!("{}/jobs", server.uri());
    Mock::given(method("GET"))
        .and(path("/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(None, &["A"])))
        // Reachability probe, page count, link collection
        .expect(3)
        .mount(&server)
        .await;
    mount_detail(&server, "A", 200, 1).await;

    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(&dir.path().join("jobs.db")).unwrap();
    let mut orchestrator = orchestrator(&base_url, store);

    let query = SearchQuery::new("engineer", None, None).unwrap();
    let report = orchestrator.run(&query).await.unwrap();
    assert_eq!(report.total_pages, 1);
    assert!(report.pages_degraded);
    assert_eq!(report.new_records, 1);
}

#[tokio::test]
async fn test_unreachable_site_aborts_run() {
    // Nothing listens on the discard port
    let base_url = "http://127.0.0.1:9/jobs";
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::new(&dir.path().join("jobs.db")).unwrap();
    let mut orchestrator = orchestrator(base_url, store);

    let query = SearchQuery::new("engineer", None, None).unwrap();
    let err = orchestrator.run(&query).await.unwrap_err();
    assert!(matches!(err, HarvestError::FetcherUnavailable(_)));
    assert_eq!(orchestrator.store().count().unwrap(), 0);
}

#[tokio::test]
async fn test_detail_fetcher_scrapes_single_page() {
    let server = MockServer::start().await;
    mount_detail(&server, "xyz", 200, 1).await;
    mount_detail(&server, "gone", 404, 1).await;

    let client = build_http_client(&user_agent(), Duration::from_secs(5)).unwrap();
    let fetcher = HttpDetailFetcher::new(client, server.uri());

    let url = format!("{}/job-detail/xyz", server.uri());
    let record = fetcher.fetch(&url).await.expect("Scrape failed");
    assert_eq!(record.url, url);
    assert_eq!(record.title.as_str(), "Engineer xyz");
    assert_eq!(record.job_types, vec!["Remote", "Contract"]);
    assert_eq!(record.posted_date.as_str(), "2025-09-01T00:00:00Z");
    assert!(record.searches.is_empty());

    let missing = fetcher
        .fetch(&format!("{}/job-detail/gone", server.uri()))
        .await;
    assert!(matches!(
        missing,
        Err(FetchError::Status { status: 404, .. })
    ));
}
