// tests/api_http.rs
//
// HTTP-level tests for the trigger surface without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use news_collector::api::{create_router, AppState};
use news_collector::ingest::types::{FeedEntry, FeedFetcher, MergeMode};
use news_collector::registry::{FeedDescriptor, FeedRegistry};
use news_collector::runner::Collector;
use news_collector::settings::{BackendSettings, Settings};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

#[derive(Default)]
struct FakeFetcher {
    entries: HashMap<String, Vec<FeedEntry>>,
}

#[async_trait::async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch_entries(&self, url: &str) -> anyhow::Result<Vec<FeedEntry>> {
        match self.entries.get(url) {
            Some(v) => Ok(v.clone()),
            None => anyhow::bail!("unreachable feed {url}"),
        }
    }
}

fn test_router(csv_path: &std::path::Path, fetcher: FakeFetcher) -> Router {
    let settings = Settings {
        backend: BackendSettings::Csv {
            path: csv_path.to_path_buf(),
        },
        merge_mode: MergeMode::FullResort,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    };
    let registry = FeedRegistry::new(
        vec![],
        vec![FeedDescriptor {
            site: "Example".into(),
            top_category: "IT".into(),
            feed_category: "IT".into(),
            url: "http://feed".into(),
        }],
    );
    let collector = Collector::from_settings(&settings, registry)
        .expect("csv collector needs no credentials")
        .with_fetcher(Arc::new(fetcher));
    create_router(AppState::new(collector))
}

async fn body_string(resp: axum::response::Response) -> String {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    String::from_utf8(bytes).expect("utf8")
}

#[tokio::test]
async fn get_renders_the_trigger_form() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir.path().join("t.csv"), FakeFetcher::default());

    let req = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .expect("build GET /");
    let resp = app.oneshot(req).await.expect("oneshot /");

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("<form method=\"post\">"));
    assert!(html.contains("Collect now"));
    assert!(!html.contains("Collection complete"), "GET runs nothing");
}

#[tokio::test]
async fn post_runs_the_collection_and_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("t.csv");

    let mut fetcher = FakeFetcher::default();
    fetcher.entries.insert(
        "http://feed".into(),
        vec![
            FeedEntry {
                title: Some("One".into()),
                summary: None,
                link: Some("https://example.com/1".into()),
                published: None,
            },
            FeedEntry {
                title: Some("Two".into()),
                summary: None,
                link: Some("https://example.com/2".into()),
                published: None,
            },
        ],
    );
    let app = test_router(&csv_path, fetcher);

    let req = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::empty())
        .expect("build POST /");
    let resp = app.oneshot(req).await.expect("oneshot POST /");

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Collection complete. Added 2 new articles."));
    assert!(html.contains("t.csv: added 2 new articles"));

    // The run really persisted: header row plus two data rows.
    let contents = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(contents.lines().count(), 3);
    assert!(contents.starts_with("datetime,site,category,title,summary,link"));
}

#[tokio::test]
async fn post_with_a_dead_feed_still_responds_with_a_summary() {
    // The only feed is unreachable; the page reports zero additions, not an
    // error page and never a stack trace.
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir.path().join("t.csv"), FakeFetcher::default());

    let req = Request::builder()
        .method("POST")
        .uri("/")
        .body(Body::empty())
        .expect("build POST /");
    let resp = app.oneshot(req).await.expect("oneshot POST /");

    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_string(resp).await;
    assert!(html.contains("Added 0 new articles"));
    assert!(html.contains("no new articles"));
}

#[tokio::test]
async fn health_returns_ok() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_router(&dir.path().join("t.csv"), FakeFetcher::default());

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = app.oneshot(req).await.expect("oneshot /health");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "ok");
}
