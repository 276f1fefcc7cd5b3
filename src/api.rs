// src/api.rs
use std::sync::Arc;

use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::runner::Collector;

#[derive(Clone)]
pub struct AppState {
    collector: Arc<Collector>,
}

impl AppState {
    pub fn new(collector: Collector) -> Self {
        Self {
            collector: Arc::new(collector),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(collect))
        .route("/health", get(|| async { "ok" }))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn index() -> Html<String> {
    page(&[])
}

/// Run the full collection synchronously and render the outcome. The page
/// only ever shows a summary or an error message, never internals.
async fn collect(State(state): State<AppState>) -> Html<String> {
    let report = state.collector.run_once().await;

    let mut lines = Vec::new();
    if report.destinations.is_empty() {
        lines.push("Nothing to collect: no destinations are configured.".to_string());
    } else if report.failed_destinations() > 0 {
        lines.push(format!(
            "Collection finished with errors. Added {} new articles.",
            report.total_added()
        ));
    } else {
        lines.push(format!(
            "Collection complete. Added {} new articles.",
            report.total_added()
        ));
    }
    lines.extend(report.summary().lines().map(str::to_string));

    page(&lines)
}

/// The whole UI is this one form page.
fn page(message_lines: &[String]) -> Html<String> {
    let message = message_lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| format!("    <p>{}</p>\n", html_escape::encode_text(l)))
        .collect::<String>();

    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>News Collector</title>
</head>
<body>
  <h1>News Collector</h1>
  <p>Append the latest articles to the configured destination.</p>

  <form method="post">
    <button type="submit">Collect now</button>
  </form>

  <div style="margin-top:20px;">
{message}  </div>
</body>
</html>
"#
    ))
}
