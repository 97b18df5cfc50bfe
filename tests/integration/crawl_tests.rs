//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock listing APIs and test
//! the full crawl cycle end-to-end, from seed to stored snapshots.

use listing_ripple::config::{parse_config, Config};
use listing_ripple::crawler::{crawl, TraversalStrategy};
use listing_ripple::processing::process;
use listing_ripple::state::NodeState;
use listing_ripple::storage::{FsSnapshotStore, SnapshotFilter, SnapshotStore};
use listing_ripple::{ListingId, Source};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(api_base_url: &str, kind: &str, raw_root: &str, extra: &str) -> Config {
    let content = format!(
        r#"
[crawler]
max-retries = 3
retry-base-delay-ms = 1
retry-max-delay-ms = 5
request-timeout-secs = 5
{extra}

[pacer]
min-delay-ms = 0
max-delay-ms = 0

[source]
kind = "{kind}"
api-base-url = "{api_base_url}"

[source.headers]
x-test-client = "ripple"

[output]
raw-root = "{raw_root}"
processed-root = "{raw_root}/../processed"
"#
    );
    parse_config(&content).unwrap()
}

fn olx_config(server: &MockServer, dir: &TempDir, extra: &str) -> Config {
    let raw_root = dir.path().join("raw");
    create_test_config(
        &format!("{}/api/v2/rec", server.uri()),
        "olx",
        &raw_root.display().to_string(),
        extra,
    )
}

fn ids(raw: &[&str]) -> Vec<ListingId> {
    raw.iter().map(|r| ListingId::new(r).unwrap()).collect()
}

fn ad(id: &str, category: &str) -> Value {
    json!({
        "list_id": id,
        "category": category,
        "subject": format!("Apartamento {}", id),
        "price": "R$ 1.500",
        "municipality": "Rio de Janeiro",
        "state_uf": "rj",
        "date_ts": 1_700_000_000_000_i64
    })
}

fn gallery(ads: Vec<Value>) -> Value {
    json!([{ "type": "SingleGallery", "title": "Anúncios relacionados", "content": ads }])
}

async fn mount_listing(server: &MockServer, id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/api/v2/rec"))
        .and(query_param("list_id", id))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn stored_ids(raw_root: &std::path::Path) -> Vec<String> {
    let store = FsSnapshotStore::new(raw_root);
    let mut ids: Vec<String> = store
        .list(&SnapshotFilter::all())
        .await
        .unwrap()
        .into_iter()
        .map(|location| location.listing_id.to_string())
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn test_crawl_follows_allowed_recommendations_only() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "A", gallery(vec![ad("B", "1020"), ad("C", "2020")])).await;
    mount_listing(&server, "B", gallery(vec![])).await;
    Mock::given(method("GET"))
        .and(query_param("list_id", "C"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gallery(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let config = olx_config(&server, &dir, "");
    let report = crawl(ids(&["A"]), &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.source, Source::Olx);
    assert_eq!(report.strategy, TraversalStrategy::BreadthFirst);
    assert_eq!(report.visited, 2);
    assert_eq!(report.stored, 2);
    assert_eq!(report.skipped_by_category, 1);
    assert_eq!(report.failed, 0);
    assert!(!report.cancelled);

    assert_eq!(stored_ids(&dir.path().join("raw")).await, vec!["A", "B"]);
}

#[tokio::test]
async fn test_snapshot_holds_the_verbatim_body() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let body = r#"[ {"type": "SingleGallery", "content": []} ]"#;

    Mock::given(method("GET"))
        .and(query_param("list_id", "A"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let config = olx_config(&server, &dir, "");
    crawl(ids(&["A"]), &config, CancellationToken::new())
        .await
        .unwrap();

    let store = FsSnapshotStore::new(dir.path().join("raw"));
    let locations = store.list(&SnapshotFilter::all()).await.unwrap();
    assert_eq!(locations.len(), 1);
    let envelope = store.get(&locations[0]).await.unwrap();
    assert_eq!(envelope.raw_body, body);
    assert_eq!(envelope.listing_id.as_str(), "A");
}

#[tokio::test]
async fn test_request_carries_configured_headers_and_query() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v2/rec"))
        .and(query_param("list_id", "A"))
        .and(query_param("region_id", "81"))
        .and(query_param("subcategory_id", "1020"))
        .and(header("x-test-client", "ripple"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gallery(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let config = olx_config(&server, &dir, "");
    let report = crawl(ids(&["A"]), &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.stored, 1);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(query_param("list_id", "A"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_listing(&server, "A", gallery(vec![])).await;

    let config = olx_config(&server, &dir, "");
    let report = crawl(ids(&["A"]), &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.retries, 2);
    assert_eq!(report.stored, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_retries_stop_at_the_limit() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(query_param("list_id", "A"))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let config = olx_config(&server, &dir, "");
    let report = crawl(ids(&["A"]), &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].state, NodeState::FailedRetryable);
    assert_eq!(report.failures[0].attempts, 4);
    assert!(stored_ids(&dir.path().join("raw")).await.is_empty());
}

#[tokio::test]
async fn test_not_found_is_terminal() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(query_param("list_id", "A"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, "B", gallery(vec![])).await;

    let config = olx_config(&server, &dir, "");
    let report = crawl(ids(&["A", "B"]), &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.visited, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.failures[0].state, NodeState::FailedTerminal);
    assert_eq!(report.failures[0].attempts, 1);
    assert_eq!(stored_ids(&dir.path().join("raw")).await, vec!["B"]);
}

#[tokio::test]
async fn test_max_visits_limits_the_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(
        &server,
        "A",
        gallery(vec![ad("B", "1020"), ad("C", "1010"), ad("D", "1020")]),
    )
    .await;
    mount_listing(&server, "B", gallery(vec![])).await;

    let config = olx_config(&server, &dir, "max-visits = 2");
    let report = crawl(ids(&["A"]), &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.visited, 2);
    assert_eq!(report.enqueued, 3);
    assert_eq!(report.remaining, 2);
}

#[tokio::test]
async fn test_configured_seeds_are_used_when_none_given() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "S1", gallery(vec![])).await;

    let mut config = olx_config(&server, &dir, "");
    config.source.seeds = vec!["S1".to_string()];
    let report = crawl(vec![], &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.stored, 1);
}

#[tokio::test]
async fn test_cancelled_session_fetches_nothing() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gallery(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let config = olx_config(&server, &dir, "");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = crawl(ids(&["A"]), &config, cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.visited, 0);
    assert_eq!(report.remaining, 1);
}

#[tokio::test]
async fn test_cancellation_interrupts_a_slow_fetch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(gallery(vec![]))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = olx_config(&server, &dir, "");
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let report = crawl(ids(&["A", "B"]), &config, cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.stored, 0);
    assert!(started.elapsed() < std::time::Duration::from_secs(3));
    assert!(stored_ids(&dir.path().join("raw")).await.is_empty());
}

#[tokio::test]
async fn test_zap_crawl_visits_seeds_only() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/v2/listings/Z1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "Z1",
            "title": "Casa com quintal",
            "price": "350000",
            "createdAt": "2024-01-15T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let raw_root = dir.path().join("raw");
    let config = create_test_config(
        &format!("{}/v2/listings", server.uri()),
        "zap",
        &raw_root.display().to_string(),
        "",
    );
    let report = crawl(ids(&["Z1"]), &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.source, Source::Zap);
    assert_eq!(report.visited, 1);
    assert_eq!(report.stored, 1);
    assert_eq!(report.enqueued, 0);

    let store = FsSnapshotStore::new(&raw_root);
    let zap = store.list(&SnapshotFilter::source(Source::Zap)).await.unwrap();
    assert_eq!(zap.len(), 1);
}

#[tokio::test]
async fn test_crawl_then_process() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_listing(&server, "A", gallery(vec![ad("B", "1020"), ad("C", "1010")])).await;
    mount_listing(&server, "B", gallery(vec![ad("C", "1010")])).await;
    mount_listing(&server, "C", gallery(vec![])).await;

    let mut config = olx_config(&server, &dir, "");
    config.output.processed_root = dir.path().join("processed").display().to_string();
    let report = crawl(ids(&["A"]), &config, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.stored, 3);

    let processed = process(&config).await.unwrap();

    assert_eq!(processed.files, 3);
    assert_eq!(processed.normalized, 3);
    assert_eq!(processed.unique, 2);
    assert_eq!(processed.duplicates, 1);
    assert!(processed.rejections.is_empty());
    assert!(dir.path().join("processed/olx/listings.csv").exists());
    assert!(dir.path().join("processed/olx/listings.parquet").exists());
}
