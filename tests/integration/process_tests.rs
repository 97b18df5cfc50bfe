//! Integration tests for the processing stage
//!
//! Snapshots are written straight into a temporary raw root, then
//! `process` turns them into dataset files under a processed root.

use chrono::{TimeZone, Utc};
use listing_ripple::config::{parse_config, Config};
use listing_ripple::output::COLUMNS;
use listing_ripple::processing::{process, RejectReason};
use listing_ripple::storage::{FsSnapshotStore, RawEnvelope, SnapshotStore};
use listing_ripple::{ConfigError, ListingId, RippleError, Source};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

fn create_test_config(dir: &TempDir, extra_output: &str) -> Config {
    let content = format!(
        r#"
[crawler]

[source]
kind = "olx"
api-base-url = "https://apigw.olx.com.br/api/v2/rec"

[output]
raw-root = "{raw}"
processed-root = "{processed}"
{extra_output}
"#,
        raw = dir.path().join("raw").display(),
        processed = dir.path().join("processed").display(),
    );
    parse_config(&content).unwrap()
}

async fn put(root: &Path, source: Source, id: &str, retrieved_ms: i64, body: impl Into<String>) {
    let store = FsSnapshotStore::new(root);
    let envelope = RawEnvelope::at(
        ListingId::new(id).unwrap(),
        source,
        Utc.timestamp_millis_opt(retrieved_ms).unwrap(),
        body.into(),
    );
    store.put(&envelope).await.unwrap();
}

fn ad(id: &str, price: &str, date_ts: i64) -> Value {
    json!({
        "list_id": id,
        "category": "1020",
        "subject": format!("Apartamento {}", id),
        "price": price,
        "neighbourhood": "Copacabana",
        "municipality": "Rio de Janeiro",
        "state_uf": "rj",
        "ad_url": format!("https://rj.olx.com.br/{}", id),
        "date_ts": date_ts
    })
}

fn gallery(ads: Vec<Value>) -> String {
    json!([{ "type": "SingleGallery", "title": "Anúncios relacionados", "content": ads }]).to_string()
}

fn read_json_output(dir: &TempDir) -> Vec<Value> {
    let text = std::fs::read_to_string(dir.path().join("processed/olx/listings.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn test_process_writes_every_configured_format() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    put(&raw, Source::Olx, "1", 1_000, gallery(vec![ad("10", "R$ 1.500", 100)])).await;

    let config = create_test_config(&dir, r#"formats = ["csv", "parquet", "json"]"#);
    let report = process(&config).await.unwrap();

    assert_eq!(report.files, 1);
    assert_eq!(report.unique, 1);
    assert_eq!(report.outputs.len(), 3);
    for name in ["listings.csv", "listings.parquet", "listings.json", "summary.md"] {
        assert!(dir.path().join("processed/olx").join(name).exists(), "{} missing", name);
    }

    let csv = std::fs::read_to_string(dir.path().join("processed/olx/listings.csv")).unwrap();
    let header = csv.lines().next().unwrap();
    assert_eq!(header, COLUMNS.join(","));

    let rows = read_json_output(&dir);
    assert_eq!(rows[0]["listing_id"], "10");
    assert_eq!(rows[0]["price"], 1500.0);
    assert_eq!(rows[0]["state"], "RJ");
    assert_eq!(rows[0]["city"], "Rio de Janeiro");
}

#[tokio::test]
async fn test_newest_record_wins_deduplication() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    put(&raw, Source::Olx, "1", 1_000, gallery(vec![ad("10", "R$ 1.000", 100), ad("11", "900", 100)])).await;
    put(&raw, Source::Olx, "2", 2_000, gallery(vec![ad("10", "R$ 1.200", 200)])).await;

    let config = create_test_config(&dir, r#"formats = ["json"]"#);
    let report = process(&config).await.unwrap();

    assert_eq!(report.normalized, 3);
    assert_eq!(report.unique, 2);
    assert_eq!(report.duplicates, 1);

    let rows = read_json_output(&dir);
    let ids: Vec<&str> = rows.iter().map(|r| r["listing_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["10", "11"]);
    assert_eq!(rows[0]["price"], 1200.0);
}

#[tokio::test]
async fn test_later_snapshot_breaks_ties() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    put(&raw, Source::Olx, "1", 1_000, gallery(vec![ad("10", "100", 500)])).await;
    put(&raw, Source::Olx, "2", 3_000, gallery(vec![ad("10", "300", 500)])).await;

    let config = create_test_config(&dir, r#"formats = ["json"]"#);
    process(&config).await.unwrap();

    let rows = read_json_output(&dir);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["price"], 300.0);
}

#[tokio::test]
async fn test_malformed_snapshot_is_isolated() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    put(&raw, Source::Olx, "1", 1_000, "<html>blocked</html>").await;
    put(&raw, Source::Olx, "2", 2_000, gallery(vec![ad("20", "R$ 2.000", 100)])).await;

    let config = create_test_config(&dir, r#"formats = ["json"]"#);
    let report = process(&config).await.unwrap();

    assert_eq!(report.files, 2);
    assert_eq!(report.unique, 1);
    assert_eq!(report.rejected(), 1);
    assert!(matches!(
        report.rejections[0].reason,
        RejectReason::MalformedBody(Source::Olx, _)
    ));
    assert!(report.rejections[0].snapshot.contains("olx_1_"));
}

#[tokio::test]
async fn test_bad_records_do_not_spoil_the_batch() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    let mut undated = ad("31", "100", 0);
    undated.as_object_mut().unwrap().remove("date_ts");
    let mut anonymous = ad("32", "100", 100);
    anonymous.as_object_mut().unwrap().remove("list_id");
    let mut furniture = ad("33", "100", 100);
    furniture["category"] = json!("2020");

    put(
        &raw,
        Source::Olx,
        "1",
        1_000,
        gallery(vec![ad("30", "100", 100), undated, anonymous, furniture]),
    )
    .await;

    let config = create_test_config(&dir, r#"formats = ["json"]"#);
    let report = process(&config).await.unwrap();

    assert_eq!(report.unique, 1);
    assert_eq!(report.filtered, 1);
    assert_eq!(report.rejected(), 2);
    let reasons: Vec<&RejectReason> = report.rejections.iter().map(|r| &r.reason).collect();
    assert!(reasons.contains(&&RejectReason::MissingTimestamp));
    assert!(reasons.contains(&&RejectReason::MissingListingId));
}

#[tokio::test]
async fn test_sources_are_processed_separately() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    put(&raw, Source::Olx, "1", 1_000, gallery(vec![ad("100", "R$ 1.500", 100)])).await;
    put(
        &raw,
        Source::Zap,
        "100",
        2_000,
        json!({
            "id": "100",
            "title": "Casa com quintal",
            "price": "350000",
            "address": { "neighborhood": "Centro", "city": "Niterói", "state": "rj" },
            "createdAt": "2024-01-15T10:00:00Z"
        })
        .to_string(),
    )
    .await;

    let mut config = create_test_config(&dir, r#"formats = ["json"]"#);
    let olx = process(&config).await.unwrap();

    assert_eq!(olx.source, Some(Source::Olx));
    assert_eq!(olx.files, 1);
    assert_eq!(olx.unique, 1);
    assert_eq!(olx.duplicates, 0);
    let rows = read_json_output(&dir);
    assert_eq!(rows[0]["listing_id"], "100");
    assert_eq!(rows[0]["title"], "Apartamento 100");

    config.source.kind = Source::Zap;
    let zap = process(&config).await.unwrap();

    assert_eq!(zap.files, 1);
    assert_eq!(zap.unique, 1);
    let text = std::fs::read_to_string(dir.path().join("processed/zap/listings.json")).unwrap();
    let rows: Vec<Value> = serde_json::from_str(&text).unwrap();
    assert_eq!(rows[0]["listing_id"], "100");
    assert_eq!(rows[0]["city"], "Niterói");
    assert_eq!(rows[0]["state"], "RJ");
    assert_eq!(rows[0]["listed_at"], "2024-01-15T10:00:00Z");

    // The first run's dataset is untouched by the second
    assert_eq!(read_json_output(&dir)[0]["title"], "Apartamento 100");
}

#[tokio::test]
async fn test_foreign_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    put(&raw, Source::Olx, "1", 1_000, gallery(vec![ad("50", "100", 100)])).await;
    std::fs::write(raw.join("olx").join("notes.txt"), "scratch").unwrap();

    let config = create_test_config(&dir, r#"formats = ["json"]"#);
    let report = process(&config).await.unwrap();

    assert_eq!(report.files, 1);
    assert_eq!(report.unique, 1);
}

#[tokio::test]
async fn test_empty_raw_root_produces_empty_dataset() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("raw")).unwrap();

    let config = create_test_config(&dir, r#"formats = ["csv"]"#);
    let report = process(&config).await.unwrap();

    assert_eq!(report.files, 0);
    assert_eq!(report.unique, 0);
    let csv = std::fs::read_to_string(dir.path().join("processed/olx/listings.csv")).unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[tokio::test]
async fn test_missing_raw_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&dir, "");

    let result = process(&config).await;

    assert!(matches!(
        result,
        Err(RippleError::Config(ConfigError::UnreadableRawRoot { .. }))
    ));
    assert!(!dir.path().join("processed").exists());
}
