// tests/csv_destination.rs
//
// CSV adapter behaviors on real temp files.

use news_collector::destination::csv_file::CsvTable;
use news_collector::destination::Destination;
use news_collector::ingest::types::canonical_header;

fn rows(r: &[[&str; 6]]) -> Vec<Vec<String>> {
    r.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

#[tokio::test]
async fn ensure_creates_an_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("news_log.csv");

    let table = CsvTable::ensure(&path).unwrap();
    assert!(path.exists());
    assert!(table.read_all_rows().await.unwrap().is_empty());

    // Idempotent: a second ensure leaves the file alone.
    CsvTable::ensure(&path).unwrap();
    assert!(table.read_all_rows().await.unwrap().is_empty());
}

#[tokio::test]
async fn ensure_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/logs/news.csv");
    CsvTable::ensure(&path).unwrap();
    assert!(path.exists());
}

#[tokio::test]
async fn append_preserves_existing_rows_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let table = CsvTable::ensure(&dir.path().join("t.csv")).unwrap();

    table.write_header(&canonical_header()).await.unwrap();
    table
        .append_rows(rows(&[[
            "2024-01-01 00:00:00",
            "S",
            "IT",
            "one",
            "",
            "https://example.com/1",
        ]]))
        .await
        .unwrap();
    table
        .append_rows(rows(&[[
            "2024-01-02 00:00:00",
            "S",
            "IT",
            "two",
            "",
            "https://example.com/2",
        ]]))
        .await
        .unwrap();

    let all = table.read_all_rows().await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0], canonical_header());
    assert_eq!(all[1][3], "one");
    assert_eq!(all[2][3], "two");
}

#[tokio::test]
async fn write_header_replaces_only_row_zero() {
    let dir = tempfile::tempdir().unwrap();
    let table = CsvTable::ensure(&dir.path().join("t.csv")).unwrap();

    let old_header: Vec<String> = vec!["when".into(), "who".into(), "what".into()];
    table.write_header(&old_header).await.unwrap();
    table
        .append_rows(vec![vec!["x".into(), "y".into(), "z".into()]])
        .await
        .unwrap();

    table.write_header(&canonical_header()).await.unwrap();

    let all = table.read_all_rows().await.unwrap();
    assert_eq!(all[0], canonical_header());
    assert_eq!(all[1], vec!["x", "y", "z"]);
}

#[tokio::test]
async fn overwrite_replaces_the_whole_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = CsvTable::ensure(&dir.path().join("t.csv")).unwrap();

    table.write_header(&canonical_header()).await.unwrap();
    table
        .append_rows(rows(&[[
            "2024-01-01 00:00:00",
            "S",
            "IT",
            "gone",
            "",
            "https://example.com/old",
        ]]))
        .await
        .unwrap();

    let mut replacement = vec![canonical_header()];
    replacement.extend(rows(&[[
        "2024-02-02 00:00:00",
        "S",
        "IT",
        "kept",
        "",
        "https://example.com/new",
    ]]));
    table.overwrite_rows(replacement.clone()).await.unwrap();

    assert_eq!(table.read_all_rows().await.unwrap(), replacement);
}

#[tokio::test]
async fn fields_with_commas_quotes_and_newlines_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let table = CsvTable::ensure(&dir.path().join("t.csv")).unwrap();

    table.write_header(&canonical_header()).await.unwrap();
    let tricky = vec![
        "2024-01-01 00:00:00".to_string(),
        "Site, with comma".to_string(),
        "IT".to_string(),
        "He said \"now\"".to_string(),
        "line one\nline two".to_string(),
        "https://example.com/q?a=1,2".to_string(),
    ];
    table.append_rows(vec![tricky.clone()]).await.unwrap();

    let all = table.read_all_rows().await.unwrap();
    assert_eq!(all[1], tricky);
}
