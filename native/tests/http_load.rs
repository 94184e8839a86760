//! Container loads against a real HTTP server and the filesystem.

use datasrc::{load, ContainerDescriptor, HeaderMode, LoadError, PayloadFormat, TabularOptions};
use datasrc_native::{directory_url, HttpFetcher};
use serde_json::json;
use url::Url;

fn descriptor(source: &str) -> ContainerDescriptor {
    ContainerDescriptor {
        source: source.to_string(),
        binding: "data".to_string(),
        format: None,
        tabular: TabularOptions::default(),
        original_markup: String::new(),
    }
}

#[tokio::test]
async fn test_csv_by_content_type_with_declared_charset() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/export")
        .with_status(200)
        .with_header("content-type", "text/csv; charset=iso-8859-1")
        .with_body(b"name;city\nZo\xe9;Li\xe8ge\n".as_slice())
        .create_async()
        .await;

    let mut container = descriptor("export");
    container.tabular = TabularOptions::default().with_delimiter(';');
    let base = Url::parse(&format!("{}/", server.url())).unwrap();

    let data = load(&HttpFetcher::new(), &container, Some(&base)).await.unwrap();
    assert_eq!(data, json!([{"name": "Zoé", "city": "Liège"}]));
}

#[tokio::test]
async fn test_json_and_transport_failure() {
    let mut server = mockito::Server::new_async().await;
    let _ok = server
        .mock("GET", "/items.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items": [1, 2]}"#)
        .create_async()
        .await;
    let _down = server
        .mock("GET", "/down.json")
        .with_status(502)
        .create_async()
        .await;

    let base = Url::parse(&format!("{}/", server.url())).unwrap();
    let fetcher = HttpFetcher::new();

    let data = load(&fetcher, &descriptor("items.json"), Some(&base)).await.unwrap();
    assert_eq!(data, json!({"items": [1, 2]}));

    let err = load(&fetcher, &descriptor("down.json"), Some(&base)).await.unwrap_err();
    assert_eq!(err, LoadError::Transport { status: 502 });
    assert_eq!(err.to_string(), "HTTP 502");
}

#[tokio::test]
async fn test_relative_file_with_override() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("table.txt"), "a\tb\n1\t2\n").unwrap();

    let mut container = descriptor("table.txt");
    container.format = Some(PayloadFormat::Tabular);
    container.tabular = TabularOptions::default()
        .with_delimiter('\t')
        .with_header(HeaderMode::Absent);
    let base = directory_url(dir.path()).unwrap();

    let data = load(&HttpFetcher::new(), &container, Some(&base)).await.unwrap();
    assert_eq!(data, json!([["a", "b"], ["1", "2"]]));
}
