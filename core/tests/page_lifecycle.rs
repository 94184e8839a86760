//! End-to-end container lifecycle on an in-memory page.

use datasrc::memory::{MemoryDocument, MemoryFetcher, MountHandle, RecordingRuntime};
use datasrc::{Document, EventLevel, Orchestrator, OrchestratorError, Phase, RuntimeError};
use serde_json::json;
use url::Url;

fn page() -> MemoryDocument {
    MemoryDocument::new().with_location(Url::parse("https://site.test/pages/").unwrap())
}

#[tokio::test]
async fn test_csv_container_reaches_ready() {
    let doc = page();
    let node = doc.create_element(
        "div",
        &[("data_src", "people.csv"), ("closure_arg", "people")],
        "<ul>{#each people as p, i}<li>{i}: {p.name}</li>{/each}</ul>",
    );
    let fetcher = MemoryFetcher::new().with_text(
        "https://site.test/pages/people.csv",
        Some("text/plain"),
        "name,age\r\nAda,30\r\nAlan,28\r\n",
    );

    let orchestrator = Orchestrator::new(doc, fetcher, RecordingRuntime::new());
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.ready_count(), 1);
    let runtime = orchestrator.runtime();
    assert_eq!(runtime.apps(), vec![json!({})]);
    assert_eq!(runtime.mounts(), vec![(0, node)]);
    assert_eq!(
        runtime.latest(MountHandle(0)).unwrap(),
        json!({
            "people": [{"name": "Ada", "age": "30"}, {"name": "Alan", "age": "28"}],
            "__err": null,
            "__loading": false
        })
    );

    let html = orchestrator.document().inner_html(&node);
    assert!(html.contains(r#"<template v-for="(p,i) in people"><li>{{ i }}: {{ p.name }}</li></template>"#));
    assert_eq!(orchestrator.document().render_passes(), 1);
}

#[tokio::test]
async fn test_rejected_retrieval_leaves_data_empty() {
    let doc = page();
    doc.create_element("div", &[("data_src", "/api/items")], "{data.total}");
    let fetcher = MemoryFetcher::new().with_failure("https://site.test/api/items", "connection refused");

    let orchestrator = Orchestrator::new(doc, fetcher, RecordingRuntime::new());
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.containers[0].error.as_deref(), Some("connection refused"));

    let containers = orchestrator.containers();
    let state = containers.iter().next().unwrap();
    assert_eq!(state.phase, Phase::Failed);
    assert!(!state.scope.loading);
    assert_eq!(state.scope.data, json!({}));

    assert_eq!(
        orchestrator.runtime().commits(),
        vec![(
            MountHandle(0),
            json!({"data": {}, "__err": "connection refused", "__loading": false})
        )]
    );
}

#[tokio::test]
async fn test_siblings_settle_independently() {
    let doc = page();
    doc.create_element("div", &[("data_src", "bad.json")], "{data}");
    doc.create_element("div", &[("data_src", "good.json"), ("closure_arg", "items")], "{items.length}");
    doc.create_element("div", &[("data_src", "down.json")], "{data}");
    let fetcher = MemoryFetcher::new()
        .with_text("https://site.test/pages/bad.json", None, "{oops")
        .with_text("https://site.test/pages/good.json", Some("application/json"), "[1, 2, 3]")
        .with_status("https://site.test/pages/down.json", 503);

    let orchestrator = Orchestrator::new(doc, fetcher, RecordingRuntime::new());
    let report = orchestrator.run().await.unwrap();

    let phases: Vec<Phase> = report.containers.iter().map(|c| c.phase).collect();
    assert_eq!(phases, vec![Phase::Failed, Phase::Ready, Phase::Failed]);
    assert_eq!(report.containers[0].error.as_deref(), Some("Invalid JSON"));
    assert_eq!(report.containers[2].error.as_deref(), Some("HTTP 503"));

    let runtime = orchestrator.runtime();
    assert_eq!(
        runtime.latest(MountHandle(1)).unwrap(),
        json!({"items": [1, 2, 3], "__err": null, "__loading": false})
    );
    // One commit per container
    assert_eq!(runtime.commits().len(), 3);
}

#[tokio::test]
async fn test_container_without_source_is_untouched() {
    let doc = page();
    let inert = doc.create_element("div", &[("data_src", "")], "<p>{x}</p>");
    let active = doc.create_element("div", &[("data_src", "a.json")], "<p>{data.x}</p>");
    let fetcher = MemoryFetcher::new().with_text("https://site.test/pages/a.json", None, r#"{"x": 1}"#);

    let orchestrator = Orchestrator::new(doc, fetcher, RecordingRuntime::new());
    let report = orchestrator.run().await.unwrap();

    assert_eq!(report.containers.len(), 1);
    let doc = orchestrator.document();
    assert_eq!(doc.inner_html(&inert), "<p>{x}</p>");
    assert_eq!(doc.attribute(&inert, "v-scope"), None);
    assert!(doc.attribute(&active, "v-scope").is_some());
    assert_eq!(orchestrator.runtime().mounts(), vec![(0, active)]);
}

#[tokio::test]
async fn test_no_containers_never_touches_runtime() {
    let doc = page();
    doc.create_element("div", &[("class", "plain")], "{x}");

    let orchestrator = Orchestrator::new(doc, MemoryFetcher::new(), RecordingRuntime::new());
    let report = orchestrator.run().await.unwrap();

    assert!(report.containers.is_empty());
    assert_eq!(orchestrator.runtime().availability_checks(), 0);
    assert!(orchestrator.runtime().apps().is_empty());
    assert!(orchestrator.fetcher().requests().is_empty());
}

#[tokio::test]
async fn test_runtime_unavailable_replaces_every_container() {
    let doc = page();
    let a = doc.create_element("div", &[("data_src", "a.json")], "{data}");
    let b = doc.create_element("div", &[("data_src", "")], "{data}");

    let orchestrator = Orchestrator::new(
        doc,
        MemoryFetcher::new(),
        RecordingRuntime::unavailable("PetiteVue network error"),
    );
    let mut rx = orchestrator.events().subscribe();
    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(
        err,
        OrchestratorError::RuntimeUnavailable(RuntimeError::Unavailable("PetiteVue network error".into()))
    );
    let notice = r#"<pre style="color:#c00;">Adapter failed: PetiteVue network error</pre>"#;
    assert_eq!(orchestrator.document().inner_html(&a), notice);
    assert_eq!(orchestrator.document().inner_html(&b), notice);
    assert!(orchestrator.runtime().mounts().is_empty());
    assert!(orchestrator.fetcher().requests().is_empty());

    let mut saw_error = false;
    while let Ok(event) = rx.try_recv() {
        saw_error |= event.level == EventLevel::Error;
    }
    assert!(saw_error);
}

#[tokio::test]
async fn test_loads_start_after_all_mounts() {
    let doc = page();
    doc.create_element("div", &[("data_src", "a.json")], "");
    doc.create_element("div", &[("data_src", "b.json")], "");
    let fetcher = MemoryFetcher::new()
        .with_text("https://site.test/pages/a.json", None, "1")
        .with_text("https://site.test/pages/b.json", None, "2");

    let orchestrator = Orchestrator::new(doc, fetcher, RecordingRuntime::new());
    let mut rx = orchestrator.events().subscribe();
    orchestrator.run().await.unwrap();

    // Both prepared before either settles
    let mut phases = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let Some(phase) = event.phase {
            phases.push(phase);
        }
    }
    assert_eq!(phases.len(), 6);
    assert_eq!(
        &phases[..4],
        &[Phase::Initializing, Phase::Loading, Phase::Initializing, Phase::Loading]
    );
    assert!(phases[4..].iter().all(|p| *p == Phase::Ready));
    assert_eq!(orchestrator.runtime().mounts().len(), 2);
    assert_eq!(
        orchestrator.fetcher().requests(),
        vec!["https://site.test/pages/a.json", "https://site.test/pages/b.json"]
    );
}

#[tokio::test]
async fn test_format_override_beats_suffix() {
    let doc = page();
    doc.create_element(
        "div",
        &[("data_src", "table.csv"), ("data_src_type", "json")],
        "",
    );
    doc.create_element(
        "div",
        &[("data_src", "rows"), ("data_src_type", "csv"), ("data_csv_delim", ";"), ("data_csv_header", "false")],
        "",
    );
    let fetcher = MemoryFetcher::new()
        .with_text("https://site.test/pages/table.csv", Some("text/csv"), r#"{"csv": false}"#)
        .with_text("https://site.test/pages/rows", None, "a;b\nc;d");

    let orchestrator = Orchestrator::new(doc, fetcher, RecordingRuntime::new());
    orchestrator.run().await.unwrap();

    let runtime = orchestrator.runtime();
    assert_eq!(runtime.latest(MountHandle(0)).unwrap()["data"], json!({"csv": false}));
    assert_eq!(runtime.latest(MountHandle(1)).unwrap()["data"], json!([["a", "b"], ["c", "d"]]));
}
