//! The simple JSON loader.
//!
//! Elements carrying `v-dada="url"` get the JSON document at `url` mounted as
//! `dada` in an app of their own. Elements are handled one after the other
//! and a failure only skips the element it happened on.
//!
//! The most recently loaded payload is kept in [`SimpleLoader::latest`], a
//! slot owned by the loader and overwritten on every successful load.

use serde_json::{Map, Value};
use std::cell::RefCell;

use crate::config::{ATTR_SIMPLE_SOURCE, SIMPLE_BINDING, SIMPLE_SELECTOR};
use crate::container::resolve_source;
use crate::error::{LoadError, LoadResult, RuntimeError};
use crate::events::{EventBroadcaster, LifecycleEvent};
use crate::host::{Document, Fetcher, ReactiveRuntime, Response};

/// Why one element was skipped.
#[derive(Debug, thiserror::Error)]
enum SimpleLoadError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub struct SimpleLoader<D, F, R> {
    document: D,
    fetcher: F,
    runtime: R,
    events: EventBroadcaster,
    latest: RefCell<Option<Value>>,
}

impl<D, F, R> SimpleLoader<D, F, R>
where
    D: Document,
    F: Fetcher,
    R: ReactiveRuntime<Node = D::Node>,
{
    pub fn new(document: D, fetcher: F, runtime: R) -> Self {
        Self {
            document,
            fetcher,
            runtime,
            events: EventBroadcaster::new(),
            latest: RefCell::new(None),
        }
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// The payload of the last successful load.
    pub fn latest(&self) -> Option<Value> {
        self.latest.borrow().clone()
    }

    /// Load and mount every `v-dada` element. Returns how many were mounted.
    pub async fn run(&self) -> usize {
        self.document.ready().await;

        let mut mounted = 0;
        for node in self.document.query_all(SIMPLE_SELECTOR) {
            let Some(url) = self.document.attribute(&node, ATTR_SIMPLE_SOURCE).filter(|u| !u.is_empty()) else {
                continue;
            };

            self.events.emit(LifecycleEvent::info(format!("Loading data from {}", url)));
            match self.load_and_mount(&node, &url).await {
                Ok(()) => {
                    mounted += 1;
                    self.events.emit(LifecycleEvent::success(format!("Mounted data from {}", url)));
                }
                Err(e) => {
                    self.events
                        .emit(LifecycleEvent::error(format!("Failed to load data from {}: {}", url, e)));
                }
            }
        }
        mounted
    }

    async fn load_and_mount(&self, node: &D::Node, url: &str) -> Result<(), SimpleLoadError> {
        let data = self.fetch_json(url).await?;

        self.runtime.ensure_available().await?;

        *self.latest.borrow_mut() = Some(data.clone());

        let mut shared = Map::new();
        shared.insert(SIMPLE_BINDING.to_string(), data);
        let app = self.runtime.create_app(&Value::Object(shared))?;
        self.runtime.mount(&app, node)?;
        Ok(())
    }

    async fn fetch_json(&self, url: &str) -> LoadResult<Value> {
        let base = self.document.location();
        let response = self.fetcher.fetch(&resolve_source(url, base.as_ref())).await?;
        if !response.ok() {
            return Err(LoadError::Transport { status: response.status() });
        }
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|_| LoadError::invalid_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDocument, MemoryFetcher, RecordingRuntime};
    use serde_json::json;
    use url::Url;

    fn page() -> MemoryDocument {
        MemoryDocument::new().with_location(Url::parse("https://site.test/").unwrap())
    }

    #[tokio::test]
    async fn test_mounts_each_element_with_its_own_app() {
        let doc = page();
        let a = doc.create_element("div", &[("v-dada", "a.json")], "{{ dada.n }}");
        let b = doc.create_element("div", &[("v-dada", "b.json")], "{{ dada.n }}");
        let fetcher = MemoryFetcher::new()
            .with_text("https://site.test/a.json", None, r#"{"n": 1}"#)
            .with_text("https://site.test/b.json", None, r#"{"n": 2}"#);

        let loader = SimpleLoader::new(doc, fetcher, RecordingRuntime::new());
        assert_eq!(loader.run().await, 2);

        let runtime = loader.runtime();
        assert_eq!(runtime.apps(), vec![json!({"dada": {"n": 1}}), json!({"dada": {"n": 2}})]);
        assert_eq!(runtime.mounts(), vec![(0, a), (1, b)]);
        assert_eq!(loader.latest(), Some(json!({"n": 2})));
    }

    #[tokio::test]
    async fn test_failure_skips_only_that_element() {
        let doc = page();
        doc.create_element("div", &[("v-dada", "missing.json")], "");
        doc.create_element("div", &[("v-dada", "")], "");
        doc.create_element("div", &[("v-dada", "bad.json")], "");
        let ok = doc.create_element("div", &[("v-dada", "ok.json")], "");
        let fetcher = MemoryFetcher::new()
            .with_status("https://site.test/missing.json", 404)
            .with_text("https://site.test/bad.json", None, "not json")
            .with_text("https://site.test/ok.json", None, "[1, 2]");

        let loader = SimpleLoader::new(doc, fetcher, RecordingRuntime::new());
        let mut rx = loader.events().subscribe();
        assert_eq!(loader.run().await, 1);

        assert_eq!(loader.runtime().mounts(), vec![(0, ok)]);
        assert_eq!(loader.latest(), Some(json!([1, 2])));

        let mut errors = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.level == crate::events::EventLevel::Error {
                errors.push(event.message);
            }
        }
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("HTTP 404"));
        assert!(errors[1].contains("Invalid JSON"));
    }

    #[tokio::test]
    async fn test_runtime_unavailable_mounts_nothing() {
        let doc = page();
        doc.create_element("div", &[("v-dada", "a.json")], "");
        let fetcher = MemoryFetcher::new().with_text("https://site.test/a.json", None, "{}");

        let loader = SimpleLoader::new(doc, fetcher, RecordingRuntime::unavailable("no runtime"));
        assert_eq!(loader.run().await, 0);
        assert!(loader.runtime().mounts().is_empty());
        assert_eq!(loader.latest(), None);
    }
}
