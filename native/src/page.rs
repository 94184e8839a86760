//! Dry runs of a whole page.
//!
//! A page manifest lists elements with their attributes and markup. The
//! elements go into an in-memory document, the orchestrator runs over them
//! with a real fetcher and a recording runtime, and the outcome shows the
//! rewritten markup and the scope each container ended with.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use url::Url;

use datasrc::memory::{MemoryDocument, MountHandle, RecordingRuntime};
use datasrc::{Document, Fetcher, LifecycleEvent, Orchestrator, RunReport};

fn default_tag() -> String {
    "div".to_string()
}

/// One element of a page manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementSpec {
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub html: String,
}

/// Elements of a page, in document order.
#[derive(Debug, Clone, Deserialize)]
pub struct PageManifest {
    /// Page address used to resolve relative sources
    #[serde(default)]
    pub location: Option<String>,
    pub elements: Vec<ElementSpec>,
}

/// An element after the run.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedElement {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub html: String,
    /// Last scope committed for this element, if it was mounted
    pub scope: Option<Value>,
}

/// Everything a dry run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PageOutcome {
    pub report: Option<RunReport>,
    pub error: Option<String>,
    pub elements: Vec<RenderedElement>,
    pub events: Vec<LifecycleEvent>,
}

/// Run the orchestrator over a manifest.
///
/// `fallback_base` resolves relative sources when the manifest has no
/// usable `location`.
pub async fn render_page<F: Fetcher>(manifest: &PageManifest, fallback_base: Url, fetcher: F) -> PageOutcome {
    let base = manifest
        .location
        .as_deref()
        .and_then(|loc| match Url::parse(loc) {
            Ok(url) => Some(url),
            Err(e) => {
                log::warn!("Ignoring page location '{}': {}", loc, e);
                None
            }
        })
        .unwrap_or(fallback_base);

    let document = MemoryDocument::new().with_location(base);
    for element in &manifest.elements {
        let attributes: Vec<(&str, &str)> = element
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        document.create_element(&element.tag, &attributes, &element.html);
    }

    let orchestrator = Orchestrator::new(document, fetcher, RecordingRuntime::new());
    let mut rx = orchestrator.events().subscribe();

    let (report, error) = match orchestrator.run().await {
        Ok(report) => (Some(report), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    let document = orchestrator.document();
    let runtime = orchestrator.runtime();
    let mounts = runtime.mounts();
    let elements = document
        .nodes()
        .into_iter()
        .map(|node| {
            let scope = mounts
                .iter()
                .position(|(_, mounted)| *mounted == node)
                .and_then(|i| runtime.latest(MountHandle(i)));
            RenderedElement {
                tag: document.tag(&node).unwrap_or_else(default_tag),
                attributes: document.attributes(&node).into_iter().collect(),
                html: document.inner_html(&node),
                scope,
            }
        })
        .collect();

    PageOutcome {
        report,
        error,
        elements,
        events,
    }
}
