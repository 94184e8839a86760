//! In-memory host implementations.
//!
//! A flat element list standing in for a DOM, a routing table standing in
//! for the network, and a runtime that records what it was asked to mount
//! and commit. The native CLI uses them for dry runs; the tests use them to
//! drive the orchestrator without a browser.

use async_trait::async_trait;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use url::Url;

use crate::container::Scope;
use crate::error::{LoadError, LoadResult, RuntimeError, RuntimeResult};
use crate::host::{Document, Fetcher, ReactiveRuntime, Response};

// =============================================================================
// Document
// =============================================================================

/// Handle to an element of a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryNode(usize);

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attributes: Vec<(String, String)>,
    inner_html: String,
}

/// Elements with attributes and inner HTML, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    elements: RefCell<Vec<Element>>,
    location: Option<Url>,
    render_passes: Cell<usize>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, location: Url) -> Self {
        self.location = Some(location);
        self
    }

    /// Append an element to the document.
    pub fn create_element(&self, tag: &str, attributes: &[(&str, &str)], inner_html: &str) -> MemoryNode {
        let mut elements = self.elements.borrow_mut();
        elements.push(Element {
            tag: tag.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            inner_html: inner_html.to_string(),
        });
        MemoryNode(elements.len() - 1)
    }

    /// Every element handle, in document order.
    pub fn nodes(&self) -> Vec<MemoryNode> {
        (0..self.elements.borrow().len()).map(MemoryNode).collect()
    }

    pub fn tag(&self, node: &MemoryNode) -> Option<String> {
        self.elements.borrow().get(node.0).map(|e| e.tag.clone())
    }

    /// All attributes of an element, in the order they were set.
    pub fn attributes(&self, node: &MemoryNode) -> Vec<(String, String)> {
        self.elements
            .borrow()
            .get(node.0)
            .map(|e| e.attributes.clone())
            .unwrap_or_default()
    }

    /// How many times [`Document::after_render`] was awaited.
    pub fn render_passes(&self) -> usize {
        self.render_passes.get()
    }

    fn matches(element: &Element, selector: &str) -> bool {
        let selector = selector.trim();
        if selector == "*" {
            return true;
        }
        match selector.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            Some(name) => element.attributes.iter().any(|(k, _)| k == name),
            None => element.tag.eq_ignore_ascii_case(selector),
        }
    }
}

#[async_trait(?Send)]
impl Document for MemoryDocument {
    type Node = MemoryNode;

    async fn ready(&self) {}

    async fn after_render(&self) {
        self.render_passes.set(self.render_passes.get() + 1);
    }

    fn query_all(&self, selector: &str) -> Vec<MemoryNode> {
        self.elements
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, element)| Self::matches(element, selector))
            .map(|(i, _)| MemoryNode(i))
            .collect()
    }

    fn attribute(&self, node: &MemoryNode, name: &str) -> Option<String> {
        self.elements
            .borrow()
            .get(node.0)?
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) {
        if let Some(element) = self.elements.borrow_mut().get_mut(node.0) {
            match element.attributes.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => element.attributes.push((name.to_string(), value.to_string())),
            }
        }
    }

    fn remove_attribute(&self, node: &MemoryNode, name: &str) {
        if let Some(element) = self.elements.borrow_mut().get_mut(node.0) {
            element.attributes.retain(|(k, _)| k != name);
        }
    }

    fn inner_html(&self, node: &MemoryNode) -> String {
        self.elements
            .borrow()
            .get(node.0)
            .map(|e| e.inner_html.clone())
            .unwrap_or_default()
    }

    fn set_inner_html(&self, node: &MemoryNode, html: &str) {
        if let Some(element) = self.elements.borrow_mut().get_mut(node.0) {
            element.inner_html = html.to_string();
        }
    }

    fn location(&self) -> Option<Url> {
        self.location.clone()
    }
}

// =============================================================================
// Fetcher
// =============================================================================

#[derive(Debug, Clone)]
enum Route {
    Body {
        status: u16,
        content_type: Option<String>,
        body: String,
    },
    Fail(String),
}

/// Serves canned responses by exact URL. Unknown URLs fail like a network
/// error.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    routes: HashMap<String, Route>,
    requests: RefCell<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with status 200 and `body`.
    pub fn with_text(mut self, url: &str, content_type: Option<&str>, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Route::Body {
                status: 200,
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            },
        );
        self
    }

    /// Answer `url` with an empty body and `status`.
    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(
            url.to_string(),
            Route::Body {
                status,
                content_type: None,
                body: String::new(),
            },
        );
        self
    }

    /// Fail `url` before any response.
    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.routes.insert(url.to_string(), Route::Fail(message.to_string()));
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

/// Response of a [`MemoryFetcher`].
#[derive(Debug, Clone)]
pub struct MemoryResponse {
    status: u16,
    content_type: Option<String>,
    body: String,
}

#[async_trait(?Send)]
impl Response for MemoryResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn content_type(&self) -> Option<String> {
        self.content_type.clone()
    }

    async fn text(self) -> LoadResult<String> {
        Ok(self.body)
    }
}

#[async_trait(?Send)]
impl Fetcher for MemoryFetcher {
    type Response = MemoryResponse;

    async fn fetch(&self, url: &str) -> LoadResult<MemoryResponse> {
        self.requests.borrow_mut().push(url.to_string());

        match self.routes.get(url) {
            Some(Route::Body { status, content_type, body }) => Ok(MemoryResponse {
                status: *status,
                content_type: content_type.clone(),
                body: body.clone(),
            }),
            Some(Route::Fail(message)) => Err(LoadError::Network(message.clone())),
            None => Err(LoadError::Network(format!("Failed to fetch {}", url))),
        }
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Handle to a mount made by a [`RecordingRuntime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MountHandle(pub usize);

/// A runtime that records apps, mounts and scope commits.
#[derive(Debug, Default)]
pub struct RecordingRuntime {
    unavailable: Option<String>,
    availability_checks: Cell<usize>,
    apps: RefCell<Vec<Value>>,
    mounts: RefCell<Vec<(usize, MemoryNode)>>,
    commits: RefCell<Vec<(MountHandle, Value)>>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// A runtime whose loading always fails with `message`.
    pub fn unavailable(message: &str) -> Self {
        Self {
            unavailable: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn availability_checks(&self) -> usize {
        self.availability_checks.get()
    }

    /// Shared scopes of the apps created so far.
    pub fn apps(&self) -> Vec<Value> {
        self.apps.borrow().clone()
    }

    /// Mounted nodes with the app they belong to.
    pub fn mounts(&self) -> Vec<(usize, MemoryNode)> {
        self.mounts.borrow().clone()
    }

    /// Every commit, in order.
    pub fn commits(&self) -> Vec<(MountHandle, Value)> {
        self.commits.borrow().clone()
    }

    /// Last committed scope of a mount.
    pub fn latest(&self, handle: MountHandle) -> Option<Value> {
        self.commits
            .borrow()
            .iter()
            .rev()
            .find(|(h, _)| *h == handle)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait(?Send)]
impl ReactiveRuntime for RecordingRuntime {
    type Node = MemoryNode;
    type App = usize;
    type Handle = MountHandle;

    async fn ensure_available(&self) -> RuntimeResult<()> {
        self.availability_checks.set(self.availability_checks.get() + 1);
        match &self.unavailable {
            Some(message) => Err(RuntimeError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }

    fn create_app(&self, shared: &Value) -> RuntimeResult<usize> {
        let mut apps = self.apps.borrow_mut();
        apps.push(shared.clone());
        Ok(apps.len() - 1)
    }

    fn mount(&self, app: &usize, node: &MemoryNode) -> RuntimeResult<MountHandle> {
        let mut mounts = self.mounts.borrow_mut();
        mounts.push((*app, *node));
        Ok(MountHandle(mounts.len() - 1))
    }

    fn commit(&self, handle: &MountHandle, binding: &str, scope: &Scope) {
        self.commits.borrow_mut().push((*handle, scope.to_value(binding)));
    }
}
