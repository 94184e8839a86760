//! Interfaces to the environment the adapter runs in.
//!
//! The adapter never touches a DOM, a network stack or the reactive runtime
//! directly. A browser build implements these traits with `web-sys` and
//! petite-vue; the native build and the tests use in-memory versions.
//!
//! Everything is single-threaded, so the futures are not `Send`.

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::error::{LoadResult, RuntimeResult};

/// The document containers live in.
#[async_trait(?Send)]
pub trait Document {
    /// Element handle
    type Node: Clone;

    /// Resolves once the document is interactive (immediately if it already is).
    async fn ready(&self);

    /// Resolves once the current rendering pass has settled.
    async fn after_render(&self);

    /// Elements matching `selector`, in document order.
    fn query_all(&self, selector: &str) -> Vec<Self::Node>;

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str);

    fn remove_attribute(&self, node: &Self::Node, name: &str);

    fn inner_html(&self, node: &Self::Node) -> String;

    fn set_inner_html(&self, node: &Self::Node, html: &str);

    /// The document's own location, used to resolve relative sources.
    fn location(&self) -> Option<Url>;
}

/// A response whose body has not been read yet.
#[async_trait(?Send)]
pub trait Response {
    fn status(&self) -> u16;

    fn content_type(&self) -> Option<String>;

    /// Read the whole body as text.
    async fn text(self) -> LoadResult<String>;

    fn ok(&self) -> bool {
        (200..300).contains(&self.status())
    }
}

/// Retrieves data sources.
#[async_trait(?Send)]
pub trait Fetcher {
    type Response: Response;

    /// Issue one request for an absolute (or document-relative) URL, sending
    /// credentials only to the same origin.
    async fn fetch(&self, url: &str) -> LoadResult<Self::Response>;
}

/// The host reactive runtime (petite-vue in the browser).
#[async_trait(?Send)]
pub trait ReactiveRuntime {
    type Node;
    /// Shared application context
    type App;
    /// Live scope of one mounted node
    type Handle;

    /// Resolves once the runtime can create apps, loading it if needed.
    async fn ensure_available(&self) -> RuntimeResult<()>;

    fn create_app(&self, shared: &Value) -> RuntimeResult<Self::App>;

    /// Mount `node`; its directives are evaluated against its `v-scope`.
    fn mount(&self, app: &Self::App, node: &Self::Node) -> RuntimeResult<Self::Handle>;

    /// Write a container's scope fields into the live scope.
    ///
    /// Implementations write the data, then the error, then the loading flag,
    /// all in the same synchronous call.
    fn commit(&self, handle: &Self::Handle, binding: &str, scope: &crate::container::Scope);
}
