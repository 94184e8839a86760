//! Per-container lifecycle.
//!
//! ```text
//! Initializing ──prepare──▶ Loading ──load ok──▶ Ready
//!                              └──────load err──▶ Failed
//! ```
//!
//! `prepare` reads the container's attributes, rewrites its template and
//! installs the presentation shell. `load` retrieves and decodes the source.
//! Ready and Failed are terminal; nothing retries.
//!
//! Container state lives in a [`ContainerArena`] keyed by [`ContainerId`]
//! instead of on the platform's element objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

use crate::config::{
    ATTR_BINDING, ATTR_CSV_DELIMITER, ATTR_CSV_HEADER, ATTR_CSV_TRIM, ATTR_FORMAT, ATTR_SCOPE,
    ATTR_SOURCE, ATTR_TEMPLATE_ORIGINAL, DEFAULT_BINDING, DEFAULT_DELIMITER, SCOPE_ERROR_FIELD,
    SCOPE_LOADING_FIELD,
};
use crate::directive::{is_identifier, rewrite, scope_expression, wrap_presentation};
use crate::error::{LoadError, LoadResult};
use crate::host::{Document, Fetcher, Response};
use crate::sniff::{decide, PayloadFormat};
use crate::tabular::{self, parse, HeaderMode, TabularOptions};

// =============================================================================
// Identity and phases
// =============================================================================

/// Index of a container in its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub usize);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Initializing,
    Loading,
    Ready,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Ready | Phase::Failed)
    }
}

// =============================================================================
// Scope
// =============================================================================

/// The record a mounted template reads from.
///
/// Starts as `{ data: {}, error: None, loading: true }`. `loading` drops to
/// false exactly once, together with either the data or the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub data: Value,
    pub error: Option<String>,
    pub loading: bool,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            data: Value::Object(Map::new()),
            error: None,
            loading: true,
        }
    }

    /// Apply a load outcome. Later calls are ignored.
    pub fn settle(&mut self, outcome: LoadResult<Value>) -> bool {
        if !self.loading {
            return false;
        }
        match outcome {
            Ok(data) => self.data = data,
            Err(e) => self.error = Some(e.to_string()),
        }
        self.loading = false;
        true
    }

    /// The scope as the runtime sees it, with `binding` naming the data.
    pub fn to_value(&self, binding: &str) -> Value {
        let mut map = Map::new();
        map.insert(binding.to_string(), self.data.clone());
        map.insert(
            SCOPE_ERROR_FIELD.to_string(),
            self.error.clone().map(Value::String).unwrap_or(Value::Null),
        );
        map.insert(SCOPE_LOADING_FIELD.to_string(), Value::Bool(self.loading));
        Value::Object(map)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// Everything a container's attributes declare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    /// Source locator as written
    pub source: String,
    /// Name the data is exposed under
    pub binding: String,
    /// Declared format, `None` for auto-detection
    pub format: Option<PayloadFormat>,
    pub tabular: TabularOptions,
    /// Markup before any rewrite
    pub original_markup: String,
}

impl ContainerDescriptor {
    /// Read a container's attributes. `None` when it has no source locator.
    pub fn read<D: Document>(document: &D, node: &D::Node) -> Option<Self> {
        let source = non_empty(document.attribute(node, ATTR_SOURCE))?;

        let original_markup = non_empty(document.attribute(node, ATTR_TEMPLATE_ORIGINAL))
            .unwrap_or_else(|| document.inner_html(node));

        Some(Self {
            binding: parse_binding(document.attribute(node, ATTR_BINDING)),
            format: parse_format(document.attribute(node, ATTR_FORMAT)),
            tabular: TabularOptions {
                delimiter: parse_delimiter(document.attribute(node, ATTR_CSV_DELIMITER)),
                trim: parse_trim(document.attribute(node, ATTR_CSV_TRIM)),
                header: HeaderMode::from_attribute(document.attribute(node, ATTR_CSV_HEADER).as_deref()),
            },
            source,
            original_markup,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_binding(value: Option<String>) -> String {
    match non_empty(value) {
        None => DEFAULT_BINDING.to_string(),
        Some(name) if is_identifier(&name) => name,
        Some(name) => {
            log::warn!("Binding name '{}' is not an identifier, using '{}'", name, DEFAULT_BINDING);
            DEFAULT_BINDING.to_string()
        }
    }
}

fn parse_format(value: Option<String>) -> Option<PayloadFormat> {
    let value = non_empty(value)?;
    let format = PayloadFormat::from_override(&value);
    if format.is_none() {
        log::warn!("Unknown source type '{}', detecting format instead", value);
    }
    format
}

fn parse_delimiter(value: Option<String>) -> char {
    let Some(value) = non_empty(value) else {
        return DEFAULT_DELIMITER;
    };
    tabular::parse_delimiter(&value).unwrap_or_else(|e| {
        log::warn!("{}, using '{}'", e, DEFAULT_DELIMITER);
        DEFAULT_DELIMITER
    })
}

fn parse_trim(value: Option<String>) -> bool {
    match non_empty(value) {
        Some(v) => !v.eq_ignore_ascii_case("false"),
        None => true,
    }
}

// =============================================================================
// Arena
// =============================================================================

/// One container's state.
#[derive(Debug, Clone)]
pub struct ContainerState<N> {
    pub id: ContainerId,
    pub node: N,
    pub descriptor: ContainerDescriptor,
    pub phase: Phase,
    pub scope: Scope,
}

impl<N> ContainerState<N> {
    /// Leave `Initializing` once the element has been rewritten.
    pub fn begin_loading(&mut self) {
        if self.phase == Phase::Initializing {
            self.phase = Phase::Loading;
        }
    }

    /// Record a load outcome and move to the matching terminal phase.
    pub fn settle(&mut self, outcome: LoadResult<Value>) {
        let failed = outcome.is_err();
        if self.scope.settle(outcome) {
            self.phase = if failed { Phase::Failed } else { Phase::Ready };
        }
    }
}

/// Container states keyed by [`ContainerId`].
#[derive(Debug)]
pub struct ContainerArena<N> {
    containers: Vec<ContainerState<N>>,
}

impl<N> ContainerArena<N> {
    pub fn new() -> Self {
        Self { containers: Vec::new() }
    }

    /// Register a discovered container. It starts out initializing.
    pub fn insert(&mut self, node: N, descriptor: ContainerDescriptor) -> ContainerId {
        let id = ContainerId(self.containers.len());
        self.containers.push(ContainerState {
            id,
            node,
            descriptor,
            phase: Phase::Initializing,
            scope: Scope::new(),
        });
        id
    }

    pub fn get(&self, id: ContainerId) -> Option<&ContainerState<N>> {
        self.containers.get(id.0)
    }

    pub fn get_mut(&mut self, id: ContainerId) -> Option<&mut ContainerState<N>> {
        self.containers.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContainerState<N>> {
        self.containers.iter()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

impl<N> Default for ContainerArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// `Initializing → Loading`: rewrite the container in place.
///
/// Returns `None`, leaving the element untouched, when it has no source
/// locator. Otherwise the element gets its `v-scope`, the presentation shell
/// replaces its markup, the activation attributes are removed and the
/// original markup is stored for later re-processing.
pub fn prepare<D: Document>(document: &D, node: &D::Node) -> Option<ContainerDescriptor> {
    let descriptor = ContainerDescriptor::read(document, node)?;
    activate(document, node, &descriptor);
    Some(descriptor)
}

/// Rewrite an element already read into `descriptor`.
pub fn activate<D: Document>(document: &D, node: &D::Node, descriptor: &ContainerDescriptor) {
    let template = rewrite(&descriptor.original_markup);
    document.set_attribute(node, ATTR_SCOPE, &scope_expression(&descriptor.binding));
    document.set_inner_html(node, &wrap_presentation(&template));

    document.remove_attribute(node, ATTR_SOURCE);
    document.remove_attribute(node, ATTR_BINDING);
    document.set_attribute(node, ATTR_TEMPLATE_ORIGINAL, &descriptor.original_markup);
}

/// `Loading → Ready | Failed`: retrieve and decode a container's source.
///
/// The caller commits the outcome into the scope.
pub async fn load<F: Fetcher>(
    fetcher: &F,
    descriptor: &ContainerDescriptor,
    base: Option<&Url>,
) -> LoadResult<Value> {
    let url = resolve_source(&descriptor.source, base);
    let response = fetcher.fetch(&url).await?;
    if !response.ok() {
        return Err(LoadError::Transport { status: response.status() });
    }

    let content_type = response.content_type();
    let format = decide(&descriptor.source, content_type.as_deref(), descriptor.format, base);
    let text = response.text().await?;

    decode(&text, format, &descriptor.tabular)
}

/// Decode a body in the given format.
pub fn decode(text: &str, format: PayloadFormat, options: &TabularOptions) -> LoadResult<Value> {
    match format {
        PayloadFormat::Tabular => Ok(parse(text, options).into()),
        PayloadFormat::Structured => serde_json::from_str(text).map_err(|e| {
            log::debug!("JSON decode failed: {}", e);
            LoadError::invalid_json()
        }),
    }
}

/// Resolve a source against the document location when possible.
pub fn resolve_source(source: &str, base: Option<&Url>) -> String {
    match Url::options().base_url(base).parse(source) {
        Ok(url) => url.to_string(),
        Err(_) => source.to_string(),
    }
}
