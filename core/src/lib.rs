//! # datasrc - declarative data-source containers
//!
//! Lets a page declare a remote CSV or JSON source and a small template on a
//! container element. The adapter fetches the data, rewrites the template
//! into petite-vue directives and drives each container through
//! loading, error and ready states.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌────────────┐     ┌────────────┐     ┌────────────┐
//! │ container  │────▶│ directive  │────▶│  runtime   │────▶│   load     │
//! │ attributes │     │ rewrite    │     │  mount     │     │ sniff+parse│
//! └────────────┘     └────────────┘     └────────────┘     └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datasrc::memory::{MemoryDocument, MemoryFetcher, RecordingRuntime};
//! use datasrc::Orchestrator;
//!
//! let doc = MemoryDocument::new();
//! doc.create_element("div", &[("data_src", "https://site.test/a.csv")], "{#each data as r}{r.name}{/each}");
//! let fetcher = MemoryFetcher::new().with_text("https://site.test/a.csv", None, "name\nAda\nAlan");
//!
//! let report = Orchestrator::new(doc, fetcher, RecordingRuntime::new()).run().await?;
//! assert_eq!(report.ready_count(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`tabular`] - delimited text parser
//! - [`directive`] - template directive rewriting
//! - [`sniff`] - payload format detection
//! - [`container`] - per-container lifecycle
//! - [`orchestrator`] - page-level driver
//! - [`loader`] - the simple `v-dada` JSON loader
//! - [`host`] - document, fetcher and runtime traits
//! - [`memory`] - in-memory host implementations
//! - [`events`] - lifecycle event broadcasting
//! - [`error`] - error types

// Core modules
pub mod config;
pub mod error;
pub mod events;

// Pure transforms
pub mod directive;
pub mod sniff;
pub mod tabular;

// Lifecycle
pub mod container;
pub mod host;
pub mod loader;
pub mod orchestrator;

// Hosts
pub mod memory;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{LoadError, LoadResult, OrchestratorError, OrchestratorResult, RuntimeError, RuntimeResult};

pub use events::{EventBroadcaster, EventLevel, LifecycleEvent};

pub use tabular::{parse, parse_delimiter, split_rows, to_delimited, HeaderMode, Record, Table, TabularOptions};

pub use directive::{rewrite, scope_expression, wrap_presentation};

pub use sniff::{decide, PayloadFormat};

pub use container::{
    activate, decode, load, prepare, resolve_source, ContainerArena, ContainerDescriptor, ContainerId,
    ContainerState, Phase, Scope,
};

pub use host::{Document, Fetcher, ReactiveRuntime, Response};

pub use loader::SimpleLoader;

pub use orchestrator::{failure_notice, ContainerReport, Orchestrator, RunReport};
