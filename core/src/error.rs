//! Error types for the data-source adapter.
//!
//! The hierarchy mirrors the failure scopes of a page:
//!
//! - [`LoadError`] - one container's retrieval or decode failed
//! - [`RuntimeError`] - the reactive runtime could not be loaded or used
//! - [`OrchestratorError`] - page-wide failures surfaced by [`crate::Orchestrator::run`]
//!
//! A container without a source locator is not an error at all: preparation
//! simply returns `None` for it.

use thiserror::Error;

// =============================================================================
// Container load errors
// =============================================================================

/// Errors that end a single container's load attempt.
///
/// The `Display` output is the text written to the container's error field,
/// so it is kept short and human-readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The transport answered with a status outside the success range.
    #[error("HTTP {status}")]
    Transport { status: u16 },

    /// The request never produced a response.
    #[error("{0}")]
    Network(String),

    /// The body could not be interpreted as the expected format.
    #[error("{0}")]
    Decode(String),
}

impl LoadError {
    /// Structured-decode failure with the conventional message.
    pub fn invalid_json() -> Self {
        LoadError::Decode("Invalid JSON".to_string())
    }

    /// Whether the failure happened before a body was read.
    pub fn is_transport(&self) -> bool {
        matches!(self, LoadError::Transport { .. } | LoadError::Network(_))
    }
}

// =============================================================================
// Runtime errors
// =============================================================================

/// Errors from the host reactive runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The runtime script failed to load or did not expose its entry point.
    #[error("{0}")]
    Unavailable(String),

    /// Creating the shared application context failed.
    #[error("Failed to create app: {0}")]
    CreateApp(String),

    /// Mounting a container failed.
    #[error("Failed to mount container: {0}")]
    Mount(String),
}

// =============================================================================
// Orchestrator errors (top-level)
// =============================================================================

/// Page-wide failures.
///
/// Per-container failures never show up here; they end up in the
/// container's scope instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// No container can mount without the runtime.
    #[error("Reactive runtime unavailable: {0}")]
    RuntimeUnavailable(#[from] RuntimeError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for container loads.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Result type for orchestrator runs.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
