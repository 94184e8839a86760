//! # datasrc-native - off-browser hosts for datasrc
//!
//! Everything the browser provides for free has to be supplied here: bytes
//! must be decoded, sources may live on disk, and a page is an in-memory
//! document.
//!
//! ## Modules
//!
//! - [`decode`] - charset and delimiter detection
//! - [`fetch`] - HTTP(S) and file fetcher
//! - [`page`] - dry runs over a page manifest

pub mod decode;
pub mod fetch;
pub mod page;

// =============================================================================
// Re-exports
// =============================================================================

pub use decode::{charset_from_content_type, decode_body, decode_content, detect_delimiter, detect_encoding};

pub use fetch::{current_dir_url, directory_url, HttpFetcher, NativeError, NativeResponse};

pub use page::{render_page, ElementSpec, PageManifest, PageOutcome, RenderedElement};
