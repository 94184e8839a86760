//! datasrc - browser build
//!
//! Loaded as a WebAssembly module on a page. On start it processes every
//! `[data_src]` container and every `[v-dada]` element, loading petite-vue
//! on demand.
//!
//! # Modules
//!
//! - [`document`] - the live DOM
//! - [`fetch`] - same-origin-credentialed fetch
//! - [`runtime`] - the petite-vue bridge

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use datasrc::{parse_delimiter, HeaderMode, Orchestrator, SimpleLoader, TabularOptions};

// =============================================================================
// Module declarations
// =============================================================================

pub mod document;
pub mod fetch;
pub mod runtime;

// =============================================================================
// Re-exports
// =============================================================================

pub use document::WebDocument;
pub use fetch::{WebFetcher, WebResponse};
pub use runtime::PetiteVueRuntime;

/// Best-effort text of a thrown JavaScript value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    js_sys::Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

// =============================================================================
// Application Entry Point
// =============================================================================

/// WASM entry point, called when the module is instantiated.
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    _ = console_log::init_with_level(log::Level::Info);

    spawn_local(run_containers());
    spawn_local(run_simple_loader());
}

async fn run_containers() {
    let Some(document) = WebDocument::current() else {
        log::error!("No document, containers not processed");
        return;
    };

    let orchestrator = Orchestrator::new(document, WebFetcher::new(), PetiteVueRuntime::new());
    match orchestrator.run().await {
        Ok(report) if !report.containers.is_empty() => log::info!(
            "datasrc: {} container(s) ready, {} failed",
            report.ready_count(),
            report.failed_count()
        ),
        Ok(_) => {}
        Err(e) => log::error!("datasrc: {}", e),
    }
}

async fn run_simple_loader() {
    let Some(document) = WebDocument::current() else {
        return;
    };

    let loader = SimpleLoader::new(document, WebFetcher::new(), PetiteVueRuntime::new());
    let mounted = loader.run().await;
    if mounted > 0 {
        log::info!("v-dada: {} element(s) mounted", mounted);
    }
}

// =============================================================================
// JavaScript helpers
// =============================================================================

/// Rewrite `{#each}`, `{#if}` and `{expr}` directives into petite-vue syntax.
#[wasm_bindgen(js_name = rewriteTemplate)]
pub fn rewrite_template(markup: &str) -> String {
    datasrc::rewrite(markup)
}

/// Parse delimited text the way a container would.
///
/// `header` is `"auto"`, `"true"` or `"false"`. Returns an array of records
/// or an array of string arrays.
#[wasm_bindgen(js_name = parseTabular)]
pub fn parse_tabular(text: &str, delimiter: Option<String>, header: Option<String>, trim: Option<bool>) -> Result<JsValue, JsValue> {
    let delimiter = match delimiter.as_deref() {
        None | Some("") => datasrc::config::DEFAULT_DELIMITER,
        Some(d) => parse_delimiter(d).map_err(|e| JsValue::from_str(&e))?,
    };
    let options = TabularOptions {
        delimiter,
        trim: trim.unwrap_or(true),
        header: HeaderMode::from_attribute(header.as_deref()),
    };

    let value = datasrc::parse(text, &options).to_value();
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
