//! Adapter configuration.
//!
//! Attribute names and presentation constants shared by every document
//! implementation. Per-container settings come from these attributes; there
//! is no environment or file configuration.

/// Source locator attribute. Its presence activates a container.
pub const ATTR_SOURCE: &str = "data_src";

/// Name under which the loaded data is exposed to the template.
pub const ATTR_BINDING: &str = "closure_arg";

/// Format override (`csv` or `json`).
pub const ATTR_FORMAT: &str = "data_src_type";

/// Tabular delimiter (single character, `\t` accepted).
pub const ATTR_CSV_DELIMITER: &str = "data_csv_delim";

/// Tabular header mode (`true`, `false`, or absent for auto-detection).
pub const ATTR_CSV_HEADER: &str = "data_csv_header";

/// Tabular trim flag (anything but `false` trims).
pub const ATTR_CSV_TRIM: &str = "data_csv_trim";

/// Pre-transform markup, kept so a container can be processed again.
pub const ATTR_TEMPLATE_ORIGINAL: &str = "data-template-original";

/// Scope expression attribute read by the runtime at mount time.
pub const ATTR_SCOPE: &str = "v-scope";

/// Selector matching every eligible container.
pub const CONTAINER_SELECTOR: &str = "[data_src]";

/// Attribute used by the simple JSON loader.
pub const ATTR_SIMPLE_SOURCE: &str = "v-dada";

/// Selector matching simple-loader elements.
pub const SIMPLE_SELECTOR: &str = "[v-dada]";

/// Key under which the simple loader exposes its payload.
pub const SIMPLE_BINDING: &str = "dada";

/// Default binding name.
pub const DEFAULT_BINDING: &str = "data";

/// Default tabular delimiter.
pub const DEFAULT_DELIMITER: char = ',';

/// Scope field holding the error message.
pub const SCOPE_ERROR_FIELD: &str = "__err";

/// Scope field holding the loading flag.
pub const SCOPE_LOADING_FIELD: &str = "__loading";

/// Script providing `window.PetiteVue`.
pub const RUNTIME_SCRIPT_URL: &str = "https://unpkg.com/petite-vue/dist/petite-vue.iife.js";

/// Inline style of the page-wide failure notice.
pub const FAILURE_NOTICE_STYLE: &str = "color:#c00;";

/// Inline style of a container's error block.
pub const ERROR_BLOCK_STYLE: &str =
    "color:#c00;background:#fff5f5;padding:.5em;border:1px solid #f3caca;white-space:pre-wrap;";

/// Inline style of the loading placeholder.
pub const LOADING_STYLE: &str = "opacity:.7;";

/// Loading placeholder text.
pub const LOADING_TEXT: &str = "Loading…";

/// Capacity of the lifecycle event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;
