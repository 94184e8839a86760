//! Payload format detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

const TABULAR_MIME: &str = "text/csv";
const TABULAR_SUFFIX: &str = ".csv";

/// How a payload body is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// Delimited text, see [`crate::tabular`]
    Tabular,
    /// JSON
    Structured,
}

impl PayloadFormat {
    /// Interpret the `data_src_type` attribute. Unknown values mean auto.
    pub fn from_override(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FromStr for PayloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(PayloadFormat::Tabular),
            "json" => Ok(PayloadFormat::Structured),
            other => Err(format!("unknown format '{}' (expected csv or json)", other)),
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadFormat::Tabular => write!(f, "csv"),
            PayloadFormat::Structured => write!(f, "json"),
        }
    }
}

/// Decide how to decode a payload.
///
/// Signals, strongest first: the container's override, a `text/csv` content
/// type, a `.csv` path suffix on the source resolved against `base`. Anything
/// else is decoded as JSON.
pub fn decide(
    source: &str,
    content_type: Option<&str>,
    override_format: Option<PayloadFormat>,
    base: Option<&Url>,
) -> PayloadFormat {
    if let Some(format) = override_format {
        return format;
    }

    let tabular_type = content_type
        .map(|ct| ct.to_ascii_lowercase().contains(TABULAR_MIME))
        .unwrap_or(false);
    if tabular_type {
        return PayloadFormat::Tabular;
    }

    if has_tabular_suffix(source, base) {
        return PayloadFormat::Tabular;
    }

    PayloadFormat::Structured
}

fn has_tabular_suffix(source: &str, base: Option<&Url>) -> bool {
    match Url::options().base_url(base).parse(source) {
        Ok(url) => url.path().to_lowercase().ends_with(TABULAR_SUFFIX),
        Err(e) => {
            log::debug!("Source '{}' is not a URL ({}), skipping suffix check", source, e);
            false
        }
    }
}
