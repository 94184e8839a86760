//! Body decoding with charset and delimiter detection.
//!
//! A browser hands the page already-decoded text. Off the browser we get raw
//! bytes, so the charset comes from the `Content-Type` header when present
//! and from chardet otherwise.

use encoding_rs::Encoding;

/// Extract the `charset` parameter of a content type.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_lowercase())
        } else {
            None
        }
    })
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the given encoding label. Unknown labels fall back to
/// lossy UTF-8. A leading byte order mark is consumed.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match Encoding::for_label(encoding.as_bytes()) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => {
            log::debug!("Unknown encoding '{}', decoding as UTF-8", encoding);
            encoding_rs::UTF_8.decode(bytes).0.into_owned()
        }
    }
}

/// Decode a response or file body, preferring the declared charset.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .unwrap_or_else(|| detect_encoding(bytes));
    log::debug!("Decoding {} bytes as {}", bytes.len(), encoding);
    decode_content(bytes, &encoding)
}

/// Guess the delimiter by counting candidates in the first line.
///
/// Falls back to `,` when no candidate occurs at all.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = (datasrc::config::DEFAULT_DELIMITER, 0);
    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best.1 {
            best = (sep, count);
        }
    }
    best.0
}
