//! Delimited text parser.
//!
//! Converts comma-separated (or any single-character-separated) text into
//! rows or header-keyed records in a single left-to-right pass. Quoted cells
//! may contain delimiters and line breaks, `""` inside quotes is a literal
//! quote, and both LF and CRLF end a row.
//!
//! The parser has no failure path. An unterminated quote simply runs to the
//! end of the input, so every input yields some table.
//!
//! # Example
//! ```ignore
//! use datasrc::tabular::{parse, TabularOptions};
//!
//! let table = parse("name,age\nAda,30\nAlan,28", &TabularOptions::default());
//! let records = table.records().unwrap();
//!
//! assert_eq!(records[0]["name"], "Ada");
//! assert_eq!(records[1]["age"], "28");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::config::DEFAULT_DELIMITER;

const QUOTE: char = '"';

/// A header-keyed row. Keys keep the header's column order.
pub type Record = Map<String, Value>;

/// Whether the first row names the columns.
///
/// Serialized, parsed and displayed as `auto`, `true` and `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HeaderMode {
    /// Decide from the data (see [`parse`]).
    #[default]
    #[serde(rename = "auto")]
    Auto,
    /// The first row is always a header.
    #[serde(rename = "true")]
    Present,
    /// Every row is data.
    #[serde(rename = "false")]
    Absent,
}

impl HeaderMode {
    /// Interpret the `data_csv_header` attribute.
    ///
    /// A missing attribute or exactly `auto` means auto-detection, exactly
    /// `true` forces a header, and every other value means no header.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            None | Some("auto") => HeaderMode::Auto,
            Some("true") => HeaderMode::Present,
            Some(_) => HeaderMode::Absent,
        }
    }
}

impl FromStr for HeaderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(HeaderMode::Auto),
            "true" => Ok(HeaderMode::Present),
            "false" => Ok(HeaderMode::Absent),
            other => Err(format!("invalid header mode '{}' (expected auto, true or false)", other)),
        }
    }
}

impl fmt::Display for HeaderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderMode::Auto => write!(f, "auto"),
            HeaderMode::Present => write!(f, "true"),
            HeaderMode::Absent => write!(f, "false"),
        }
    }
}

/// Options for [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularOptions {
    /// Cell separator
    pub delimiter: char,
    /// Strip surrounding whitespace from every cell
    pub trim: bool,
    /// Header handling
    pub header: HeaderMode,
}

impl Default for TabularOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            trim: true,
            header: HeaderMode::Auto,
        }
    }
}

impl TabularOptions {
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_header(mut self, header: HeaderMode) -> Self {
        self.header = header;
        self
    }
}

/// Parsed tabular data.
#[derive(Debug, Clone, PartialEq)]
pub enum Table {
    /// No header: raw cells, row by row.
    Rows(Vec<Vec<String>>),
    /// Header present: one record per data row.
    Records {
        /// The header row as written (duplicates included)
        headers: Vec<String>,
        /// Records keyed by header cell
        records: Vec<Record>,
    },
}

impl Table {
    /// Number of data rows (the header row is not counted).
    pub fn len(&self) -> usize {
        match self {
            Table::Rows(rows) => rows.len(),
            Table::Records { records, .. } => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Header cells, if the table has a header.
    pub fn headers(&self) -> Option<&[String]> {
        match self {
            Table::Rows(_) => None,
            Table::Records { headers, .. } => Some(headers),
        }
    }

    pub fn rows(&self) -> Option<&[Vec<String>]> {
        match self {
            Table::Rows(rows) => Some(rows),
            Table::Records { .. } => None,
        }
    }

    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Table::Rows(_) => None,
            Table::Records { records, .. } => Some(records),
        }
    }

    /// JSON view: an array of string arrays, or an array of objects.
    pub fn to_value(&self) -> Value {
        match self {
            Table::Rows(rows) => Value::Array(
                rows.iter()
                    .map(|row| Value::Array(row.iter().cloned().map(Value::String).collect()))
                    .collect(),
            ),
            Table::Records { records, .. } => {
                Value::Array(records.iter().cloned().map(Value::Object).collect())
            }
        }
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        match table {
            Table::Rows(rows) => Value::Array(
                rows.into_iter()
                    .map(|row| Value::Array(row.into_iter().map(Value::String).collect()))
                    .collect(),
            ),
            Table::Records { records, .. } => {
                Value::Array(records.into_iter().map(Value::Object).collect())
            }
        }
    }
}

/// Parse delimited text into a [`Table`].
///
/// Header detection in [`HeaderMode::Auto`]: the first row is a header only
/// when there are at least two rows, none of its cells is empty, and its cells
/// are unique ignoring case. A one-row table is therefore always raw rows,
/// and a data table whose first row happens to look like names is read as
/// having a header.
pub fn parse(text: &str, options: &TabularOptions) -> Table {
    let rows = split_rows(text, options);

    if has_header(&rows, options.header) {
        into_records(rows)
    } else {
        Table::Rows(rows)
    }
}

/// Scan `text` into raw rows without any header handling.
///
/// A final row consisting of one empty cell (what a trailing newline leaves
/// behind) is dropped.
pub fn split_rows(text: &str, options: &TabularOptions) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            if ch == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    chars.next();
                    cell.push(QUOTE);
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(ch);
            }
            continue;
        }

        match ch {
            QUOTE => in_quotes = true,
            c if c == options.delimiter => row.push(finish_cell(&mut cell, options.trim)),
            '\n' | '\r' => {
                row.push(finish_cell(&mut cell, options.trim));
                if ch == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                rows.push(std::mem::take(&mut row));
            }
            c => cell.push(c),
        }
    }

    row.push(finish_cell(&mut cell, options.trim));
    rows.push(row);

    if rows.last().is_some_and(|r| r.len() == 1 && r[0].is_empty()) {
        rows.pop();
    }

    rows
}

fn finish_cell(cell: &mut String, trim: bool) -> String {
    let value = std::mem::take(cell);
    if trim {
        trim_cell(&value).to_string()
    } else {
        value
    }
}

/// Whitespace trim that also strips a byte-order mark.
fn trim_cell(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

fn has_header(rows: &[Vec<String>], mode: HeaderMode) -> bool {
    match mode {
        HeaderMode::Present => true,
        HeaderMode::Absent => false,
        HeaderMode::Auto => {
            if rows.len() < 2 {
                return false;
            }
            let first = &rows[0];
            let non_empty = first.iter().all(|cell| !cell.is_empty());
            let mut seen = HashSet::new();
            let unique = first.iter().all(|cell| seen.insert(cell.to_lowercase()));
            non_empty && unique
        }
    }
}

fn into_records(rows: Vec<Vec<String>>) -> Table {
    let mut rows = rows.into_iter();
    let headers = rows.next().unwrap_or_default();

    let records = rows
        .map(|row| {
            let mut record = Record::new();
            for (i, header) in headers.iter().enumerate() {
                let value = row.get(i).cloned().unwrap_or_default();
                record.insert(header.clone(), Value::String(value));
            }
            record
        })
        .collect();

    Table::Records { headers, records }
}

/// Read a delimiter setting: one character, or the escape `\t` for tab.
pub fn parse_delimiter(value: &str) -> Result<char, String> {
    if value == "\\t" {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("delimiter must be a single character, got '{}'", value)),
    }
}

/// Write a table back as delimited text, one `\n`-terminated line per row.
///
/// Cells containing the delimiter, a quote or a line break are quoted, with
/// inner quotes doubled. Records are written under their header row.
pub fn to_delimited(table: &Table, delimiter: char) -> String {
    let mut out = String::new();

    match table {
        Table::Rows(rows) => {
            for row in rows {
                write_line(&mut out, row.iter().map(String::as_str), delimiter);
            }
        }
        Table::Records { headers, records } => {
            write_line(&mut out, headers.iter().map(String::as_str), delimiter);
            for record in records {
                let cells = headers
                    .iter()
                    .map(|h| record.get(h).and_then(Value::as_str).unwrap_or(""));
                write_line(&mut out, cells, delimiter);
            }
        }
    }

    out
}

fn write_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, delimiter: char) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(delimiter);
        }
        let needs_quotes = cell
            .chars()
            .any(|c| c == delimiter || c == QUOTE || c == '\n' || c == '\r');
        if needs_quotes {
            out.push(QUOTE);
            out.push_str(&cell.replace(QUOTE, "\"\""));
            out.push(QUOTE);
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(text: &str) -> Vec<Vec<String>> {
        split_rows(text, &TabularOptions::default())
    }

    #[test]
    fn test_header_auto_detected() {
        let table = parse("name,age\nAda,30\nAlan,28", &TabularOptions::default());
        let records = table.records().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], "Ada");
        assert_eq!(records[0]["age"], "30");
        assert_eq!(records[1]["name"], "Alan");
        assert_eq!(records[1]["age"], "28");
        assert_eq!(table.headers().unwrap(), ["name", "age"]);
    }

    #[test]
    fn test_auto_header_needs_a_data_row() {
        let table = parse("x,y\n1,2", &TabularOptions::default());
        assert!(table.records().is_some());

        // A lone row is never taken as a header
        let table = parse("x,y", &TabularOptions::default());
        assert_eq!(table, Table::Rows(vec![vec!["x".into(), "y".into()]]));
    }

    #[test]
    fn test_duplicate_header_cells_mean_no_header() {
        let table = parse("a,A\n1,2", &TabularOptions::default());
        assert_eq!(table.rows().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_header_cell_means_no_header() {
        let table = parse("a,,c\n1,2,3", &TabularOptions::default());
        assert!(table.rows().is_some());
    }

    #[test]
    fn test_explicit_header_modes() {
        let options = TabularOptions::default().with_header(HeaderMode::Absent);
        let table = parse("name,age\nAda,30", &options);
        assert_eq!(table.rows().unwrap()[0], ["name", "age"]);

        let options = TabularOptions::default().with_header(HeaderMode::Present);
        let table = parse("a,a\n1,2", &options);
        let records = table.records().unwrap();
        assert_eq!(records.len(), 1);
        // Later duplicate wins, first position kept
        assert_eq!(records[0]["a"], "2");
        assert_eq!(records[0].len(), 1);
    }

    #[test]
    fn test_missing_cells_default_to_empty() {
        let table = parse("a,b,c\n1\n1,2,3,4", &TabularOptions::default());
        let records = table.records().unwrap();

        assert_eq!(records[0]["a"], "1");
        assert_eq!(records[0]["b"], "");
        assert_eq!(records[0]["c"], "");
        assert_eq!(records[1].len(), 3);
        let keys: Vec<&String> = records[1].keys().collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_doubled_quote_unescaped() {
        assert_eq!(rows(r#"a,"b""c",d"#), vec![vec!["a", "b\"c", "d"]]);
    }

    #[test]
    fn test_quoted_delimiter_and_newline_are_literal() {
        assert_eq!(
            rows("\"x,y\",\"line1\nline2\"\nz,w"),
            vec![vec!["x,y", "line1\nline2"], vec!["z", "w"]]
        );
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        assert_eq!(rows("a,\"b,c\nd"), vec![vec!["a", "b,c\nd"]]);
    }

    #[test]
    fn test_quote_opens_mid_cell() {
        assert_eq!(rows("ab\"c,d\"e,f"), vec![vec!["abc,de", "f"]]);
    }

    #[test]
    fn test_crlf_and_lf_give_same_rows() {
        let samples = [
            "a,b\n1,2\n3,4",
            "a,b\n1,2\n3,4\n",
            "one\n\ntwo\n",
            "\"q\nx\",y\nz,w\n",
        ];
        for lf in samples {
            let crlf = lf.replace('\n', "\r\n");
            assert_eq!(rows(lf).len(), rows(&crlf).len(), "sample {:?}", lf);
        }
    }

    #[test]
    fn test_lone_cr_ends_row() {
        assert_eq!(rows("a\rb"), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn test_trailing_newline_dropped_but_inner_blank_kept() {
        assert_eq!(rows("a\n\nb\n"), vec![vec!["a"], vec![""], vec!["b"]]);
        assert!(rows("").is_empty());
        assert!(rows("\n").len() == 1);
    }

    #[test]
    fn test_trim_policy() {
        assert_eq!(rows("  a , \" b \" "), vec![vec!["a", "b"]]);

        let options = TabularOptions::default().with_trim(false);
        assert_eq!(split_rows(" a ,\" b \"", &options), vec![vec![" a ", " b "]]);
    }

    #[test]
    fn test_byte_order_mark_trimmed() {
        let table = parse("\u{feff}id,name\n1,Ada", &TabularOptions::default());
        assert_eq!(table.headers().unwrap(), ["id", "name"]);
    }

    #[test]
    fn test_custom_delimiter() {
        let options = TabularOptions::default().with_delimiter(';');
        let table = parse("a;b\n1,5;2", &options);
        assert_eq!(table.records().unwrap()[0]["a"], "1,5");

        let options = TabularOptions::default().with_delimiter('\t');
        assert_eq!(split_rows("a\tb", &options), vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_to_value_shapes() {
        let table = parse("1,2\n3,4", &TabularOptions::default().with_header(HeaderMode::Absent));
        assert_eq!(table.to_value(), serde_json::json!([["1", "2"], ["3", "4"]]));

        let table = parse("k,v\nx,y", &TabularOptions::default());
        assert_eq!(Value::from(table), serde_json::json!([{"k": "x", "v": "y"}]));
    }

    #[test]
    fn test_round_trip_through_delimited_text() {
        let text = "name,quote,note\nAda,\"said \"\"hi\"\"\",\"a,b\"\nAlan,plain,\"multi\nline\"\n";
        for delimiter in [',', ';', '|'] {
            let options = TabularOptions::default().with_delimiter(delimiter);
            let source = if delimiter == ',' { text.to_string() } else {
                to_delimited(&parse(text, &TabularOptions::default()), delimiter)
            };
            let table = parse(&source, &options);
            let again = parse(&to_delimited(&table, delimiter), &options);
            assert_eq!(table, again);
        }
    }

    #[test]
    fn test_header_mode_parsing() {
        assert_eq!(HeaderMode::from_attribute(None), HeaderMode::Auto);
        assert_eq!(HeaderMode::from_attribute(Some("true")), HeaderMode::Present);
        assert_eq!(HeaderMode::from_attribute(Some("TRUE")), HeaderMode::Absent);
        assert_eq!(HeaderMode::from_attribute(Some("auto")), HeaderMode::Auto);
        assert_eq!(HeaderMode::from_attribute(Some("no")), HeaderMode::Absent);
        assert_eq!("false".parse::<HeaderMode>(), Ok(HeaderMode::Absent));
        assert!("maybe".parse::<HeaderMode>().is_err());
    }

    #[test]
    fn test_delimiter_setting() {
        assert_eq!(parse_delimiter(";"), Ok(';'));
        assert_eq!(parse_delimiter("\\t"), Ok('\t'));
        assert_eq!(parse_delimiter("\t"), Ok('\t'));
        assert!(parse_delimiter("tab").is_err());
        assert!(parse_delimiter(";;").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn test_header_mode_names_agree() {
        for mode in [HeaderMode::Auto, HeaderMode::Present, HeaderMode::Absent] {
            let name = mode.to_string();
            assert_eq!(serde_json::to_value(mode).unwrap(), Value::String(name.clone()));
            assert_eq!(name.parse::<HeaderMode>(), Ok(mode));
            assert_eq!(HeaderMode::from_attribute(Some(&name)), mode);
        }
    }
}
