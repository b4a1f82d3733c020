use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::models::RawTable;

pub(crate) const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings tried by the robust reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    Utf8,
    Latin1,
    Windows1252,
}

impl TextEncoding {
    /// Decode the whole buffer, or `None` if the bytes are not valid in this encoding
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            TextEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_owned)
            }
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            TextEncoding::Windows1252 => {
                let (text, had_errors) =
                    encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
                (!had_errors).then(|| text.into_owned())
            }
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Windows1252 => "cp1252",
        };
        f.write_str(name)
    }
}

/// Field delimiters tried by the robust reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_byte(&self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Tab => f.write_str("\\t"),
            other => write!(f, "{}", other.as_byte() as char),
        }
    }
}

/// Configuration for encoding/delimiter detection
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Encodings in priority order (outer loop)
    pub encodings: Vec<TextEncoding>,
    /// Delimiters in priority order (inner loop)
    pub delimiters: Vec<Delimiter>,
    /// Data rows parsed by the trial read after the header
    pub trial_rows: usize,
    /// Cell values read as null, besides empty and whitespace-only cells
    pub null_markers: Vec<String>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            encodings: vec![
                TextEncoding::Utf8,
                TextEncoding::Latin1,
                TextEncoding::Windows1252,
            ],
            delimiters: vec![Delimiter::Comma, Delimiter::Semicolon, Delimiter::Tab],
            trial_rows: 2,
            null_markers: [
                "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
                "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// A table together with the encoding and delimiter that produced it
#[derive(Debug, Clone)]
pub struct DetectedTable {
    pub table: RawTable,
    pub encoding: TextEncoding,
    pub delimiter: Delimiter,
}

/// Read a delimited file whose encoding and delimiter are unknown
///
/// Only failing to read the bytes is an error. When no encoding/delimiter
/// pair splits the header into more than one column the result is `Ok(None)`,
/// so a genuine single-column file cannot be told apart from a parse failure.
pub fn read_table_robust(path: &Path, config: &ReaderConfig) -> Result<Option<DetectedTable>> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    Ok(detect_table(&bytes, config))
}

/// Try every (encoding, delimiter) pair in priority order and keep the first
/// whose trial parse yields more than one column
pub fn detect_table(bytes: &[u8], config: &ReaderConfig) -> Option<DetectedTable> {
    for &encoding in &config.encodings {
        let Some(text) = encoding.decode(bytes) else {
            debug!("Bytes are not valid {}", encoding);
            continue;
        };

        for &delimiter in &config.delimiters {
            match trial_parse(&text, delimiter, config.trial_rows) {
                Some(columns) if columns > 1 => {}
                Some(columns) => {
                    debug!(
                        "{} / '{}' gave {} column(s), trying next",
                        encoding, delimiter, columns
                    );
                    continue;
                }
                None => {
                    debug!("{} / '{}' failed the trial parse", encoding, delimiter);
                    continue;
                }
            }

            match parse_table(&text, delimiter, &config.null_markers) {
                Ok(table) => {
                    return Some(DetectedTable {
                        table,
                        encoding,
                        delimiter,
                    });
                }
                Err(e) => {
                    debug!("{} / '{}' failed the full parse: {}", encoding, delimiter, e);
                }
            }
        }
    }

    None
}

fn csv_reader(text: &str, delimiter: Delimiter) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Parse the header and the first few rows; returns the header width
///
/// Text that ends inside an open quoted field fails here, since the csv
/// reader would otherwise fold every following line into that one cell.
fn trial_parse(text: &str, delimiter: Delimiter, trial_rows: usize) -> Option<usize> {
    if ends_inside_quotes(text, delimiter) {
        return None;
    }

    let mut reader = csv_reader(text, delimiter);
    let columns = reader.headers().ok()?.len();
    for record in reader.records().take(trial_rows) {
        record.ok()?;
    }
    Some(columns)
}

/// Whether a quoted field is still open at end of text
///
/// Follows the csv reader's quoting: a quote opens a field only at field
/// start, `""` inside it is an escaped quote, and anywhere else a quote is
/// literal.
fn ends_inside_quotes(text: &str, delimiter: Delimiter) -> bool {
    let delimiter = delimiter.as_byte();
    let mut bytes = text.bytes().peekable();
    let mut field_start = true;
    let mut in_quotes = false;

    while let Some(b) = bytes.next() {
        if in_quotes {
            if b == b'"' {
                if bytes.peek() == Some(&b'"') {
                    bytes.next();
                } else {
                    in_quotes = false;
                }
            }
        } else if b == delimiter || b == b'\n' || b == b'\r' {
            field_start = true;
        } else {
            in_quotes = field_start && b == b'"';
            field_start = false;
        }
    }

    in_quotes
}

/// Parse the full text into a raw table
pub fn parse_table(
    text: &str,
    delimiter: Delimiter,
    null_markers: &[String],
) -> std::result::Result<RawTable, csv::Error> {
    let mut reader = csv_reader(text, delimiter);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = RawTable::new(headers);

    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|value| to_cell(value, null_markers))
            .collect();
        table.push_row(row);
    }

    Ok(table)
}

fn to_cell(value: &str, null_markers: &[String]) -> Option<String> {
    if value.trim().is_empty() || null_markers.iter().any(|m| m == value) {
        None
    } else {
        Some(value.to_string())
    }
}
