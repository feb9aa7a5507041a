//! CSV reader with encoding and delimiter auto-detection.
//!
//! Produces a [`RawTable`] with cells left as raw text. No migration-specific
//! logic here; interpretation happens in [`crate::analysis`].

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::error::{CsvError, CsvResult};
use crate::models::RawTable;

/// Result of parsing with metadata
#[derive(Debug, Clone, Serialize)]
pub struct ParseResult {
    pub table: RawTable,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
    /// Column headers, after de-duplication
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" | "latin-9" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding.
///
/// A leading byte order mark is dropped. Latin-1 is decoded as windows-1252,
/// its superset, as browsers do.
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    let codec = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => encoding_rs::UTF_8,
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252
        }
        "iso-8859-15" | "latin-9" => encoding_rs::ISO_8859_15,
        label => encoding_rs::Encoding::for_label(label.as_bytes())
            .ok_or_else(|| CsvError::UnsupportedEncoding(label.to_string()))?,
    };

    let (text, _) = codec.decode_with_bom_removal(bytes);
    Ok(text.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into a [`RawTable`] with an explicit delimiter.
///
/// Quoted fields are honoured, rows may be shorter or longer than the header
/// (missing trailing cells become null, extra cells are dropped) and rows
/// whose fields are all blank are skipped. Duplicate header names get a
/// `.1`, `.2`, ... suffix so every column keeps a unique identity.
///
/// # Example
/// ```ignore
/// use migrastat::parser::parse_table;
///
/// let table = parse_table("herkunftsgebiet_wegzugsgebiet;ukraine\n2022_ Zuzug;1478", ';')?;
/// assert_eq!(table.cell(0, 1), Some("1478"));
/// ```
pub fn parse_table(content: &str, delimiter: char) -> CsvResult<RawTable> {
    if !delimiter.is_ascii() {
        return Err(CsvError::InvalidDelimiter(delimiter));
    }
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let raw_headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_matches('\u{feff}').to_string())
        .collect();

    if raw_headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut table = RawTable::new(dedupe_headers(raw_headers));

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        table.push_row(record.iter().map(|field| Some(field.to_string())).collect());
    }

    Ok(table)
}

/// Rename repeated headers the way spreadsheet tools do: `a`, `a.1`, `a.2`.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .into_iter()
        .map(|header| {
            let count = seen.entry(header.clone()).or_insert(0);
            let name = if *count == 0 {
                header
            } else {
                format!("{}.{}", header, count)
            };
            *count += 1;
            name
        })
        .collect()
}

/// Parse CSV text with an explicit delimiter and return metadata.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> CsvResult<ParseResult> {
    let table = parse_table(content, delimiter)?;
    let headers = table.headers().to_vec();

    Ok(ParseResult {
        table,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);

    // chardet occasionally names charsets encoding_rs has no label for
    let (content, encoding) = match decode_content(bytes, &encoding) {
        Ok(content) => (content, encoding),
        Err(_) => (decode_content(bytes, "utf-8")?, "utf-8".to_string()),
    };

    let delimiter = detect_delimiter(&content);
    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse CSV file with auto-detection of encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_file_auto("data/raw/Aussenwanderung_2010-2023.csv")?;
/// println!("Encoding: {}, Delimiter: '{}'", result.encoding, result.delimiter);
/// println!("Rows: {}", result.table.len());
/// ```
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Parse CSV file with auto-detected encoding and an explicit delimiter.
pub fn parse_file<P: AsRef<Path>>(path: P, delimiter: char) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    let encoding = detect_encoding(&bytes);
    let content = decode_content(&bytes, &encoding)?;
    parse_string_with_metadata(&content, delimiter, encoding)
}
