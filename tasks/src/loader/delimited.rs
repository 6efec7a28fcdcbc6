//! CSV loading with gzip, encoding and delimiter auto-detection.
//!
//! The file is first tried as gzip-compressed CSV. When it doesn't
//! decompress, the raw bytes are read as plain CSV, so callers never need to
//! know the compression state up front. Parse errors in content that did
//! decompress are reported as they are.

use flate2::read::MultiGzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;

use super::{dedupe_headers, ensure_not_empty, file_name, header_or_unnamed, is_na_token, LoadOptions};
use crate::error::{LoadError, LoadResult};
use crate::logs::Logger;
use crate::models::{Column, Table, Value};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Why a byte buffer did not turn into a table.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    /// No header line at all.
    EmptyData,
    /// Malformed CSV.
    Structural(String),
    /// Bytes not valid in the requested encoding.
    Encoding(String),
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the given encoding label.
///
/// Unknown labels coming from detection fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str, strict: bool) -> Result<String, ParseFailure> {
    let label = encoding.to_lowercase();
    match label.as_str() {
        "utf-8" | "utf8" | "ascii" => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            match std::str::from_utf8(bytes) {
                Ok(s) => Ok(s.to_string()),
                Err(e) if strict => Err(ParseFailure::Encoding(e.to_string())),
                Err(_) => Ok(String::from_utf8_lossy(bytes).into_owned()),
            }
        }
        // latin1 labels decode as windows-1252, as in the WHATWG encoding table
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned())
        }
        _ => match encoding_rs::Encoding::for_label(label.as_bytes()) {
            Some(enc) => Ok(enc.decode(bytes).0.into_owned()),
            None if strict => Err(ParseFailure::Encoding(format!("unknown encoding '{}'", encoding))),
            None => Ok(String::from_utf8_lossy(bytes).into_owned()),
        },
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// Falls back to a comma when no candidate appears.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
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

/// Decompress gzip bytes, or `None` when the buffer isn't valid gzip.
fn gunzip(bytes: &[u8]) -> Option<Vec<u8>> {
    if !bytes.starts_with(&GZIP_MAGIC) {
        return None;
    }
    let mut out = Vec::new();
    MultiGzDecoder::new(bytes).read_to_end(&mut out).ok()?;
    Some(out)
}

/// Parse CSV bytes into a table.
pub fn parse_bytes(bytes: &[u8], options: &LoadOptions) -> Result<Table, ParseFailure> {
    let content = match &options.encoding {
        Some(enc) => decode_content(bytes, enc, true)?,
        None => decode_content(bytes, &detect_encoding(bytes), false)?,
    };
    parse_str(&content, options.delimiter)
}

/// Parse CSV text into a table, detecting the delimiter when none is given.
pub fn parse_str(content: &str, delimiter: Option<char>) -> Result<Table, ParseFailure> {
    if content.trim().is_empty() {
        return Err(ParseFailure::EmptyData);
    }

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(content));
    if !delimiter.is_ascii() {
        return Err(ParseFailure::Structural(format!(
            "delimiter '{}' must be a single-byte character",
            delimiter
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| ParseFailure::Structural(e.to_string()))?;

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let Some(width) = headers.as_ref().map(Vec::len) else {
            headers = Some(dedupe_headers(
                record
                    .iter()
                    .enumerate()
                    .map(|(i, name)| header_or_unnamed(i, name))
                    .collect(),
            ));
            continue;
        };

        if record.len() > width {
            let line = record.position().map_or(0, |p| p.line());
            return Err(ParseFailure::Structural(format!(
                "Error tokenizing data. Expected {} fields in line {}, saw {}",
                width,
                line,
                record.len()
            )));
        }

        raw_rows.push(
            record
                .iter()
                .map(|f| if is_na_token(f) { None } else { Some(f.to_string()) })
                .collect(),
        );
    }

    let headers = headers.ok_or(ParseFailure::EmptyData)?;

    let columns = headers
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let raw: Vec<Option<&str>> = raw_rows
                .iter()
                .map(|row| row.get(i).and_then(|v| v.as_deref()))
                .collect();
            Column::new(name, infer_column(&raw))
        })
        .collect();

    Ok(Table::new(columns))
}

/// Type a column: all integers, else all numbers, else all booleans, else text.
fn infer_column(raw: &[Option<&str>]) -> Vec<Value> {
    let present = || raw.iter().flatten();

    if present().all(|s| s.trim().parse::<i64>().is_ok()) {
        return raw
            .iter()
            .map(|v| v.and_then(|s| s.trim().parse().ok()).map_or(Value::Null, Value::Int))
            .collect();
    }

    if present().all(|s| s.trim().parse::<f64>().is_ok()) {
        return raw
            .iter()
            .map(|v| v.and_then(|s| s.trim().parse().ok()).map_or(Value::Null, Value::Float))
            .collect();
    }

    if present().all(|s| parse_bool(s).is_some()) {
        return raw
            .iter()
            .map(|v| v.and_then(parse_bool).map_or(Value::Null, Value::Bool))
            .collect();
    }

    raw.iter()
        .map(|v| v.map_or(Value::Null, |s| Value::Text(s.to_string())))
        .collect()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Load a CSV whether it's gzipped or not.
pub fn load_csv(path: &Path, options: &LoadOptions, log: &dyn Logger) -> LoadResult<Table> {
    let file = file_name(path);
    let bytes = fs::read(path).map_err(|source| LoadError::Io { file: file.clone(), source })?;

    let parsed = match gunzip(&bytes) {
        Some(decompressed) => parse_bytes(&decompressed, options),
        None => parse_bytes(&bytes, options),
    };

    let table = match parsed {
        Ok(table) => table,
        Err(ParseFailure::EmptyData) => {
            log.error(&format!("File appears to be empty: {}.", file));
            return Err(LoadError::EmptyData { file });
        }
        Err(ParseFailure::Structural(message)) => {
            log.error(&format!("Could not parse {}: {}", file, message));
            return Err(LoadError::Parse { file, message });
        }
        Err(ParseFailure::Encoding(message)) => {
            log.error(&format!("Could not decode {}: {}", file, message));
            return Err(LoadError::Encoding { file, message });
        }
    };

    ensure_not_empty(table, &file, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Reason;
    use crate::logs::{LogLevel, MemoryLogger};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    fn gzip(content: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_simple_csv() {
        let table = parse_str("id,name\n1,Alice\n2,Bob", None).unwrap();

        assert_eq!(table.height(), 2);
        assert_eq!(table.value(0, 0), &Value::Int(1));
        assert_eq!(table.value(1, 1), &Value::Text("Bob".into()));
    }

    #[test]
    fn test_semicolon_detected() {
        let table = parse_str("a;b;c\n1;2;3", None).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_quoted_values() {
        let table = parse_str("name,value\n\"Doe, Jane\",\"Hello World\"", Some(',')).unwrap();
        assert_eq!(table.value(0, 0), &Value::Text("Doe, Jane".into()));
        assert_eq!(table.value(0, 1), &Value::Text("Hello World".into()));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let table = parse_str("a,b\n1,2\n\n3,4\n", None).unwrap();
        assert_eq!(table.height(), 2);
    }

    #[test]
    fn test_missing_values() {
        let table = parse_str("a,b,c\n1,,3\n4,NA,6", None).unwrap();
        assert_eq!(table.value(0, 1), &Value::Null);
        assert_eq!(table.value(1, 1), &Value::Null);
        assert_eq!(table.value(1, 2), &Value::Int(6));
    }

    #[test]
    fn test_short_rows_padded() {
        let table = parse_str("a,b,c\n1,2", None).unwrap();
        assert_eq!(table.value(0, 2), &Value::Null);
    }

    #[test]
    fn test_too_many_fields_is_structural() {
        let err = parse_str("a,b\n1,2,3", None).unwrap_err();
        assert!(matches!(err, ParseFailure::Structural(m) if m.contains("Expected 2 fields")));
    }

    #[test]
    fn test_type_inference() {
        let table = parse_str("i,f,b,t\n1,1.5,true,x\n2,2,False,3", None).unwrap();
        assert_eq!(table.value(1, 0), &Value::Int(2));
        assert_eq!(table.value(1, 1), &Value::Float(2.0));
        assert_eq!(table.value(1, 2), &Value::Bool(false));
        assert_eq!(table.value(1, 3), &Value::Text("3".into()));
    }

    #[test]
    fn test_blank_content_is_empty_data() {
        assert_eq!(parse_str("", None).unwrap_err(), ParseFailure::EmptyData);
        assert_eq!(parse_str("\n\n", None).unwrap_err(), ParseFailure::EmptyData);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1", true).unwrap();
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_latin1_currency_sign() {
        let decoded = decode_content(&[0x31, 0xA4], "latin1", true).unwrap();
        assert_eq!(decoded, "1\u{a4}");
    }

    #[test]
    fn test_blank_headers_named_by_position() {
        let table = parse_str("id,,name,\n1,2,A,3\n", None).unwrap();
        assert_eq!(table.column_names(), vec!["id", "Unnamed: 1", "name", "Unnamed: 3"]);
    }

    #[test]
    fn test_unknown_explicit_encoding_fails() {
        let err = decode_content(b"a,b", "klingon", true).unwrap_err();
        assert!(matches!(err, ParseFailure::Encoding(_)));
    }

    #[test]
    fn test_gzip_matches_plain() {
        let dir = tempdir().unwrap();
        let content = "id,name,score\n1,A,10.5\n2,B,\n3,C,7\n";
        let plain = dir.path().join("scores.csv");
        let packed = dir.path().join("scores.csv.gz");
        fs::write(&plain, content).unwrap();
        fs::write(&packed, gzip(content)).unwrap();

        let log = MemoryLogger::new();
        let a = load_csv(&plain, &LoadOptions::default(), &log).unwrap();
        let b = load_csv(&packed, &LoadOptions::default(), &log).unwrap();

        assert_eq!(a, b);
        assert!(log.messages(LogLevel::Error).is_empty());
    }

    #[test]
    fn test_zero_byte_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, "").unwrap();

        let log = MemoryLogger::new();
        let err = load_csv(&path, &LoadOptions::default(), &log).unwrap_err();

        assert!(matches!(err, LoadError::EmptyData { .. }));
        assert_eq!(err.reason(), Reason::EmptyFile);
        assert_eq!(log.messages(LogLevel::Error), vec!["File appears to be empty: empty.csv."]);
    }

    #[test]
    fn test_header_only_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("header.csv");
        fs::write(&path, "id,name\n").unwrap();

        let log = MemoryLogger::new();
        let err = load_csv(&path, &LoadOptions::default(), &log).unwrap_err();

        assert!(matches!(err, LoadError::Validation(_)));
        assert_eq!(err.to_string(), "File appears to be empty: header.csv.");
        assert_eq!(log.messages(LogLevel::Error).len(), 1);
    }

    #[test]
    fn test_gzipped_header_only_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("header.csv.gz");
        fs::write(&path, gzip("id,name\n")).unwrap();

        let err = load_csv(&path, &LoadOptions::default(), &MemoryLogger::new()).unwrap_err();
        assert_eq!(err.reason(), Reason::EmptyFile);
    }

    #[test]
    fn test_gzipped_ragged_rows_are_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ragged.csv.gz");

        for content in ["a,b\n1,2\n3,4,5\n", "id,name\n1,A\n2,B,C\n3,D\n"] {
            fs::write(&path, gzip(content)).unwrap();

            let log = MemoryLogger::new();
            let err = load_csv(&path, &LoadOptions::default(), &log).unwrap_err();

            assert!(matches!(err, LoadError::Parse { .. }));
            assert_eq!(err.reason(), Reason::ParseError);
            assert!(err.to_string().contains("ragged.csv.gz"));
            assert!(err.to_string().contains("Expected 2 fields"));
            let errors = log.messages(LogLevel::Error);
            assert_eq!(errors.len(), 1);
            assert!(errors[0].starts_with("Could not parse ragged.csv.gz"));
        }
    }

    #[test]
    fn test_missing_file_is_io() {
        let dir = tempdir().unwrap();
        let err = load_csv(&dir.path().join("nope.csv"), &LoadOptions::default(), &MemoryLogger::new())
            .unwrap_err();
        assert_eq!(err.reason(), Reason::Io);
        assert!(err.to_string().contains("nope.csv"));
    }

    #[test]
    fn test_parse_error_reported_with_file_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        fs::write(&path, "a,b\n1,2\n1,2,3\n").unwrap();

        let log = MemoryLogger::new();
        let err = load_csv(&path, &LoadOptions::default(), &log).unwrap_err();

        assert_eq!(err.reason(), Reason::ParseError);
        assert!(err.to_string().contains("ragged.csv"));
        assert_eq!(log.messages(LogLevel::Error).len(), 1);
    }
}
