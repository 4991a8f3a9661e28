//! CSV driver for [`Interpreter`]s.
//!
//! Tokenizing is left to the `csv` crate; this module only feeds its records, header
//! first, into an interpreter. The reader is flexible about row widths so that width
//! problems reach the interpreter as row errors instead of aborting the read.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ReadError, ReadResult};
use crate::extractor::Interpreter;

/// Options for driving an interpreter from CSV input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Field delimiter. Detected from the first line when unset.
    pub delimiter: Option<char>,
    /// Input encoding. Detected when unset.
    pub encoding: Option<String>,
    /// Trim whitespace around every cell.
    pub trim: bool,
}

/// What a driven read used and how many rows it fed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadSummary {
    pub encoding: String,
    pub delimiter: char,
    /// Rows handed to the interpreter, header included.
    pub rows: usize,
}

/// Detect the encoding of raw bytes.
///
/// Falls back to UTF-8 when the detected charset has no decoder.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _confidence, _language) = chardet::detect(bytes);

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "iso-8859-15" | "latin-9" | "latin9" => "iso-8859-15".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other if encoding_rs::Encoding::for_label(other.as_bytes()).is_some() => charset,
        other => {
            debug!(charset = other, "no decoder for detected charset, assuming utf-8");
            "utf-8".to_string()
        }
    }
}

/// Decode bytes with the named encoding.
///
/// A UTF-8 byte-order mark is kept; the extractor strips it from header cells.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ReadResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
        // WHATWG maps the Latin-1 labels onto windows-1252, a superset of ISO-8859-1's
        // printable range.
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned()
        }
        "iso-8859-15" | "latin-9" | "latin9" => {
            encoding_rs::ISO_8859_15.decode_without_bom_handling(bytes).0.into_owned()
        }
        other => {
            let codec = encoding_rs::Encoding::for_label(other.as_bytes()).ok_or_else(|| {
                ReadError::EncodingError(format!("Unsupported encoding: {encoding}"))
            })?;
            codec.decode_without_bom_handling(bytes).0.into_owned()
        }
    };
    Ok(decoded)
}

/// Pick the separator that occurs most often on the first line. Defaults to `,`.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = (',', 0);
    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best.1 {
            best = (sep, count);
        }
    }
    best.0
}

/// Feed every CSV record from `reader` into `interpreter`.
///
/// Returns the number of rows fed, header included.
pub fn interpret_reader<R, I>(
    reader: R,
    delimiter: u8,
    trim: bool,
    interpreter: &mut I,
) -> ReadResult<usize>
where
    R: Read,
    I: Interpreter,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .trim(if trim { csv::Trim::All } else { csv::Trim::None })
        .from_reader(reader);

    let mut count = 0;
    for result in csv_reader.records() {
        let record = result?;
        let cells: Vec<&str> = record.iter().collect();
        interpreter.interpret(&cells)?;
        count += 1;
    }
    debug!(rows = count, "csv input exhausted");
    Ok(count)
}

/// Decode `bytes` and feed them into `interpreter`, detecting what `options` leaves unset.
pub fn interpret_bytes<I: Interpreter>(
    bytes: &[u8],
    options: &ReaderOptions,
    interpreter: &mut I,
) -> ReadResult<ReadSummary> {
    let encoding = options
        .encoding
        .clone()
        .unwrap_or_else(|| detect_encoding(bytes));
    let content = decode_content(bytes, &encoding)?;
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| detect_delimiter(content.trim_start_matches('\u{feff}')));

    if !delimiter.is_ascii() {
        return Err(ReadError::EncodingError(format!(
            "Delimiter '{delimiter}' is not an ASCII character"
        )));
    }

    let rows = interpret_reader(content.as_bytes(), delimiter as u8, options.trim, interpreter)?;
    info!(%encoding, ?delimiter, rows, "interpreted csv input");

    Ok(ReadSummary {
        encoding,
        delimiter,
        rows,
    })
}

/// Read a file and feed it into `interpreter`.
pub fn interpret_path<P, I>(
    path: P,
    options: &ReaderOptions,
    interpreter: &mut I,
) -> ReadResult<ReadSummary>
where
    P: AsRef<Path>,
    I: Interpreter,
{
    let bytes = std::fs::read(path.as_ref())?;
    interpret_bytes(&bytes, options, interpreter)
}
