//! Tabular input: layout and data files read as raw string cells, from delimited
//! text or the first sheet of a spreadsheet workbook.

use std::fs;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use encoding_rs::{UTF_8, WINDOWS_1252};
use thiserror::Error;
use tracing::debug;

const DELIMITER_CANDIDATES: [u8; 4] = [b';', b',', b'\t', b'|'];
const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed table: {0}")]
    Csv(#[from] csv::Error),
    #[error("unreadable workbook {path}: {source}")]
    Spreadsheet {
        path: String,
        #[source]
        source: calamine::Error,
    },
    #[error("workbook {0} has no sheets")]
    NoSheet(String),
    #[error("table has no header row")]
    MissingHeader,
}

/// Header-indexed table of raw string cells.
///
/// Column names are normalized (BOM removed, trimmed, lower-cased). Every row has
/// exactly one cell per column; short rows are padded with empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from already-split cells. Column names are normalized.
    pub fn new<S: AsRef<str>>(columns: &[S], rows: Vec<Vec<String>>) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| normalize_column(c.as_ref())).collect();
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Parse delimited text, detecting the delimiter from the header line.
    pub fn parse(text: &str) -> Result<Self, TableError> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let delimiter = sniff_delimiter(text);
        let shown = char::from(delimiter).escape_default().to_string();
        debug!(delimiter = %shown, "detected delimiter");
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers = reader.headers()?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(TableError::MissingHeader);
        }
        let columns: Vec<&str> = headers.iter().collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(&columns, rows))
    }

    /// Read and parse a file. Spreadsheet workbooks (by extension) are read from their
    /// first sheet; anything else is delimited text, decoded as Windows-1252 when it is
    /// not valid UTF-8.
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        if is_spreadsheet(path) {
            return Self::from_workbook(path);
        }
        let bytes = fs::read(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&decode(&bytes))
    }

    /// First sheet of a workbook: first row is the header, every cell is read as text
    /// and empty cells become `""`.
    pub fn from_workbook(path: &Path) -> Result<Self, TableError> {
        let shown = path.display().to_string();
        let spreadsheet = |source: calamine::Error| TableError::Spreadsheet {
            path: shown.clone(),
            source,
        };
        let mut workbook = open_workbook_auto(path).map_err(spreadsheet)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| TableError::NoSheet(shown.clone()))?
            .map_err(spreadsheet)?;

        let mut rows = range.rows();
        let header: Vec<String> = rows
            .next()
            .map(|cells| cells.iter().map(cell_text).collect())
            .unwrap_or_default();
        if header.iter().all(|h| h.trim().is_empty()) {
            return Err(TableError::MissingHeader);
        }
        let rows: Vec<Vec<String>> = rows
            .map(|cells| cells.iter().map(cell_text).collect())
            .collect();
        debug!(path = %shown, rows = rows.len(), "read first worksheet");
        Ok(Self::new(header.as_slice(), rows))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by normalized name; the first match wins on duplicates.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = normalize_column(name);
        self.columns.iter().position(|c| *c == name)
    }

    /// Cell by row index and column name.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }
}

pub fn normalize_column(name: &str) -> String {
    name.replace('\u{feff}', "").trim().to_lowercase()
}

fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Spreadsheet cell as raw text. Whole numbers print without a fraction.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn decode(bytes: &[u8]) -> String {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    debug!("input is not valid UTF-8; decoding as windows-1252");
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Pick the candidate delimiter that occurs most often, outside quotes, in the
/// header line. Falls back to `,`.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut quoted = false;
    for b in header.bytes() {
        if b == b'"' {
            quoted = !quoted;
            continue;
        }
        if quoted {
            continue;
        }
        if let Some(i) = DELIMITER_CANDIDATES.iter().position(|d| *d == b) {
            counts[i] += 1;
        }
    }
    counts
        .iter()
        .enumerate()
        .filter(|(_, n)| **n > 0)
        .max_by_key(|(i, n)| (**n, std::cmp::Reverse(*i)))
        .map(|(i, _)| DELIMITER_CANDIDATES[i])
        .unwrap_or(b',')
}
