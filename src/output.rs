//! Writing encoded records to disk in a legacy single-byte encoding.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::{ConversionError, Finding, Stage};
use crate::layout::LayoutSchema;

pub const DEFAULT_ENCODING: &str = "windows-1252";
pub const SAMPLE_FILE_NAME: &str = "layout.csv";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("unknown output encoding '{0}'")]
    UnknownEncoding(String),
    #[error("output encoding '{0}' is not a single-byte encoding")]
    NotSingleByte(String),
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Single-byte text encoding used for output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputEncoding(&'static Encoding);

impl OutputEncoding {
    pub fn for_label(label: &str) -> Result<Self, OutputError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| OutputError::UnknownEncoding(label.to_string()))?;
        if !encoding.is_single_byte() {
            return Err(OutputError::NotSingleByte(label.to_string()));
        }
        Ok(Self(encoding))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Join records with `\n` (no trailing newline) and encode them.
    ///
    /// Every character the encoding cannot represent is reported, once per record.
    pub fn encode_records(&self, records: &[String]) -> Result<Vec<u8>, ConversionError> {
        let mut findings = Vec::new();
        let mut bytes = Vec::new();
        for (idx, record) in records.iter().enumerate() {
            if idx > 0 {
                bytes.push(b'\n');
            }
            let (encoded, _, had_errors) = self.0.encode(record);
            if had_errors {
                let mut reported: Vec<char> = Vec::new();
                for ch in record.chars() {
                    if !reported.contains(&ch) && !self.can_encode(ch) {
                        reported.push(ch);
                        findings.push(Finding::Unencodable {
                            record: idx + 1,
                            ch,
                            encoding: self.name(),
                        });
                    }
                }
            }
            bytes.extend_from_slice(&encoded);
        }
        ConversionError::check(Stage::Output, findings)?;
        Ok(bytes)
    }

    fn can_encode(&self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        !self.0.encode(ch.encode_utf8(&mut buf)).2
    }
}

impl Default for OutputEncoding {
    fn default() -> Self {
        Self(encoding_rs::WINDOWS_1252)
    }
}

/// One file ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub records: usize,
    pub bytes: Vec<u8>,
}

/// Encode records into one file, or into numbered files of at most
/// `records_per_file` records each (`saida_001.txt`, `saida_002.txt`, ...).
/// Writing to `-` never splits.
pub fn plan_output(
    records: &[String],
    encoding: OutputEncoding,
    path: &Path,
    records_per_file: Option<usize>,
) -> Result<Vec<OutputFile>, ConversionError> {
    let chunk = match records_per_file {
        Some(n) if n > 0 && records.len() > n && !is_stdout(path) => n,
        _ => {
            return Ok(vec![OutputFile {
                path: path.to_path_buf(),
                records: records.len(),
                bytes: encoding.encode_records(records)?,
            }]);
        }
    };

    let mut files = Vec::new();
    let mut findings = Vec::new();
    for (part, slice) in records.chunks(chunk).enumerate() {
        match encoding.encode_records(slice) {
            Ok(bytes) => files.push(OutputFile {
                path: part_path(path, part + 1),
                records: slice.len(),
                bytes,
            }),
            Err(err) => findings.extend(err.findings.into_iter().map(|f| match f {
                Finding::Unencodable {
                    record,
                    ch,
                    encoding,
                } => Finding::Unencodable {
                    record: record + part * chunk,
                    ch,
                    encoding,
                },
                other => other,
            })),
        }
    }
    ConversionError::check(Stage::Output, findings)?;
    Ok(files)
}

/// Write planned files; `-` goes to stdout.
///
/// Every part is first written to a hidden sibling and renamed into place only after
/// all parts are on disk. When any step fails, no output file is left behind.
pub fn write_files(files: &[OutputFile]) -> Result<(), OutputError> {
    let mut staged: Vec<(PathBuf, &OutputFile)> = Vec::with_capacity(files.len());
    for file in files {
        if is_stdout(&file.path) {
            io::stdout()
                .write_all(&file.bytes)
                .map_err(|source| io_error(&file.path, source))?;
            continue;
        }
        let temp = staging_path(&file.path);
        if let Err(source) = fs::write(&temp, &file.bytes) {
            discard(staged.iter().map(|(temp, _)| temp.as_path()));
            discard(std::iter::once(temp.as_path()));
            return Err(io_error(&file.path, source));
        }
        staged.push((temp, file));
    }

    for (idx, (temp, file)) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(temp, &file.path) {
            discard(staged[..idx].iter().map(|(_, done)| done.path.as_path()));
            discard(staged[idx..].iter().map(|(temp, _)| temp.as_path()));
            return Err(io_error(&file.path, source));
        }
    }
    for (_, file) in &staged {
        info!(path = %file.path.display(), records = file.records, "output written");
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.partial"))
}

/// Best-effort removal of files from an aborted write.
fn discard<'a>(paths: impl Iterator<Item = &'a Path>) {
    for path in paths {
        match fs::remove_file(path) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => {
                warn!(path = %path.display(), error = %err, "failed to remove partial output");
            }
            _ => {}
        }
    }
}

/// Write an empty layout (header row only, UTF-8 with BOM) into `dir`.
pub fn write_sample_layout(
    dir: &Path,
    schema: LayoutSchema,
    delimiter: char,
) -> Result<PathBuf, OutputError> {
    let path = dir.join(SAMPLE_FILE_NAME);
    let content = format!("\u{feff}{}\n", schema.sample_header(delimiter));
    fs::write(&path, content).map_err(|source| io_error(&path, source))?;
    Ok(path)
}

fn part_path(path: &Path, part: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}_{part:03}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{part:03}"),
    };
    path.with_file_name(name)
}

/// Whether a path argument means stdout.
pub fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn io_error(path: &Path, source: io::Error) -> OutputError {
    OutputError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn records(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn joins_without_trailing_newline() {
        let bytes = OutputEncoding::default()
            .encode_records(&records(&["AÇÃO", "b"]))
            .unwrap();
        assert_eq!(bytes, b"A\xc7\xc3O\nb".to_vec());
        assert!(
            OutputEncoding::default()
                .encode_records(&[])
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn reports_every_unencodable_character() {
        let err = OutputEncoding::default()
            .encode_records(&records(&["ok", "\u{0151}\u{0151}x\u{4e2d}", "fine"]))
            .unwrap_err();
        assert_eq!(err.stage, Stage::Output);
        let chars: Vec<(Option<usize>, String)> = err
            .findings
            .iter()
            .map(|f| (f.row(), f.to_string()))
            .collect();
        assert_eq!(chars.len(), 2);
        assert_eq!(chars[0].0, Some(2));
        assert!(chars[1].1.contains("U+4E2D"));
    }

    #[test]
    fn labels_must_be_single_byte() {
        assert_eq!(
            OutputEncoding::for_label("latin1").unwrap().name(),
            "windows-1252"
        );
        assert!(matches!(
            OutputEncoding::for_label("utf-8"),
            Err(OutputError::NotSingleByte(_))
        ));
        assert!(matches!(
            OutputEncoding::for_label("klingon"),
            Err(OutputError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn splits_into_numbered_files() {
        let lines = records(&["1", "2", "3", "4", "5"]);
        let files = plan_output(
            &lines,
            OutputEncoding::default(),
            Path::new("out/saida.txt"),
            Some(2),
        )
        .unwrap();
        let summary: Vec<(PathBuf, usize, Vec<u8>)> = files
            .into_iter()
            .map(|f| (f.path, f.records, f.bytes))
            .collect();
        assert_eq!(
            summary,
            vec![
                (PathBuf::from("out/saida_001.txt"), 2, b"1\n2".to_vec()),
                (PathBuf::from("out/saida_002.txt"), 2, b"3\n4".to_vec()),
                (PathBuf::from("out/saida_003.txt"), 1, b"5".to_vec()),
            ]
        );

        let single = plan_output(&lines, OutputEncoding::default(), Path::new("saida"), Some(10))
            .unwrap();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].path, PathBuf::from("saida"));
    }

    #[test]
    fn split_findings_use_global_record_numbers() {
        let lines = records(&["a", "b", "c\u{0151}"]);
        let err = plan_output(&lines, OutputEncoding::default(), Path::new("s.txt"), Some(2))
            .unwrap_err();
        assert_eq!(err.findings[0].row(), Some(3));
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn split_files_are_written_together() {
        let dir = tempfile::tempdir().unwrap();
        let lines = records(&["1", "2", "3"]);
        let files = plan_output(
            &lines,
            OutputEncoding::default(),
            &dir.path().join("saida.txt"),
            Some(2),
        )
        .unwrap();
        write_files(&files).unwrap();
        assert_eq!(dir_entries(dir.path()), vec!["saida_001.txt", "saida_002.txt"]);
        assert_eq!(fs::read(dir.path().join("saida_002.txt")).unwrap(), b"3".to_vec());
    }

    #[test]
    fn failed_part_leaves_no_output_behind() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("saida_002.txt")).unwrap();
        let lines = records(&["1", "2", "3"]);
        let files = plan_output(
            &lines,
            OutputEncoding::default(),
            &dir.path().join("saida.txt"),
            Some(1),
        )
        .unwrap();

        let err = write_files(&files).unwrap_err();
        assert!(err.to_string().contains("saida_002.txt"));
        assert_eq!(dir_entries(dir.path()), vec!["saida_002.txt"]);
    }

    #[test]
    fn dash_means_stdout() {
        assert!(is_stdout(Path::new("-")));
        assert!(!is_stdout(Path::new("./-")));
    }

    #[test]
    fn sample_layout_has_bom_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample_layout(dir.path(), LayoutSchema::Current, ',').unwrap();
        assert_eq!(path.file_name().unwrap(), SAMPLE_FILE_NAME);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("\u{feff}Campo,Tamanho,Decimais"));
        assert!(content.ends_with("Anular\n"));
    }
}
