use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::output::OutputFile;

/// Summary of a successful conversion, written next to the output on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub generated_at: DateTime<Utc>,
    pub layout: String,
    pub input: String,
    pub encoding: String,
    pub fields: usize,
    pub record_width: usize,
    pub records: usize,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: String,
    pub records: usize,
    pub bytes: usize,
    pub sha256: String,
}

impl FileReport {
    pub fn from_output(file: &OutputFile) -> Self {
        Self {
            path: file.path.display().to_string(),
            records: file.records,
            bytes: file.bytes.len(),
            sha256: sha256_hex(&file.bytes),
        }
    }
}

/// Lower-case hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn digest_is_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_report_counts_bytes() {
        let file = OutputFile {
            path: PathBuf::from("saida.txt"),
            records: 2,
            bytes: b"ab\ncd".to_vec(),
        };
        let report = FileReport::from_output(&file);
        assert_eq!(report.path, "saida.txt");
        assert_eq!(report.bytes, 5);
        assert_eq!(report.sha256.len(), 64);
    }
}
