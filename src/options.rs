use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::layout::LayoutSchema;
use crate::output::DEFAULT_ENCODING;

/// Settings for a conversion run. Loadable from a JSON file; missing keys take
/// their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertOptions {
    /// Column set the layout file must declare.
    pub schema: LayoutSchema,
    /// Output encoding label; must name a single-byte encoding.
    pub encoding: String,
    /// Split output into files of at most this many records.
    pub records_per_file: Option<usize>,
    /// Encode rows on the rayon thread pool.
    pub parallel: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            schema: LayoutSchema::Current,
            encoding: DEFAULT_ENCODING.to_string(),
            records_per_file: None,
            parallel: true,
        }
    }
}

impl ConvertOptions {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_config_keeps_defaults() {
        let options: ConvertOptions =
            serde_json::from_str(r#"{ "schema": "legacy", "records_per_file": 500 }"#).unwrap();
        assert_eq!(
            options,
            ConvertOptions {
                schema: LayoutSchema::Legacy,
                records_per_file: Some(500),
                ..ConvertOptions::default()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<ConvertOptions>(r#"{ "schemma": "legacy" }"#).is_err());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posrec.json");
        fs::write(&path, r#"{ "encoding": "iso-8859-15", "parallel": false }"#).unwrap();
        let options = ConvertOptions::load(&path).unwrap();
        assert_eq!(options.encoding, "iso-8859-15");
        assert!(!options.parallel);
        assert!(ConvertOptions::load(&dir.path().join("missing.json")).is_err());
    }
}
