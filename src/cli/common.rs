//! Shared clap helper types for CLI commands.

use clap::ValueEnum;
use posrec::LayoutSchema;

/// Layout column sets accepted by `--schema`.
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum SchemaArg {
    /// campo, tamanho, decimais, alinhamento, preenchimento, obrigatorio, formatacao, novo registro, anular
    Current,
    /// Deprecated six-column layouts without decimais / novo registro / anular.
    Legacy,
}

impl From<SchemaArg> for LayoutSchema {
    fn from(value: SchemaArg) -> LayoutSchema {
        match value {
            SchemaArg::Current => LayoutSchema::Current,
            SchemaArg::Legacy => LayoutSchema::Legacy,
        }
    }
}

/// Resolve `--schema`, falling back to `default`.
pub fn schema_or(arg: Option<SchemaArg>, default: LayoutSchema) -> LayoutSchema {
    arg.map(LayoutSchema::from).unwrap_or(default)
}
