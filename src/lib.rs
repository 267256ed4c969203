//! Layout-driven encoding of tabular data into fixed-width positional records.
//!
//! A layout table declares, for every output field, its width, alignment, fill
//! character and a chain of value rules. [`convert`] runs the stages in order:
//!
//! 1. [`validate_layout`] checks the layout's columns and every row;
//! 2. [`load_layout`] builds the ordered [`LayoutFieldSpec`] list;
//! 3. [`validate_input`] checks input columns and required values;
//! 4. [`assemble_records`] runs rules and encoders for every row.
//!
//! Each stage reports all of its findings at once as a [`ConversionError`]; a
//! failed stage stops the run and no records are produced.
//!
//! ```
//! use posrec::{ConvertOptions, Table, convert};
//!
//! let layout = Table::parse(
//!     "campo;tamanho;decimais;alinhamento;preenchimento;obrigatorio;formatacao;novo registro;anular\n\
//!      nome;6;;esquerda; ;sim;2;;\n\
//!      valor;5;2;direita;0;nao;3;;\n",
//! )
//! .unwrap();
//! let input = Table::parse("nome,valor\nJoão,\"1,5\"\n").unwrap();
//!
//! let conversion = convert(&layout, &input, &ConvertOptions::default()).unwrap();
//! assert_eq!(conversion.records, vec!["Joao  00150".to_string()]);
//! ```

mod assemble;
mod error;
mod layout;
mod options;
mod output;
mod report;
mod rules;
mod table;
mod validate;

pub use assemble::assemble_records;
pub use error::{ConversionError, Finding, Stage};
pub use layout::{
    Alignment, FieldPosition, LayoutFieldSpec, LayoutSchema, RECORD_SEPARATOR, field_positions,
    load_layout, parse_flag, record_width,
};
pub use options::ConvertOptions;
pub use output::{
    DEFAULT_ENCODING, OutputEncoding, OutputError, OutputFile, SAMPLE_FILE_NAME, is_stdout,
    plan_output, write_files, write_sample_layout,
};
pub use report::{ConversionReport, FileReport, sha256_hex};
pub use rules::{FormatRule, MAX_DECIMALS, RuleChain, RuleContext, RuleError, UnknownRule};
pub use table::{Table, TableError};
pub use validate::{InputRecords, ValidatedLayout, validate_input, validate_layout};

use std::sync::Once;

/// Field specs and encoded records of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub fields: Vec<LayoutFieldSpec>,
    pub records: Vec<String>,
}

/// Validate and load a layout table.
pub fn load_fields(
    layout: &Table,
    schema: LayoutSchema,
) -> Result<Vec<LayoutFieldSpec>, ConversionError> {
    validate_layout(layout, schema).map(load_layout)
}

/// Run every stage over in-memory tables. Nothing is retained between runs.
pub fn convert(
    layout: &Table,
    input: &Table,
    options: &ConvertOptions,
) -> Result<Conversion, ConversionError> {
    let fields = load_fields(layout, options.schema)?;
    let rows = validate_input(&fields, input)?;
    let records = assemble_records(&fields, &rows, options.parallel)?;
    Ok(Conversion { fields, records })
}

static TRACING_INIT: Once = Once::new();

/// Install the stderr log subscriber. `RUST_LOG` takes precedence over
/// `default_level`.
pub fn init_tracing(default_level: &str) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .with(filter)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LAYOUT: &str = "campo;tamanho;decimais;alinhamento;preenchimento;obrigatorio;formatacao;novo registro;anular\n\
                          nome;10;;e; ;sim;2;;\n\
                          doc;6;;d;0;sim;1;;\n\
                          total;7;2;d;0;;3;;sim\n";

    #[test]
    fn stages_run_in_order() {
        let layout = Table::parse(LAYOUT).unwrap();
        let input = Table::parse(
            "Nome,Doc,Total,Ignorada\n\
             Ana Lúcia,12-34,\"10,5\",x\n\
             Zé,9,0,y\n",
        )
        .unwrap();
        let conversion = convert(&layout, &input, &ConvertOptions::default()).unwrap();
        assert_eq!(conversion.fields.len(), 3);
        assert_eq!(
            conversion.records,
            vec![
                "Ana Lucia 0012340001050".to_string(),
                "Ze        000009       ".to_string(),
            ]
        );
        for record in &conversion.records {
            assert_eq!(record.chars().count(), record_width(&conversion.fields));
        }
    }

    #[test]
    fn layout_failure_stops_before_input() {
        let layout = Table::parse(
            "campo;tamanho;alinhamento;preenchimento;obrigatorio;formatacao\nnome;x;;;;\n",
        )
        .unwrap();
        let err = convert(&layout, &Table::default(), &ConvertOptions::default()).unwrap_err();
        assert_eq!(err.stage, Stage::Layout);
        assert_eq!(err.findings.len(), 1);
    }

    #[test]
    fn input_failure_stops_before_assembly() {
        let layout = Table::parse(LAYOUT).unwrap();
        let input = Table::parse("nome,doc,total\n,1,abc\nB,,\nC,3,1\n").unwrap();
        let err = convert(&layout, &input, &ConvertOptions::default()).unwrap_err();
        assert_eq!(err.stage, Stage::Input);
        let rows: Vec<Option<usize>> = err.findings.iter().map(Finding::row).collect();
        assert_eq!(rows, vec![Some(1), Some(2)]);
    }

    #[test]
    fn runs_are_independent() {
        let layout = Table::parse(LAYOUT).unwrap();
        let first = Table::parse("nome,doc,total\nA,1,1\nB,2,2\n").unwrap();
        let second = Table::parse("nome,doc,total\nC,3,3\n").unwrap();
        let options = ConvertOptions::default();
        assert_eq!(convert(&layout, &first, &options).unwrap().records.len(), 2);
        assert_eq!(convert(&layout, &second, &options).unwrap().records.len(), 1);
    }
}
