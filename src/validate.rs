//! Layout and input validation. Each pass enumerates every defect it can find and
//! reports them together; nothing downstream runs on a table that failed here.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::{ConversionError, Finding, Stage};
use crate::layout::{
    COL_ALIGN, COL_BLANK_ZERO, COL_DECIMALS, COL_FIELD, COL_FILL, COL_LENGTH, COL_NEW_RECORD,
    COL_REQUIRED, COL_RULES, LayoutFieldSpec, LayoutSchema,
};
use crate::rules::{MAX_DECIMALS, RuleChain};
use crate::table::Table;

/// Layout row whose numeric and rule columns already parsed.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedRow {
    pub name: String,
    pub length: usize,
    pub fill: char,
    pub decimals: Option<u32>,
    pub rules: RuleChain,
    pub alignment: String,
    pub required: String,
    pub new_record: String,
    pub blank_zero: String,
}

/// Proof that a layout table passed [`validate_layout`]; consumed by
/// [`load_layout`](crate::load_layout).
#[derive(Debug, Clone)]
pub struct ValidatedLayout {
    rows: Vec<ValidatedRow>,
}

impl ValidatedLayout {
    pub(crate) fn into_rows(self) -> Vec<ValidatedRow> {
        self.rows
    }
}

/// Check the column set, then every row. Schema problems stop validation because
/// the per-row checks depend on the columns being present.
pub fn validate_layout(
    table: &Table,
    schema: LayoutSchema,
) -> Result<ValidatedLayout, ConversionError> {
    ConversionError::check(Stage::Layout, check_schema(table, schema))?;

    let mut findings = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut rows = Vec::with_capacity(table.len());

    for (idx, raw) in table.rows().iter().enumerate() {
        let row = idx + 1;
        let cell = |column: &str| cell_text(table, raw, column);
        let mut fail = |column: &'static str, reason: String| {
            findings.push(Finding::FieldSpec {
                row,
                column,
                reason,
            })
        };

        let name = cell(COL_FIELD).trim().to_lowercase();
        if name.is_empty() {
            fail(COL_FIELD, "must not be empty".to_string());
        } else if let Some(first) = seen.get(&name) {
            fail(COL_FIELD, format!("repeats field '{name}' from row {first}"));
        } else {
            seen.insert(name.clone(), row);
        }

        let length = match parse_count(&cell(COL_LENGTH)) {
            Some(0) => {
                fail(COL_LENGTH, "must be greater than zero".to_string());
                None
            }
            Some(n) => Some(n),
            None => {
                fail(
                    COL_LENGTH,
                    format!("must be a whole number (got '{}')", cell(COL_LENGTH)),
                );
                None
            }
        };

        let fill_raw = cell(COL_FILL);
        let fill = if fill_raw.trim().is_empty() {
            Some(' ')
        } else {
            let mut chars = fill_raw.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Some(ch),
                _ => {
                    fail(
                        COL_FILL,
                        format!("must be a single character (got '{fill_raw}')"),
                    );
                    None
                }
            }
        };

        let decimals_raw = cell(COL_DECIMALS);
        let decimals = if decimals_raw.trim().is_empty() {
            Ok(None)
        } else {
            match parse_count(&decimals_raw).and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n <= MAX_DECIMALS => Ok(Some(n)),
                Some(_) => {
                    fail(
                        COL_DECIMALS,
                        format!("must be at most {MAX_DECIMALS} (got '{decimals_raw}')"),
                    );
                    Err(())
                }
                None => {
                    fail(
                        COL_DECIMALS,
                        format!("must be a whole number (got '{decimals_raw}')"),
                    );
                    Err(())
                }
            }
        };

        let rules = match RuleChain::parse(&cell(COL_RULES)) {
            Ok(chain) => Some(chain),
            Err(unknown) => {
                for err in unknown {
                    fail(COL_RULES, err.to_string());
                }
                None
            }
        };

        if let (Some(length), Some(fill), Ok(decimals), Some(rules)) = (length, fill, decimals, rules)
        {
            rows.push(ValidatedRow {
                name,
                length,
                fill,
                decimals,
                rules,
                alignment: cell(COL_ALIGN),
                required: cell(COL_REQUIRED),
                new_record: cell(COL_NEW_RECORD),
                blank_zero: cell(COL_BLANK_ZERO),
            });
        }
    }

    ConversionError::check(Stage::Layout, findings)?;
    info!(fields = rows.len(), "layout validated");
    Ok(ValidatedLayout { rows })
}

/// Cell text by column name; columns outside the schema read as empty.
fn cell_text(table: &Table, row: &[String], column: &str) -> String {
    table
        .column_index(column)
        .map(|idx| row[idx].clone())
        .unwrap_or_default()
}

fn check_schema(table: &Table, schema: LayoutSchema) -> Vec<Finding> {
    let expected = schema.columns();
    let mut findings = Vec::new();

    let missing: Vec<String> = expected
        .iter()
        .filter(|c| table.column_index(c).is_none())
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        findings.push(Finding::MissingColumns { columns: missing });
    }

    let mut unexpected: Vec<String> = Vec::new();
    for column in table.columns() {
        if !expected.contains(&column.as_str()) && !unexpected.contains(column) {
            unexpected.push(column.clone());
        }
    }
    if !unexpected.is_empty() {
        findings.push(Finding::UnexpectedColumns {
            columns: unexpected,
        });
    }
    findings
}

/// Non-negative integer made only of ASCII digits (no sign, no spaces inside).
fn parse_count(text: &str) -> Option<usize> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Input rows projected onto the layout: cell `i` of every row belongs to field `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRecords {
    rows: Vec<Vec<String>>,
}

impl InputRecords {
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Check that every layout field has an input column and that required fields have
/// a value in every row.
///
/// Required checks are skipped for fields already reported as missing columns.
pub fn validate_input(
    fields: &[LayoutFieldSpec],
    table: &Table,
) -> Result<InputRecords, ConversionError> {
    let mut findings = Vec::new();
    let indices: Vec<Option<usize>> = fields.iter().map(|f| table.column_index(f.name())).collect();

    let missing: Vec<String> = fields
        .iter()
        .zip(&indices)
        .filter(|(_, idx)| idx.is_none())
        .map(|(f, _)| f.name().to_string())
        .collect();
    if !missing.is_empty() {
        findings.push(Finding::MissingInputFields { fields: missing });
    }

    let unused: Vec<&str> = table
        .columns()
        .iter()
        .filter(|c| !fields.iter().any(|f| f.name() == c.as_str()))
        .map(String::as_str)
        .collect();
    if !unused.is_empty() {
        warn!(columns = ?unused, "input columns not referenced by the layout are ignored");
    }

    for (idx, raw) in table.rows().iter().enumerate() {
        for (field, column) in fields.iter().zip(&indices) {
            let Some(column) = column else { continue };
            if field.required() && raw[*column].trim().is_empty() {
                findings.push(Finding::RequiredValue {
                    row: idx + 1,
                    field: field.name().to_string(),
                });
            }
        }
    }

    ConversionError::check(Stage::Input, findings)?;

    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|raw| {
            indices
                .iter()
                .map(|idx| idx.map(|i| raw[i].clone()).unwrap_or_default())
                .collect()
        })
        .collect();
    info!(rows = rows.len(), "input validated");
    Ok(InputRecords { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Alignment, load_layout, spec};
    use pretty_assertions::assert_eq;

    const HEADER: &str =
        "campo;tamanho;decimais;alinhamento;preenchimento;obrigatorio;formatacao;novo registro;anular";

    fn layout(rows: &str) -> Table {
        Table::parse(&format!("{HEADER}\n{rows}")).unwrap()
    }

    #[test]
    fn schema_reports_missing_and_unexpected_together() {
        let table = Table::parse(
            "campo,tamanho,decimais,alinhamento,obrigatorio,formatacao,novo registro,anular,extra\n\
             nome,10,,left,sim,,,,x\n",
        )
        .unwrap();
        let err = validate_layout(&table, LayoutSchema::Current).unwrap_err();
        assert_eq!(err.stage, Stage::Layout);
        assert_eq!(
            err.findings,
            vec![
                Finding::MissingColumns {
                    columns: vec!["preenchimento".into()]
                },
                Finding::UnexpectedColumns {
                    columns: vec!["extra".into()]
                },
            ]
        );
    }

    #[test]
    fn legacy_schema_accepts_six_columns_only() {
        let table = Table::parse(
            "Campo,Tamanho,Alinhamento,Preenchimento,Obrigatorio,Formatacao\nnome,5,l, ,n,1\n",
        )
        .unwrap();
        let fields = load_layout(validate_layout(&table, LayoutSchema::Legacy).unwrap());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].decimals(), None);
        assert!(!fields[0].new_record());

        let err = validate_layout(&table, LayoutSchema::Current).unwrap_err();
        assert_eq!(err.findings.len(), 1);
    }

    #[test]
    fn every_row_defect_is_reported() {
        let table = layout(
            "nome;abc;;;xx;;;;\n\
             cpf;11;;;0;;1;;\n\
             valor;0;-1;;0;;\"3;9\";;\n\
             CPF;5;;; ;;;;\n\
             ;5;;; ;;;;\n",
        );
        let err = validate_layout(&table, LayoutSchema::Current).unwrap_err();
        let summary: Vec<(Option<usize>, &str)> = err
            .findings
            .iter()
            .map(|f| match f {
                Finding::FieldSpec { row, column, .. } => (Some(*row), *column),
                _ => (None, ""),
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some(1), COL_LENGTH),
                (Some(1), COL_FILL),
                (Some(3), COL_LENGTH),
                (Some(3), COL_DECIMALS),
                (Some(3), COL_RULES),
                (Some(4), COL_FIELD),
                (Some(5), COL_FIELD),
            ]
        );
        let text = err.to_string();
        assert!(text.starts_with("7 problems found in the layout:"));
        assert!(text.contains("row 1 (line 2): 'tamanho' must be a whole number (got 'abc')"));
        assert!(text.contains("unknown format rule '9'"));
        assert!(text.contains("repeats field 'cpf' from row 2"));
    }

    #[test]
    fn decimals_are_capped() {
        let table = layout("a;5;18;;;;3;;\nb;5;19;;;;3;;\nc;5;4000000000;;;;3;;\n");
        let err = validate_layout(&table, LayoutSchema::Current).unwrap_err();
        let rows: Vec<Option<usize>> = err.findings.iter().map(Finding::row).collect();
        assert_eq!(rows, vec![Some(2), Some(3)]);
        assert!(err.to_string().contains("'decimais' must be at most 18 (got '19')"));

        let table = layout("a;5;18;;;;3;;\n");
        let fields = load_layout(validate_layout(&table, LayoutSchema::Current).unwrap());
        assert_eq!(fields[0].decimals(), Some(MAX_DECIMALS));
    }

    #[test]
    fn blank_fill_means_space() {
        let table = layout("nome;3;;;;;;;\n");
        let fields = load_layout(validate_layout(&table, LayoutSchema::Current).unwrap());
        assert_eq!(fields[0].fill(), ' ');
    }

    #[test]
    fn input_reports_missing_columns_and_every_empty_required_cell() {
        let fields = vec![
            spec("nome", 10, Alignment::Left, ' ').with_required(),
            spec("cpf", 11, Alignment::Right, '0').with_required(),
            spec("cidade", 10, Alignment::Left, ' '),
        ];
        let input = Table::new(
            &["Nome", "Cidade"],
            vec![
                vec!["".into(), "Recife".into()],
                vec!["Ana".into(), "".into()],
                vec!["  ".into(), "Natal".into()],
            ],
        );
        let err = validate_input(&fields, &input).unwrap_err();
        assert_eq!(err.stage, Stage::Input);
        assert_eq!(
            err.findings,
            vec![
                Finding::MissingInputFields {
                    fields: vec!["cpf".into()]
                },
                Finding::RequiredValue {
                    row: 1,
                    field: "nome".into()
                },
                Finding::RequiredValue {
                    row: 3,
                    field: "nome".into()
                },
            ]
        );
    }

    #[test]
    fn input_rows_follow_layout_order() {
        let fields = vec![
            spec("b", 2, Alignment::Left, ' '),
            spec("a", 2, Alignment::Left, ' '),
        ];
        let input = Table::new(
            &["a", "extra", "b"],
            vec![vec!["1".into(), "x".into(), "2".into()]],
        );
        let records = validate_input(&fields, &input).unwrap();
        assert_eq!(records.rows(), &[vec!["2".to_string(), "1".to_string()]]);
    }
}
