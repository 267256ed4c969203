use std::fmt;

use thiserror::Error;

/// One defect discovered while converting. Every stage returns all of its findings
/// instead of stopping at the first one.
///
/// Row numbers are 1-based data rows; the physical file line is `row + 1` because of
/// the header row.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Finding {
    #[error("missing columns in layout: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("unexpected columns in layout: {}", .columns.join(", "))]
    UnexpectedColumns { columns: Vec<String> },

    #[error("row {row} (line {}): '{column}' {reason}", line(.row))]
    FieldSpec {
        row: usize,
        column: &'static str,
        reason: String,
    },

    #[error("fields missing from input: {}", .fields.join(", "))]
    MissingInputFields { fields: Vec<String> },

    #[error("row {row} (line {}): required field '{field}' is empty", line(.row))]
    RequiredValue { row: usize, field: String },

    #[error("row {row} (line {}): field '{field}' failed rule {rule}: \"{value}\" is not a number", line(.row))]
    Format {
        row: usize,
        field: String,
        rule: &'static str,
        value: String,
    },

    #[error("record {record}: character '{ch}' ({}) cannot be written as {encoding}", code_point(.ch))]
    Unencodable {
        record: usize,
        ch: char,
        encoding: &'static str,
    },
}

fn line(row: &usize) -> usize {
    row + 1
}

fn code_point(ch: &char) -> String {
    format!("U+{:04X}", u32::from(*ch))
}

impl Finding {
    /// Data row the finding refers to, if it is row-scoped.
    pub fn row(&self) -> Option<usize> {
        match self {
            Finding::FieldSpec { row, .. }
            | Finding::RequiredValue { row, .. }
            | Finding::Format { row, .. } => Some(*row),
            Finding::Unencodable { record, .. } => Some(*record),
            Finding::MissingColumns { .. }
            | Finding::UnexpectedColumns { .. }
            | Finding::MissingInputFields { .. } => None,
        }
    }
}

/// Pipeline stage a composite report came from. Stages run in declaration order and a
/// failing stage stops the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Layout,
    Input,
    Assembly,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Layout => write!(f, "the layout"),
            Stage::Input => write!(f, "the input"),
            Stage::Assembly => write!(f, "the input records"),
            Stage::Output => write!(f, "the output"),
        }
    }
}

/// Composite report: every finding of the stage that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub stage: Stage,
    pub findings: Vec<Finding>,
}

impl ConversionError {
    pub fn new(stage: Stage, findings: Vec<Finding>) -> Self {
        Self { stage, findings }
    }

    /// Wrap stage findings, succeeding only when there are none.
    pub fn check(stage: Stage, findings: Vec<Finding>) -> Result<(), Self> {
        if findings.is_empty() {
            Ok(())
        } else {
            Err(Self::new(stage, findings))
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.findings.len() == 1 {
            "problem"
        } else {
            "problems"
        };
        write!(
            f,
            "{} {} found in {}:",
            self.findings.len(),
            noun,
            self.stage
        )?;
        for finding in &self.findings {
            write!(f, "\n- {finding}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConversionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn composite_report_lists_every_finding() {
        let err = ConversionError::new(
            Stage::Input,
            vec![
                Finding::RequiredValue {
                    row: 1,
                    field: "nome".into(),
                },
                Finding::RequiredValue {
                    row: 3,
                    field: "nome".into(),
                },
            ],
        );
        assert_eq!(
            err.to_string(),
            "2 problems found in the input:\n\
             - row 1 (line 2): required field 'nome' is empty\n\
             - row 3 (line 4): required field 'nome' is empty"
        );
    }

    #[test]
    fn check_passes_without_findings() {
        assert!(ConversionError::check(Stage::Layout, Vec::new()).is_ok());
        let err = ConversionError::check(
            Stage::Layout,
            vec![Finding::MissingColumns {
                columns: vec!["preenchimento".into()],
            }],
        )
        .unwrap_err();
        assert_eq!(err.findings.len(), 1);
        assert_eq!(
            err.to_string(),
            "1 problem found in the layout:\n- missing columns in layout: preenchimento"
        );
    }

    #[test]
    fn unencodable_names_code_point() {
        let finding = Finding::Unencodable {
            record: 2,
            ch: '\u{0151}',
            encoding: "windows-1252",
        };
        assert_eq!(
            finding.to_string(),
            "record 2: character '\u{0151}' (U+0151) cannot be written as windows-1252"
        );
        assert_eq!(finding.row(), Some(2));
    }
}
