use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{ConversionError, Finding, Stage};
use crate::layout::LayoutFieldSpec;
use crate::validate::InputRecords;

/// Encode every input row into one output record, in input order.
///
/// Rows are independent, so they are encoded in parallel when `parallel` is set;
/// the collected output keeps input order either way. A rule failure discards that
/// row and is reported; any failed row fails the whole run.
pub fn assemble_records(
    fields: &[LayoutFieldSpec],
    input: &InputRecords,
    parallel: bool,
) -> Result<Vec<String>, ConversionError> {
    let encode = |(idx, row): (usize, &Vec<String>)| assemble_row(fields, idx + 1, row);
    let results: Vec<Result<String, Finding>> = if parallel {
        input.rows().par_iter().enumerate().map(encode).collect()
    } else {
        input.rows().iter().enumerate().map(encode).collect()
    };

    let mut records = Vec::with_capacity(results.len());
    let mut findings = Vec::new();
    for result in results {
        match result {
            Ok(record) => records.push(record),
            Err(finding) => findings.push(finding),
        }
    }
    ConversionError::check(Stage::Assembly, findings)?;
    info!(records = records.len(), "records assembled");
    Ok(records)
}

/// Encode a single row; `row` is the 1-based data row used in findings.
fn assemble_row(fields: &[LayoutFieldSpec], row: usize, cells: &[String]) -> Result<String, Finding> {
    let mut record = String::new();
    for (field, cell) in fields.iter().zip(cells) {
        let value = field.transform(cell).map_err(|err| {
            debug!(row, field = field.name(), rule = err.rule, "rule rejected value");
            Finding::Format {
                row,
                field: field.name().to_string(),
                rule: err.rule,
                value: err.value,
            }
        })?;
        record.push_str(&field.encode(&value));
    }
    Ok(record)
}
