use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rules::{FormatRule, RuleChain, RuleContext, RuleError};
use crate::validate::ValidatedLayout;

pub const COL_FIELD: &str = "campo";
pub const COL_LENGTH: &str = "tamanho";
pub const COL_DECIMALS: &str = "decimais";
pub const COL_ALIGN: &str = "alinhamento";
pub const COL_FILL: &str = "preenchimento";
pub const COL_REQUIRED: &str = "obrigatorio";
pub const COL_RULES: &str = "formatacao";
pub const COL_NEW_RECORD: &str = "novo registro";
pub const COL_BLANK_ZERO: &str = "anular";

/// Separator emitted before a field flagged `novo registro`.
pub const RECORD_SEPARATOR: char = '\n';

/// Column set a layout file must declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutSchema {
    /// Full column set including `decimais`, `novo registro` and `anular`.
    #[default]
    Current,
    /// Deprecated six-column layouts.
    Legacy,
}

impl LayoutSchema {
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            LayoutSchema::Current => &[
                COL_FIELD,
                COL_LENGTH,
                COL_DECIMALS,
                COL_ALIGN,
                COL_FILL,
                COL_REQUIRED,
                COL_RULES,
                COL_NEW_RECORD,
                COL_BLANK_ZERO,
            ],
            LayoutSchema::Legacy => &[
                COL_FIELD,
                COL_LENGTH,
                COL_ALIGN,
                COL_FILL,
                COL_REQUIRED,
                COL_RULES,
            ],
        }
    }

    /// Header of an empty layout file: capitalized column names joined by `delimiter`.
    pub fn sample_header(self, delimiter: char) -> String {
        self.columns()
            .iter()
            .map(|c| capitalize(c))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string())
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

impl Alignment {
    /// Tolerant parser; anything unrecognized is [`Alignment::Left`].
    pub fn parse(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "right" | "r" | "direita" | "d" => Alignment::Right,
            _ => Alignment::Left,
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Alignment::Left => f.pad("left"),
            Alignment::Right => f.pad("right"),
        }
    }
}

/// Tolerant boolean parser for layout flags; unrecognized text yields `default`.
pub fn parse_flag(text: &str, default: bool) -> bool {
    match text.trim().to_lowercase().as_str() {
        "true" | "t" | "1" | "y" | "yes" | "s" | "sim" => true,
        "false" | "f" | "0" | "n" | "no" | "nao" | "não" => false,
        _ => default,
    }
}

/// One validated field of a layout. Built only by [`load_layout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutFieldSpec {
    name: String,
    length: usize,
    alignment: Alignment,
    fill: char,
    rules: RuleChain,
    required: bool,
    decimals: Option<u32>,
    new_record: bool,
}

impl LayoutFieldSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn fill(&self) -> char {
        self.fill
    }

    pub fn rules(&self) -> &RuleChain {
        &self.rules
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn decimals(&self) -> Option<u32> {
        self.decimals
    }

    pub fn new_record(&self) -> bool {
        self.new_record
    }

    pub fn rule_context(&self) -> RuleContext {
        RuleContext {
            length: self.length,
            decimals: self.decimals,
        }
    }

    /// Run the field's rule chain over a raw cell.
    pub fn transform(&self, value: &str) -> Result<String, RuleError> {
        self.rules.apply(value, self.rule_context())
    }

    /// Truncate or pad `value` to exactly `length` characters.
    ///
    /// Longer values keep their prefix. Padding goes on the left for right-aligned
    /// fields. A `novo registro` field is preceded by [`RECORD_SEPARATOR`], which is
    /// not counted in the field width.
    pub fn encode(&self, value: &str) -> String {
        let count = value.chars().count();
        let mut out = String::with_capacity(self.length + 1);
        if self.new_record {
            out.push(RECORD_SEPARATOR);
        }
        if count >= self.length {
            out.extend(value.chars().take(self.length));
            return out;
        }
        let pad = std::iter::repeat_n(self.fill, self.length - count);
        match self.alignment {
            Alignment::Right => {
                out.extend(pad);
                out.push_str(value);
            }
            Alignment::Left => {
                out.push_str(value);
                out.extend(pad);
            }
        }
        out
    }
}

/// Inclusive 1-based character positions of a field inside its physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPosition {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// Positions of every field, restarting at column 1 after each `novo registro` break.
pub fn field_positions(fields: &[LayoutFieldSpec]) -> Vec<FieldPosition> {
    let mut line = 1;
    let mut next = 1;
    fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            if field.new_record && idx > 0 {
                line += 1;
                next = 1;
            }
            let pos = FieldPosition {
                line,
                start: next,
                end: next + field.length - 1,
            };
            next += field.length;
            pos
        })
        .collect()
}

/// Width of one encoded record, separators included.
pub fn record_width(fields: &[LayoutFieldSpec]) -> usize {
    fields
        .iter()
        .map(|f| f.length + usize::from(f.new_record))
        .sum()
}

/// Build field specs from a layout that passed validation, preserving row order.
///
/// Field names are trimmed and lower-cased; flags and alignment go through the
/// tolerant parsers. An `anular` flag appends zero-as-blank to the rule chain
/// unless the chain already has it.
pub fn load_layout(layout: ValidatedLayout) -> Vec<LayoutFieldSpec> {
    layout
        .into_rows()
        .into_iter()
        .map(|row| {
            let mut rules = row.rules;
            if parse_flag(&row.blank_zero, false) && !rules.contains(FormatRule::ZeroAsBlank) {
                rules.push(FormatRule::ZeroAsBlank);
            }
            LayoutFieldSpec {
                name: row.name,
                length: row.length,
                alignment: Alignment::parse(&row.alignment),
                fill: row.fill,
                rules,
                required: parse_flag(&row.required, false),
                decimals: row.decimals,
                new_record: parse_flag(&row.new_record, false),
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn spec(name: &str, length: usize, alignment: Alignment, fill: char) -> LayoutFieldSpec {
    LayoutFieldSpec {
        name: name.to_string(),
        length,
        alignment,
        fill,
        rules: RuleChain::default(),
        required: false,
        decimals: None,
        new_record: false,
    }
}

#[cfg(test)]
impl LayoutFieldSpec {
    pub(crate) fn with_rules(mut self, rules: &[FormatRule]) -> Self {
        self.rules = RuleChain::new(rules.to_vec());
        self
    }

    pub(crate) fn with_required(mut self) -> Self {
        self.required = true;
        self
    }

    pub(crate) fn with_decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub(crate) fn with_new_record(mut self) -> Self {
        self.new_record = true;
        self
    }
}
