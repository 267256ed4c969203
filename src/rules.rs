use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Decimal places used by money-scale when the field declares none.
pub const DEFAULT_DECIMALS: u32 = 2;

/// Largest `decimais` a layout may declare.
pub const MAX_DECIMALS: u32 = 18;

/// Named value transforms a layout may chain on a field.
///
/// Layouts reference a rule either by its numeric code (the form older layouts use)
/// or by its name. Both forms are resolved once, while the layout is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatRule {
    /// Keep ASCII digits only.
    DigitsOnly,
    /// Decompose and drop combining marks.
    StripAccents,
    /// As [`FormatRule::StripAccents`], then upper-case.
    StripAccentsUpper,
    /// Decimal number scaled by 10^decimals and rounded to an integer.
    MoneyScale,
    /// Numeric zero becomes a blank field.
    ZeroAsBlank,
}

/// Rejected rule code found in a layout.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown format rule '{code}' (available: {})", FormatRule::catalogue())]
pub struct UnknownRule {
    pub code: String,
}

/// Failure of a rule that needs numeric input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{rule}: \"{value}\" is not a number")]
pub struct RuleError {
    pub rule: &'static str,
    pub value: String,
}

/// Field attributes a rule may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    pub length: usize,
    pub decimals: Option<u32>,
}

impl FormatRule {
    pub const ALL: [FormatRule; 5] = [
        FormatRule::DigitsOnly,
        FormatRule::StripAccents,
        FormatRule::MoneyScale,
        FormatRule::ZeroAsBlank,
        FormatRule::StripAccentsUpper,
    ];

    pub fn code(self) -> u8 {
        match self {
            FormatRule::DigitsOnly => 1,
            FormatRule::StripAccents => 2,
            FormatRule::MoneyScale => 3,
            FormatRule::ZeroAsBlank => 4,
            FormatRule::StripAccentsUpper => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FormatRule::DigitsOnly => "digits-only",
            FormatRule::StripAccents => "strip-accents",
            FormatRule::StripAccentsUpper => "strip-accents-upper",
            FormatRule::MoneyScale => "money-scale",
            FormatRule::ZeroAsBlank => "zero-as-blank",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FormatRule::DigitsOnly => "remove every character that is not a digit 0-9",
            FormatRule::StripAccents => "remove accents and other combining marks",
            FormatRule::StripAccentsUpper => "remove accents, then convert to upper case",
            FormatRule::MoneyScale => {
                "multiply a decimal number by 10^decimais and round to an integer"
            }
            FormatRule::ZeroAsBlank => "replace a numeric zero with a blank field",
        }
    }

    /// `"1 (digits-only), 2 (strip-accents), ..."` for error messages.
    pub fn catalogue() -> String {
        Self::ALL
            .iter()
            .map(|rule| format!("{} ({})", rule.code(), rule.name()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Apply the transform to a single value.
    pub fn apply(self, value: &str, ctx: RuleContext) -> Result<String, RuleError> {
        match self {
            FormatRule::DigitsOnly => Ok(digits_only(value)),
            FormatRule::StripAccents => Ok(strip_accents(value)),
            FormatRule::StripAccentsUpper => Ok(strip_accents(value).to_uppercase()),
            FormatRule::MoneyScale => {
                let number = Decimal::parse(value).ok_or_else(|| self.reject(value))?;
                Ok(number.scaled(ctx.decimals.unwrap_or(DEFAULT_DECIMALS)))
            }
            FormatRule::ZeroAsBlank => {
                let number = Decimal::parse(value).ok_or_else(|| self.reject(value))?;
                if number.is_zero() {
                    Ok(" ".repeat(ctx.length))
                } else {
                    Ok(value.to_string())
                }
            }
        }
    }

    fn reject(self, value: &str) -> RuleError {
        RuleError {
            rule: self.name(),
            value: value.to_string(),
        }
    }
}

impl FromStr for FormatRule {
    type Err = UnknownRule;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        let code = code.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|rule| {
                code.parse::<u8>().ok() == Some(rule.code()) || rule.name().eq_ignore_ascii_case(code)
            })
            .ok_or_else(|| UnknownRule {
                code: code.to_string(),
            })
    }
}

impl fmt::Display for FormatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered rules applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleChain(Vec<FormatRule>);

impl RuleChain {
    pub fn new(rules: Vec<FormatRule>) -> Self {
        Self(rules)
    }

    /// Parse a `;`-separated list of codes, collecting every unknown code.
    /// Empty segments are ignored so `"1;"` and `""` are accepted.
    pub fn parse(text: &str) -> Result<Self, Vec<UnknownRule>> {
        let mut rules = Vec::new();
        let mut unknown = Vec::new();
        for part in text.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            match part.parse::<FormatRule>() {
                Ok(rule) => rules.push(rule),
                Err(err) => unknown.push(err),
            }
        }
        if unknown.is_empty() {
            Ok(Self(rules))
        } else {
            Err(unknown)
        }
    }

    pub fn rules(&self) -> &[FormatRule] {
        &self.0
    }

    pub fn contains(&self, rule: FormatRule) -> bool {
        self.0.contains(&rule)
    }

    pub fn push(&mut self, rule: FormatRule) {
        self.0.push(rule);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold the value through every rule; the first failing rule aborts the chain.
    pub fn apply(&self, value: &str, ctx: RuleContext) -> Result<String, RuleError> {
        let mut current = value.to_string();
        for rule in &self.0 {
            current = rule.apply(&current, ctx)?;
        }
        Ok(current)
    }
}

impl fmt::Display for RuleChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("-");
        }
        let names: Vec<&str> = self.0.iter().map(|r| r.name()).collect();
        f.write_str(&names.join(";"))
    }
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn strip_accents(value: &str) -> String {
    value.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Plain decimal text: optional sign, digits, optional `.` or `,` fraction.
///
/// Scaling is done on the digit string so values like `1.005` round exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Decimal {
    negative: bool,
    int: String,
    frac: String,
}

impl Decimal {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim().replace(',', ".");
        let (negative, body) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text.as_str()),
        };
        let (int, frac) = body.split_once('.').unwrap_or((body, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
            return None;
        }
        Some(Self {
            negative,
            int: int.to_string(),
            frac: frac.to_string(),
        })
    }

    fn is_zero(&self) -> bool {
        self.int.bytes().chain(self.frac.bytes()).all(|b| b == b'0')
    }

    /// Multiply by 10^decimals and round half away from zero.
    fn scaled(&self, decimals: u32) -> String {
        let decimals = decimals as usize;
        let mut digits: Vec<u8> = self.int.bytes().map(|b| b - b'0').collect();
        let frac: Vec<u8> = self.frac.bytes().map(|b| b - b'0').collect();
        for i in 0..decimals {
            digits.push(frac.get(i).copied().unwrap_or(0));
        }
        if frac.get(decimals).is_some_and(|d| *d >= 5) {
            let mut carry = true;
            for d in digits.iter_mut().rev() {
                if *d == 9 {
                    *d = 0;
                } else {
                    *d += 1;
                    carry = false;
                    break;
                }
            }
            if carry {
                digits.insert(0, 1);
            }
        }
        let first = digits.iter().position(|d| *d != 0);
        let magnitude: String = match first {
            Some(idx) => digits[idx..].iter().map(|d| char::from(b'0' + d)).collect(),
            None => return "0".to_string(),
        };
        if self.negative {
            format!("-{magnitude}")
        } else {
            magnitude
        }
    }
}
