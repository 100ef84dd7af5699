// src/extractors/value.rs
use calamine::Data;

/// A numeric cell after normalization. `Unparsed` keeps the raw text so a
/// bad cell stays distinguishable from a genuine zero.
#[derive(Debug, Clone, PartialEq)]
pub enum Amount {
    Value(f64),
    Unparsed(String),
}

impl Amount {
    pub fn from_cell(cell: &Data) -> Self {
        match normalize_value(cell) {
            Some(value) => Amount::Value(value),
            None => Amount::Unparsed(cell.to_string()),
        }
    }

    /// Whole-unit amount with the fraction truncated; unparsed amounts
    /// count as zero.
    pub fn truncated(&self) -> i64 {
        match self {
            Amount::Value(value) => value.trunc() as i64,
            Amount::Unparsed(_) => 0,
        }
    }
}

/// Converts accounting text ("1,234", "(500)") to a float. Returns `None`
/// for anything that is not a finite number.
pub fn normalize_text(raw: &str) -> Option<f64> {
    let stripped = raw.replace(',', "");
    let trimmed = stripped.trim();

    let candidate = if trimmed.len() >= 2 && trimmed.starts_with('(') && trimmed.ends_with(')') {
        format!("-{}", trimmed.trim_matches(|c| c == '(' || c == ')'))
    } else {
        trimmed.to_string()
    };

    candidate
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Normalizes a workbook cell. Numeric cells pass through; text goes through
/// `normalize_text`; dates, errors and blanks yield `None`.
pub fn normalize_value(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(value) => Some(*value as f64),
        Data::Float(value) => Some(*value).filter(|v| v.is_finite()),
        Data::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
        Data::String(text) => normalize_text(text),
        _ => None,
    }
}
