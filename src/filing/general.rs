// src/filing/general.rs
//! Filer identity from the general-information lookup sheet.

use calamine::{Data, Range};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::filing::models::{FilingInfo, MAX_PERIOD_LEN};
use crate::filing::workbook::{cell_at, cell_text, last_row, Workbook};
use crate::utils::error::ExtractError;

/// Sheet holding the general information block.
pub const LOOKUP_SHEET: &str = "1000000";

const ENTITY_NAME_LABEL: &str = "Nama entitas";

const PERIOD_LABELS: [&str; 2] = [
    "periode penyampaian laporan keuangan",
    "periode penyajian laporan keuangan",
];

static QUARTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:kuartal|triwulan|quarter|q)\s*(iv|i{1,3}|[1-4])\b")
        .expect("Failed to compile QUARTER_RE")
});

static ANNUAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:tahunan|annual|yearly|fy)\b").expect("Failed to compile ANNUAL_RE")
});

static HALF_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:(?:semester(?:an)?|tengah\s+tahunan|half[\s-]?year)\s*(ii|i|[12])?|h([12]))\b")
        .expect("Failed to compile HALF_YEAR_RE")
});

/// Returns the cell right of the first column-A cell for which `matches`
/// holds, when that cell is non-empty.
fn lookup_value(range: &Range<Data>, matches: impl Fn(&str) -> bool) -> Option<String> {
    let last = last_row(range)?;
    (0..=last)
        .find(|&row| matches(&cell_text(cell_at(range, row, 0))))
        .map(|row| cell_text(cell_at(range, row, 1)))
        .filter(|value| !value.is_empty())
}

/// Reads the filer's display name from the lookup sheet.
pub fn resolve_entity_name<W: Workbook>(workbook: &mut W) -> Result<String, ExtractError> {
    tracing::debug!("Available sheets: {:?}", workbook.sheet_names());
    let range = workbook.sheet(LOOKUP_SHEET)?;
    tracing::trace!("Lookup sheet '{}' spans {:?}..{:?}", LOOKUP_SHEET, range.start(), range.end());

    let name = lookup_value(&range, |label| label == ENTITY_NAME_LABEL).ok_or_else(|| {
        ExtractError::EntityNameNotFound {
            sheet: LOOKUP_SHEET.to_string(),
        }
    })?;

    tracing::info!("Emitent name: {}", name);
    Ok(name)
}

/// Maps a free-text reporting period ("Tahunan", "Kuartal III", "Q2") onto a
/// short tag: `FY`, `H1`/`H2` or `Q1`..`Q4`.
pub fn parse_period_tag(raw: &str) -> Option<String> {
    if let Some(caps) = QUARTER_RE.captures(raw) {
        let quarter = match caps[1].to_ascii_lowercase().as_str() {
            "i" | "1" => 1,
            "ii" | "2" => 2,
            "iii" | "3" => 3,
            _ => 4,
        };
        return Some(format!("Q{}", quarter));
    }
    // A half-year without an ordinal is the first one.
    if let Some(caps) = HALF_YEAR_RE.captures(raw) {
        let half = match caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().to_ascii_lowercase()) {
            Some(ordinal) if ordinal == "ii" || ordinal == "2" => 2,
            _ => 1,
        };
        return Some(format!("H{}", half));
    }
    if ANNUAL_RE.is_match(raw) {
        return Some("FY".to_string());
    }
    None
}

/// Trims an explicit period tag and checks it fits the `quarter` column.
pub fn validate_period_tag(raw: &str) -> Result<String, ExtractError> {
    let tag = raw.trim();
    let length = tag.chars().count();
    if length == 0 || length > MAX_PERIOD_LEN {
        return Err(ExtractError::InvalidPeriod {
            tag: raw.to_string(),
            max: MAX_PERIOD_LEN,
        });
    }
    Ok(tag.to_string())
}

/// Finds the reporting period declared on the lookup sheet, if any.
pub fn resolve_period<W: Workbook>(workbook: &mut W) -> Result<Option<String>, ExtractError> {
    let range = workbook.sheet(LOOKUP_SHEET)?;
    let declared = lookup_value(&range, |label| {
        let label = label.to_lowercase();
        PERIOD_LABELS.iter().any(|known| label.starts_with(known))
    });

    let tag = declared.as_deref().and_then(parse_period_tag);
    match (&declared, &tag) {
        (Some(raw), Some(tag)) => tracing::info!("Reporting period '{}' mapped to {}", raw, tag),
        (Some(raw), None) => tracing::warn!("Unrecognised reporting period '{}' on sheet {}", raw, LOOKUP_SHEET),
        (None, _) => tracing::debug!("No reporting period row on sheet {}", LOOKUP_SHEET),
    }
    Ok(tag)
}

/// Resolves emitent and period for the run. An explicit period wins over the
/// one declared in the workbook; having neither is an error.
pub fn resolve_filing<W: Workbook>(
    workbook: &mut W,
    period_override: Option<&str>,
) -> Result<FilingInfo, ExtractError> {
    let emitent = resolve_entity_name(workbook)?;

    let period = match period_override {
        Some(period) => validate_period_tag(period)?,
        None => resolve_period(workbook)?.ok_or_else(|| ExtractError::PeriodNotFound {
            sheet: LOOKUP_SHEET.to_string(),
        })?,
    };

    Ok(FilingInfo { emitent, period })
}
