// src/extractors/statement.rs

// --- Imports ---
use calamine::{Data, Range};

use crate::extractors::notes::NoteIndex;
use crate::extractors::value::Amount;
use crate::filing::models::{FilingInfo, StatementGroup, StatementLine, MISSING_ITEM};
use crate::filing::workbook::{cell_at, cell_text, column_count, last_row, Workbook};
use crate::utils::error::ExtractError;

// --- Constants ---
/// Zero-based row of the column header; data starts on the row after it.
pub const HEADER_ROW: u32 = 1;
/// Category, current-period amount, prior-period amount, statement marker.
pub const STATEMENT_COLUMNS: usize = 4;

const COL_CATEGORY: u32 = 0;
const COL_CURRENT: u32 = 1;
const COL_PRIOR: u32 = 2;
const COL_MARKER: u32 = 3;

/// Which rows survive the missing-value filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowFilter {
    /// Drop rows with any blank among the four columns.
    #[default]
    Strict,
    /// Keep rows that have a category and a current-period cell.
    Lenient,
}

/// How statement rows are matched with note references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotePairing {
    /// n-th surviving row takes the n-th note found in the document.
    #[default]
    Positional,
    /// Row category is looked up against the label preceding each note.
    ByLabel,
}

// --- Data Structures ---
/// A statement row after filtering and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRow {
    /// One-based sheet row, for log messages.
    pub sheet_row: u32,
    pub category: String,
    pub current: Amount,
    pub prior: Amount,
    pub marker: String,
}

/// Lines extracted for one section plus the count of unparsed amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementExtraction {
    pub group: StatementGroup,
    pub lines: Vec<StatementLine>,
    pub unparsed_values: usize,
}

fn is_missing(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Reads one statement sheet into normalized rows, in sheet order.
pub fn read_statement_rows(
    range: &Range<Data>,
    sheet: &str,
    filter: RowFilter,
) -> Result<Vec<StatementRow>, ExtractError> {
    let found = column_count(range);
    if found < STATEMENT_COLUMNS {
        return Err(ExtractError::MissingColumns {
            sheet: sheet.to_string(),
            required: STATEMENT_COLUMNS,
            found,
        });
    }

    let Some(last) = last_row(range) else {
        return Ok(Vec::new());
    };

    let mut rows = Vec::new();
    for row in (HEADER_ROW + 1)..=last {
        let cells: Vec<&Data> = (0..STATEMENT_COLUMNS as u32)
            .map(|col| cell_at(range, row, col))
            .collect();

        let keep = match filter {
            RowFilter::Strict => !cells.iter().any(|cell| is_missing(cell)),
            RowFilter::Lenient => {
                !is_missing(cells[COL_CATEGORY as usize]) && !is_missing(cells[COL_CURRENT as usize])
            }
        };
        if !keep {
            tracing::trace!("Sheet {} row {} dropped by {:?} filter", sheet, row + 1, filter);
            continue;
        }

        rows.push(StatementRow {
            sheet_row: row + 1,
            category: cell_text(cells[COL_CATEGORY as usize]),
            current: Amount::from_cell(cells[COL_CURRENT as usize]),
            prior: Amount::from_cell(cells[COL_PRIOR as usize]),
            marker: cell_text(cells[COL_MARKER as usize]),
        });
    }

    tracing::debug!("Sheet {}: {} row(s) survive the {:?} filter", sheet, rows.len(), filter);
    Ok(rows)
}

/// Turns normalized rows into persistence-ready lines for `group`.
/// `notes` is `None` for sections that are not cross-referenced.
pub fn build_lines(
    group: StatementGroup,
    rows: &[StatementRow],
    filing: &FilingInfo,
    notes: Option<&NoteIndex>,
    pairing: NotePairing,
) -> StatementExtraction {
    let mut unparsed_values = 0;
    let mut lines = Vec::with_capacity(rows.len());

    for (ordinal, row) in rows.iter().enumerate() {
        for (column, amount) in [("current", &row.current), ("prior", &row.prior)] {
            // Blank cells only reach here under the lenient filter.
            if let Amount::Unparsed(raw) = amount {
                if raw.is_empty() {
                    continue;
                }
                unparsed_values += 1;
                tracing::warn!(
                    "Unparsed {} amount on sheet {} row {}: {:?}",
                    column,
                    group.sheet_code(),
                    row.sheet_row,
                    raw
                );
            }
        }

        let note = notes.and_then(|index| match pairing {
            NotePairing::Positional => index.at(ordinal),
            NotePairing::ByLabel => index.for_label(&row.category),
        });

        let item = if row.category.is_empty() {
            MISSING_ITEM.to_string()
        } else {
            row.category.clone()
        };
        tracing::debug!("Staging {}: item {:?} [{}], note {:?}", group, item, row.marker, note);

        lines.push(StatementLine {
            emitent: filing.emitent.clone(),
            group,
            item,
            value: row.current.truncated(),
            period: filing.period.clone(),
            notes: note.map(str::to_string),
        });
    }

    StatementExtraction { group, lines, unparsed_values }
}

/// Extracts one statement section from the workbook.
pub fn extract_statement<W: Workbook>(
    workbook: &mut W,
    group: StatementGroup,
    filing: &FilingInfo,
    notes: Option<&NoteIndex>,
    filter: RowFilter,
    pairing: NotePairing,
) -> Result<StatementExtraction, ExtractError> {
    let sheet = group.sheet_code();
    let range = workbook.sheet(sheet)?;
    tracing::trace!("Sheet {} ({}) spans {:?}..{:?}", sheet, group, range.start(), range.end());

    let rows = read_statement_rows(&range, sheet, filter)?;
    Ok(build_lines(group, &rows, filing, notes, pairing))
}
