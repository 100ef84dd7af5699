// src/filing/workbook.rs
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Range, Reader, Xlsx};

use crate::utils::error::ExtractError;

static EMPTY_CELL: Data = Data::Empty;

/// Read access to the sheets of a filing workbook.
pub trait Workbook {
    fn sheet_names(&self) -> Vec<String>;

    /// Loads a sheet by name. Missing sheets are `ExtractError::MissingSheet`.
    fn sheet(&mut self, name: &str) -> Result<Range<Data>, ExtractError>;
}

/// An `.xlsx` workbook opened from disk. The file handle lives as long as the
/// value and is released on drop.
pub struct XlsxWorkbook {
    path: PathBuf,
    inner: Xlsx<BufReader<File>>,
}

impl XlsxWorkbook {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExtractError> {
        let path = path.as_ref().to_path_buf();
        let inner: Xlsx<_> = open_workbook(&path).map_err(|e| {
            ExtractError::Workbook(format!("{}: {}", path.display(), e))
        })?;

        tracing::debug!("Opened workbook {} with sheets {:?}", path.display(), inner.sheet_names());
        Ok(Self { path, inner })
    }
}

impl Workbook for XlsxWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.inner.sheet_names()
    }

    fn sheet(&mut self, name: &str) -> Result<Range<Data>, ExtractError> {
        if !self.inner.sheet_names().iter().any(|s| s == name) {
            return Err(ExtractError::MissingSheet(name.to_string()));
        }
        self.inner.worksheet_range(name).map_err(|e| {
            ExtractError::Workbook(format!("{} sheet '{}': {}", self.path.display(), name, e))
        })
    }
}

/// Cell at an absolute (row, column) position; positions outside the used
/// range read as empty.
pub fn cell_at(range: &Range<Data>, row: u32, col: u32) -> &Data {
    range.get_value((row, col)).unwrap_or(&EMPTY_CELL)
}

/// Number of columns counted from column A up to the last used one.
pub fn column_count(range: &Range<Data>) -> usize {
    range.end().map(|(_, col)| col as usize + 1).unwrap_or(0)
}

/// Last used absolute row, if the sheet has any content.
pub fn last_row(range: &Range<Data>) -> Option<u32> {
    range.end().map(|(row, _)| row)
}

/// Text of a cell the way a reader of the sheet would see it.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// In-memory workbook used by tests in place of an xlsx file.
#[cfg(test)]
pub(crate) struct MemoryWorkbook {
    sheets: Vec<(String, Range<Data>)>,
}

#[cfg(test)]
impl MemoryWorkbook {
    pub(crate) fn new() -> Self {
        Self { sheets: Vec::new() }
    }

    pub(crate) fn with_sheet(mut self, name: &str, rows: Vec<Vec<Data>>) -> Self {
        self.sheets.push((name.to_string(), sheet_from_rows(rows)));
        self
    }
}

#[cfg(test)]
impl Workbook for MemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn sheet(&mut self, name: &str) -> Result<Range<Data>, ExtractError> {
        self.sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, range)| range.clone())
            .ok_or_else(|| ExtractError::MissingSheet(name.to_string()))
    }
}

/// Builds a range anchored at A1 from row-major cells.
#[cfg(test)]
pub(crate) fn sheet_from_rows(rows: Vec<Vec<Data>>) -> Range<Data> {
    let height = rows.len() as u32;
    let width = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
    if height == 0 || width == 0 {
        return Range::empty();
    }

    let mut range = Range::new((0, 0), (height - 1, width - 1));
    for (r, row) in rows.into_iter().enumerate() {
        for (c, cell) in row.into_iter().enumerate() {
            range.set_value((r as u32, c as u32), cell);
        }
    }
    range
}

/// Shorthand for a text cell in test sheets.
#[cfg(test)]
pub(crate) fn text(s: &str) -> Data {
    Data::String(s.to_string())
}
