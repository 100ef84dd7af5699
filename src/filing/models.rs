// src/filing/models.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Item text stored when a row has no usable category label.
pub const MISSING_ITEM: &str = "N/A";

/// Longest period tag the `quarter` column accepts.
pub const MAX_PERIOD_LEN: usize = 10;

/// Statement section a line belongs to. Each section lives on its own sheet,
/// identified by a fixed numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementGroup {
    IncomeStatement,
    CashFlow,
    FinancialPosition,
}

impl StatementGroup {
    /// Extraction order of a run.
    pub const ALL: [StatementGroup; 3] = [
        StatementGroup::IncomeStatement,
        StatementGroup::CashFlow,
        StatementGroup::FinancialPosition,
    ];

    /// Sheet name holding this section.
    pub fn sheet_code(self) -> &'static str {
        match self {
            StatementGroup::IncomeStatement => "1311000",
            StatementGroup::CashFlow => "1510000",
            StatementGroup::FinancialPosition => "1210000",
        }
    }

    /// Value written to the `grup_lk` column.
    pub fn label(self) -> &'static str {
        match self {
            StatementGroup::IncomeStatement => "IncomeStatement",
            StatementGroup::CashFlow => "CashFlow",
            StatementGroup::FinancialPosition => "FinancialPosition",
        }
    }

    /// Whether lines of this section are cross-referenced with document notes.
    /// The balance sheet never is.
    pub fn uses_notes(self) -> bool {
        !matches!(self, StatementGroup::FinancialPosition)
    }
}

impl fmt::Display for StatementGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Filer identity resolved once per run and shared by every line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingInfo {
    pub emitent: String,
    pub period: String,
}

/// One persisted row of `financial_statement`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    pub emitent: String,
    pub group: StatementGroup,
    pub item: String,
    pub value: i64,
    pub period: String,
    pub notes: Option<String>,
}
