// src/filing/mod.rs
pub mod general;
pub mod models;
pub mod workbook;

// Re-export key filing types for convenience
#[allow(unused_imports)]
pub use models::{FilingInfo, StatementGroup, StatementLine};
#[allow(unused_imports)]
pub use workbook::{Workbook, XlsxWorkbook};
