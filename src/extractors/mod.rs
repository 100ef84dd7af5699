// src/extractors/mod.rs
pub mod notes;
pub mod statement;
pub mod value;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use notes::{NoteIndex, NoteSource, PdfNotes};
#[allow(unused_imports)]
pub use statement::{NotePairing, RowFilter, StatementExtraction};
