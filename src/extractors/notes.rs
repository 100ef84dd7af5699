// src/extractors/notes.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lopdf::Document;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::error::NoteError;

/// Note reference marker: a "Catatan"/"Note" label, whitespace, then digits.
pub const NOTE_PATTERN: &str = r"(?i)(?:Catatan|Note)\s+(\d+)";

static NOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(NOTE_PATTERN).expect("Failed to compile NOTE_RE"));

/// How many characters of document text go into the debug log.
const PREVIEW_CHARS: usize = 1000;

/// Returns the note numbers in `text` in the order they appear.
pub fn extract_notes(text: &str) -> Vec<String> {
    NOTE_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Lowercases and collapses punctuation/whitespace so statement labels and
/// document labels compare equal.
pub fn normalize_label(label: &str) -> String {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Note references found in a document, both in reading order and keyed by
/// the label text preceding each marker on its line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteIndex {
    ordered: Vec<String>,
    by_label: HashMap<String, String>,
}

impl NoteIndex {
    pub fn from_text(text: &str) -> Self {
        let ordered = extract_notes(text);

        let mut by_label = HashMap::new();
        for line in text.lines() {
            let Some(caps) = NOTE_RE.captures(line) else { continue };
            let (Some(marker), Some(number)) = (caps.get(0), caps.get(1)) else { continue };

            let label = normalize_label(&line[..marker.start()]);
            if !label.is_empty() {
                by_label.entry(label).or_insert_with(|| number.as_str().to_string());
            }
        }

        tracing::debug!("Extracted {} note(s): {:?}", ordered.len(), ordered);
        Self { ordered, by_label }
    }

    /// Note at ordinal position `index`, if the sequence reaches that far.
    pub fn at(&self, index: usize) -> Option<&str> {
        self.ordered.get(index).map(String::as_str)
    }

    /// Note whose preceding label matches `label` after normalization.
    pub fn for_label(&self, label: &str) -> Option<&str> {
        self.by_label.get(&normalize_label(label)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

/// A document whose text carries note references.
pub trait NoteSource {
    /// Concatenated text of every page in document order.
    fn load_text(&self) -> Result<String, NoteError>;

    fn load_index(&self) -> Result<NoteIndex, NoteError> {
        let text = self.load_text()?;
        tracing::debug!(
            "Extracted text (first {} chars): {}",
            PREVIEW_CHARS,
            text.chars().take(PREVIEW_CHARS).collect::<String>()
        );
        Ok(NoteIndex::from_text(&text))
    }
}

/// Notes read from the text layer of a PDF.
#[derive(Debug, Clone)]
pub struct PdfNotes {
    path: PathBuf,
}

impl PdfNotes {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NoteSource for PdfNotes {
    fn load_text(&self) -> Result<String, NoteError> {
        let bytes = std::fs::read(&self.path).map_err(|e| NoteError::Unreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let document = Document::load_mem(&bytes).map_err(|e| NoteError::Unparsable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        let mut text = String::new();
        let pages = document.get_pages();
        for page_number in pages.keys() {
            match document.extract_text(&[*page_number]) {
                Ok(page_text) => text.push_str(&page_text),
                Err(e) => tracing::warn!("Skipping page {} of {}: {}", page_number, self.path.display(), e),
            }
        }

        tracing::info!("Read {} page(s), {} chars from {}", pages.len(), text.len(), self.path.display());
        Ok(text)
    }
}

/// Fixed text standing in for a document in tests.
#[cfg(test)]
pub(crate) struct StaticNotes(pub String);

#[cfg(test)]
impl NoteSource for StaticNotes {
    fn load_text(&self) -> Result<String, NoteError> {
        Ok(self.0.clone())
    }
}
