// src/utils/text_debug.rs
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::RunSummary;
use crate::utils::error::AppError;

/// Renders `text` with every highlight wrapped as `[[kind:matched text]]`.
/// Overlapping highlights are skipped after the first one that starts earlier.
pub fn annotate_text(text: &str, highlights: &[(usize, usize, &str)]) -> String {
    let mut annotated = String::with_capacity(text.len() + highlights.len() * 8);
    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| h.0); // Sort by position

    for (start, end, kind) in sorted_highlights {
        if start < last_pos {
            continue;
        }
        annotated.push_str(&text[last_pos..start]);
        annotated.push_str("[[");
        annotated.push_str(kind);
        annotated.push(':');
        annotated.push_str(&text[start..end]);
        annotated.push_str("]]");
        last_pos = end;
    }

    if last_pos < text.len() {
        annotated.push_str(&text[last_pos..]);
    }
    annotated
}

/// Writes a copy of the scanned document text with every match of the given
/// regex patterns marked, so misattributed notes can be traced by eye.
pub fn create_debug_text(text: &str, path: &Path, patterns: &[(&str, &str)]) -> Result<(), AppError> {
    use regex::Regex;

    let mut highlights = Vec::new();
    for (pattern, kind) in patterns {
        let re = Regex::new(pattern).map_err(|e| {
            AppError::Config(format!("Invalid regex pattern '{}': {}", pattern, e))
        })?;

        for mat in re.find_iter(text) {
            highlights.push((mat.start(), mat.end(), *kind));
        }
    }

    let mut file = File::create(path)?;
    file.write_all(annotate_text(text, &highlights).as_bytes())?;

    tracing::info!("Saved annotated note text to {} ({} markers)", path.display(), highlights.len());
    Ok(())
}

/// Saves the run summary as pretty JSON next to the other debug artifacts.
pub fn save_run_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)?;
    let path = dir.join("run_summary.json");

    let metadata = serde_json::json!({
        "emitent": summary.emitent,
        "period": summary.period,
        "groups": summary.groups,
        "unparsed_values": summary.unparsed_values,
        "committed_rows": summary.committed_rows,
        "written_at": chrono::Utc::now().to_rfc3339(),
    });
    fs::write(&path, serde_json::to_string_pretty(&metadata)?)?;

    tracing::info!("Saved run summary to {}", path.display());
    Ok(path)
}
