// src/main.rs
mod extractors;
mod filing;
mod pipeline;
mod storage;
mod utils;

use std::fmt;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use extractors::notes::NOTE_PATTERN;
use extractors::{NotePairing, NoteSource, PdfNotes, RowFilter};
use filing::general::validate_period_tag;
use filing::XlsxWorkbook;
use pipeline::PipelineOptions;
use storage::{redact_url, StatementStore};
use utils::AppError;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PairingArg {
    /// n-th statement row takes the n-th note in the document
    Positional,
    /// Match rows to notes by the label preceding each note reference
    Label,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RowFilterArg {
    /// Drop rows with any blank among the four statement columns
    Strict,
    /// Keep rows that have a label and a current-period amount
    Lenient,
}

/// Loads income statement, cash flow and financial position lines from a
/// filing workbook into the `financial_statement` table.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Filing workbook (.xlsx)
    #[arg(short, long, env = "FINSTMT_WORKBOOK", required_unless_present = "check_connection")]
    workbook: Option<PathBuf>,

    /// PDF with the notes to the financial statements
    #[arg(short, long, env = "FINSTMT_NOTES_DOCUMENT", required_unless_present = "check_connection")]
    notes_document: Option<PathBuf>,

    /// Database URL (mysql://, postgres:// or sqlite:)
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Period tag to store (e.g. Q1, FY); read from the workbook when omitted
    #[arg(short, long)]
    period: Option<String>,

    /// How statement rows are matched with note numbers
    #[arg(long, value_enum, default_value = "positional")]
    note_pairing: PairingArg,

    /// Which statement rows are kept
    #[arg(long, value_enum, default_value = "strict")]
    row_filter: RowFilterArg,

    /// Write annotated note text and a run summary to this directory
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Only check that the database is reachable, then exit
    #[arg(long)]
    check_connection: bool,
}

// Hand-written so the database password never reaches the logs.
impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("workbook", &self.workbook)
            .field("notes_document", &self.notes_document)
            .field("database_url", &redact_url(&self.database_url))
            .field("period", &self.period)
            .field("note_pairing", &self.note_pairing)
            .field("row_filter", &self.row_filter)
            .field("debug_dir", &self.debug_dir)
            .field("check_connection", &self.check_connection)
            .finish()
    }
}

impl Args {
    fn pipeline_options(&self) -> Result<PipelineOptions, AppError> {
        let period_override = self
            .period
            .as_deref()
            .map(validate_period_tag)
            .transpose()
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(PipelineOptions {
            period_override,
            row_filter: match self.row_filter {
                RowFilterArg::Strict => RowFilter::Strict,
                RowFilterArg::Lenient => RowFilter::Lenient,
            },
            note_pairing: match self.note_pairing {
                PairingArg::Positional => NotePairing::Positional,
                PairingArg::Label => NotePairing::ByLabel,
            },
        })
    }
}

fn required(path: &Option<PathBuf>, flag: &str) -> Result<PathBuf, AppError> {
    path.clone()
        .ok_or_else(|| AppError::Config(format!("{} is required", flag)))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::debug!("Starting with args: {:?}", args);
    let options = args.pipeline_options()?;

    // 3. Connect to the database
    let store = StatementStore::connect(&args.database_url).await?;

    if args.check_connection {
        let result = store.ping().await;
        match &result {
            Ok(()) => tracing::info!("Connection to {:?} database succeeded", store.backend()),
            Err(e) => tracing::error!("Connection check failed: {}", e),
        }
        store.close().await;
        return result.map_err(AppError::from);
    }

    // 4. Open inputs
    let workbook_path = required(&args.workbook, "--workbook")?;
    let notes_path = required(&args.notes_document, "--notes-document")?;
    let mut workbook = XlsxWorkbook::open(&workbook_path)?;
    let notes = PdfNotes::new(&notes_path);

    // 5. Extract and load everything in one transaction
    let result = pipeline::run(&mut workbook, &notes, &store, &options).await;
    drop(workbook);

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            tracing::error!("Load aborted, nothing was written: {}", e);
            store.close().await;
            return Err(e);
        }
    };

    // Verification query: rows now stored for this emitent across all runs.
    match store.count_for_emitent(&summary.emitent).await {
        Ok(stored) => tracing::info!("{} row(s) stored for {} in total", stored, summary.emitent),
        Err(e) => tracing::warn!("Could not count stored rows for {}: {}", summary.emitent, e),
    }
    store.close().await;

    for count in &summary.groups {
        tracing::info!("{}: {} line(s)", count.group, count.lines);
    }
    tracing::info!(
        "Processing finished for {} ({}). Committed: {}, unparsed amounts: {}",
        summary.emitent,
        summary.period,
        summary.committed_rows,
        summary.unparsed_values
    );

    // 6. Debug artifacts
    if let Some(debug_dir) = &args.debug_dir {
        std::fs::create_dir_all(debug_dir)?;
        match notes.load_text() {
            Ok(text) => {
                let path = debug_dir.join("notes_annotated.txt");
                if let Err(e) = utils::text_debug::create_debug_text(&text, &path, &[(NOTE_PATTERN, "note")]) {
                    tracing::warn!("Failed to write annotated note text: {}", e);
                }
            }
            Err(e) => tracing::warn!("Could not re-read {} for debugging: {}", notes.path().display(), e),
        }
        utils::text_debug::save_run_summary(debug_dir, &summary)?;
    }

    Ok(())
}
