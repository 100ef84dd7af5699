// src/pipeline.rs
//! One run: resolve the filer, extract the three statements, stage them and
//! commit them together.

use serde::Serialize;

use crate::extractors::notes::NoteSource;
use crate::extractors::statement::{extract_statement, NotePairing, RowFilter, StatementExtraction};
use crate::filing::general::resolve_filing;
use crate::filing::models::{FilingInfo, StatementGroup};
use crate::filing::workbook::Workbook;
use crate::storage::StatementStore;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub period_override: Option<String>,
    pub row_filter: RowFilter,
    pub note_pairing: NotePairing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub group: StatementGroup,
    pub lines: usize,
}

/// What a committed run wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub emitent: String,
    pub period: String,
    pub groups: Vec<GroupCount>,
    pub unparsed_values: usize,
    pub committed_rows: usize,
}

/// Extracts a single section, loading notes first when the section is
/// cross-referenced.
pub fn extract_group<W: Workbook, N: NoteSource>(
    workbook: &mut W,
    notes: &N,
    group: StatementGroup,
    filing: &FilingInfo,
    options: &PipelineOptions,
) -> Result<StatementExtraction, AppError> {
    let index = if group.uses_notes() {
        let index = notes.load_index()?;
        tracing::debug!("{} note reference(s) available for {}", index.len(), group);
        if index.is_empty() {
            tracing::warn!("No note references found for {}", group);
        }
        Some(index)
    } else {
        None
    };

    let extraction = extract_statement(
        workbook,
        group,
        filing,
        index.as_ref(),
        options.row_filter,
        options.note_pairing,
    )?;

    tracing::info!("{} data extracted: {} line(s)", extraction.group, extraction.lines.len());
    Ok(extraction)
}

/// Runs the whole load. Nothing is written unless every section extracts
/// and every insert succeeds.
pub async fn run<W: Workbook, N: NoteSource>(
    workbook: &mut W,
    notes: &N,
    store: &StatementStore,
    options: &PipelineOptions,
) -> Result<RunSummary, AppError> {
    let filing = resolve_filing(workbook, options.period_override.as_deref())?;
    tracing::info!("Loading statements for {} ({})", filing.emitent, filing.period);

    let mut session = store.session();
    let mut groups = Vec::with_capacity(StatementGroup::ALL.len());
    let mut unparsed_values = 0;

    for group in StatementGroup::ALL {
        match extract_group(workbook, notes, group, &filing, options) {
            Ok(extraction) => {
                groups.push(GroupCount {
                    group,
                    lines: extraction.lines.len(),
                });
                unparsed_values += extraction.unparsed_values;
                session.extend(extraction.lines);
            }
            Err(e) => {
                tracing::error!("Extraction of {} failed: {}", group, e);
                session.discard();
                return Err(e);
            }
        }
    }

    tracing::debug!("Staged {} line(s) for commit", session.staged().len());
    let committed_rows = session.commit().await.map_err(|e| {
        tracing::error!("Commit for {} failed: {}", filing.emitent, e);
        AppError::from(e)
    })?;

    if unparsed_values > 0 {
        tracing::warn!("{} amount(s) could not be parsed and were stored as 0", unparsed_values);
    }

    Ok(RunSummary {
        emitent: filing.emitent,
        period: filing.period,
        groups,
        unparsed_values,
        committed_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::notes::StaticNotes;
    use crate::filing::general::LOOKUP_SHEET;
    use crate::filing::workbook::{text, MemoryWorkbook};
    use crate::storage::sqlite_store;
    use crate::utils::error::{ExtractError, StorageError};
    use calamine::Data;

    fn statement_sheet(rows: &[[&str; 4]]) -> Vec<Vec<Data>> {
        let mut sheet = vec![
            vec![text("Judul"), Data::Empty, Data::Empty, Data::Empty],
            vec![Data::Empty, text("Tahun berjalan"), text("Tahun lalu"), Data::Empty],
        ];
        sheet.extend(rows.iter().map(|row| row.iter().map(|cell| text(cell)).collect()));
        sheet
    }

    fn filing_workbook() -> MemoryWorkbook {
        MemoryWorkbook::new()
            .with_sheet(
                LOOKUP_SHEET,
                vec![
                    vec![text("Nama entitas"), text("PT Example Tbk")],
                    vec![text("Periode penyampaian laporan keuangan"), text("Tahunan")],
                ],
            )
            .with_sheet("1311000", statement_sheet(&[["Net Income", "1,000", "(200)", "x"]]))
            .with_sheet(
                "1510000",
                statement_sheet(&[
                    ["Kas masuk", "2,500", "2,000", "x"],
                    ["Kas keluar", "(1,200)", "(900)", "x"],
                ]),
            )
            .with_sheet("1210000", statement_sheet(&[["Kas", "300", "250", "x"]]))
    }

    #[tokio::test]
    async fn end_to_end_single_income_line() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;
        let mut workbook = MemoryWorkbook::new()
            .with_sheet(LOOKUP_SHEET, vec![vec![text("Nama entitas"), text("PT Example Tbk")]])
            .with_sheet("1311000", statement_sheet(&[["Net Income", "1,000", "(200)", "x"]]))
            .with_sheet("1510000", statement_sheet(&[]))
            .with_sheet("1210000", statement_sheet(&[]));
        let notes = StaticNotes("Note 1".into());
        let options = PipelineOptions {
            period_override: Some("Q1".into()),
            ..Default::default()
        };

        let summary = run(&mut workbook, &notes, &store, &options).await.unwrap();
        assert_eq!(summary.committed_rows, 1);
        assert_eq!(summary.emitent, "PT Example Tbk");

        let rows: Vec<(String, String, String, i64, Option<String>)> = sqlx::query_as(
            "SELECT emitent, grup_lk, item, value, notes FROM financial_statement",
        )
        .fetch_all(store.pool())
        .await
        .unwrap();
        assert_eq!(
            rows,
            vec![(
                "PT Example Tbk".to_string(),
                "IncomeStatement".to_string(),
                "Net Income".to_string(),
                1000,
                Some("1".to_string()),
            )]
        );
    }

    #[tokio::test]
    async fn full_run_commits_all_three_groups() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;
        let mut workbook = filing_workbook();
        let notes = StaticNotes("Catatan 21 dan Catatan 22\nNote 5".into());

        let summary = run(&mut workbook, &notes, &store, &PipelineOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.period, "FY");
        assert_eq!(summary.committed_rows, 4);
        assert_eq!(
            summary.groups.iter().map(|g| g.lines).collect::<Vec<_>>(),
            vec![1, 2, 1]
        );

        let rows: Vec<(String, String, i64, Option<String>)> = sqlx::query_as(
            "SELECT grup_lk, item, value, notes FROM financial_statement ORDER BY id",
        )
        .fetch_all(store.pool())
        .await
        .unwrap();
        assert_eq!(rows[0], ("IncomeStatement".into(), "Net Income".into(), 1000, Some("21".into())));
        // Each cross-referenced section pairs from the start of the note sequence.
        assert_eq!(rows[1], ("CashFlow".into(), "Kas masuk".into(), 2500, Some("21".into())));
        assert_eq!(rows[2], ("CashFlow".into(), "Kas keluar".into(), -1200, Some("22".into())));
        assert_eq!(rows[3], ("FinancialPosition".into(), "Kas".into(), 300, None));
    }

    #[tokio::test]
    async fn failing_third_group_leaves_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;
        store.ensure_table().await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_position BEFORE INSERT ON financial_statement
             WHEN NEW.grup_lk = 'FinancialPosition'
             BEGIN SELECT RAISE(ABORT, 'position rows rejected'); END",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let mut workbook = filing_workbook();
        let notes = StaticNotes("Note 1".into());
        let err = run(&mut workbook, &notes, &store, &PipelineOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(StorageError::Insert { .. })));
        assert_eq!(store.count_for_emitent("PT Example Tbk").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_statement_sheet_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;
        store.ensure_table().await.unwrap();

        let mut workbook = MemoryWorkbook::new()
            .with_sheet(
                LOOKUP_SHEET,
                vec![
                    vec![text("Nama entitas"), text("PT Example Tbk")],
                    vec![text("Periode penyampaian laporan keuangan"), text("Kuartal I")],
                ],
            )
            .with_sheet("1311000", statement_sheet(&[["Net Income", "1,000", "(200)", "x"]]))
            .with_sheet("1510000", statement_sheet(&[["Kas masuk", "10", "5", "x"]]));
        let notes = StaticNotes(String::new());

        let err = run(&mut workbook, &notes, &store, &PipelineOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Extraction(ExtractError::MissingSheet(ref sheet)) if sheet == "1210000"
        ));
        assert_eq!(store.count_for_emitent("PT Example Tbk").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rerunning_duplicates_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;
        let notes = StaticNotes("Note 1".into());

        run(&mut filing_workbook(), &notes, &store, &PipelineOptions::default())
            .await
            .unwrap();
        run(&mut filing_workbook(), &notes, &store, &PipelineOptions::default())
            .await
            .unwrap();

        // No natural key: the second run appends a second copy.
        assert_eq!(store.count_for_emitent("PT Example Tbk").await.unwrap(), 8);
    }

    #[test]
    fn notes_are_only_loaded_for_cross_referenced_groups() {
        struct Unreachable;
        impl NoteSource for Unreachable {
            fn load_text(&self) -> Result<String, crate::utils::error::NoteError> {
                Err(crate::utils::error::NoteError::Unreadable {
                    path: "missing.pdf".into(),
                    reason: "not found".into(),
                })
            }
        }

        let mut workbook = filing_workbook();
        let filing = FilingInfo {
            emitent: "PT Example Tbk".into(),
            period: "FY".into(),
        };
        let options = PipelineOptions::default();

        let position = extract_group(&mut workbook, &Unreachable, StatementGroup::FinancialPosition, &filing, &options);
        assert_eq!(position.unwrap().lines.len(), 1);

        let income = extract_group(&mut workbook, &Unreachable, StatementGroup::IncomeStatement, &filing, &options);
        assert!(matches!(income, Err(AppError::Notes(_))));
    }

    #[test]
    fn unreadable_notes_abort_before_commit() {
        let dir = tempfile::tempdir().unwrap();
        tokio_test::block_on(async {
            let store = sqlite_store(&dir).await;
            store.ensure_table().await.unwrap();
            let notes = crate::extractors::notes::PdfNotes::new(dir.path().join("absent.pdf"));

            let err = run(&mut filing_workbook(), &notes, &store, &PipelineOptions::default())
                .await
                .unwrap_err();

            assert!(matches!(err, AppError::Notes(_)));
            assert_eq!(store.count_for_emitent("PT Example Tbk").await.unwrap(), 0);
        });
    }
}
