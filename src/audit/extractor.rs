//! Schedule table extraction
//!
//! Turns the rendered SUSHI schedule table on a loaded target page into
//! typed [`ScheduleRecord`] values. The console fills the table after the
//! initial render, so cell reads go through `textContent` and the row wait
//! is separate from the table-root wait: a root that never appears is an
//! error, rows that never appear mean the table is empty.

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{EnabledState, ScheduleRecord, Target};
use crate::infrastructure::config::WaitConfig;
use crate::infrastructure::page::{Locator, PageDriver, PageError};

const TABLE_ROOT: &str = "#schedule-table";
const TABLE_ROWS: &str = "#schedule-table tbody tr";

/// The table has seven fixed-position columns: schedule id, report type,
/// vendor, frequency, recurring-until, last fetch, enabled.
const EXPECTED_CELLS: usize = 7;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("schedule table never rendered (dataset {dataset_id}, platform {platform_id})")]
    TableNotFound { dataset_id: u64, platform_id: u64 },

    #[error(transparent)]
    Page(#[from] PageError),
}

/// Extract every schedule row on the current page.
///
/// An empty table yields an empty vector, not an error. A row that cannot be
/// read is skipped with a warning; the remaining rows are still extracted.
pub async fn extract_schedules<D: PageDriver>(
    page: &D,
    target: &Target,
    waits: &WaitConfig,
) -> Result<Vec<ScheduleRecord>, ExtractionError> {
    match page.wait_for(&Locator::css(TABLE_ROOT), waits.table()).await {
        Ok(()) => {}
        Err(PageError::Timeout { .. }) => {
            return Err(ExtractionError::TableNotFound {
                dataset_id: target.dataset_id,
                platform_id: target.platform_id,
            })
        }
        Err(other) => return Err(other.into()),
    }

    // Rows render late; an expired wait here means the table is empty.
    // Anything other than a timeout is a real driver failure and propagates.
    match page.wait_for(&Locator::css(TABLE_ROWS), waits.rows()).await {
        Ok(()) => {}
        Err(PageError::Timeout { .. }) => {
            debug!("Schedule table present but empty for {target}");
            return Ok(Vec::new());
        }
        Err(other) => return Err(other.into()),
    }

    let row_count = page.count(&Locator::css(TABLE_ROWS)).await?;
    debug!("Found {row_count} schedule rows for {target}");

    let mut records = Vec::with_capacity(row_count);
    for row in 1..=row_count {
        match extract_row(page, target, row).await {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {
                warn!("Skipping malformed row {row} on {target}: fewer than {EXPECTED_CELLS} cells");
            }
            Err(e) => {
                warn!("Failed to read row {row} on {target}: {e}");
            }
        }
    }

    Ok(records)
}

/// Read one 1-based table row. `Ok(None)` marks a row with too few cells.
async fn extract_row<D: PageDriver>(
    page: &D,
    target: &Target,
    row: usize,
) -> Result<Option<ScheduleRecord>, PageError> {
    let cell_count = page
        .count(&Locator::css(&format!("{TABLE_ROWS}:nth-child({row}) td")))
        .await?;
    if cell_count < EXPECTED_CELLS {
        return Ok(None);
    }

    let mut cells = Vec::with_capacity(EXPECTED_CELLS);
    for column in 1..=EXPECTED_CELLS {
        let locator = Locator::css(&format!("{TABLE_ROWS}:nth-child({row}) td:nth-child({column})"));
        cells.push(page.read_text(&locator).await?);
    }

    let last_fetch = cells[5].clone();
    let has_error = ScheduleRecord::detect_error(&last_fetch);

    Ok(Some(ScheduleRecord {
        library: target.library_name.clone(),
        dataset_name: target.dataset_name.clone(),
        schedule_id: cells[0].clone(),
        report_type: cells[1].clone(),
        vendor: cells[2].clone(),
        frequency: cells[3].clone(),
        recurring_until: cells[4].clone(),
        last_fetch,
        enabled: EnabledState::from_indicator(&cells[6]),
        has_error,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakePage, PageState};

    const PAGE_URL: &str = "https://acaweb.libinsight.com/admin/eresources/38772/platforms/151/add";

    fn fast_waits() -> WaitConfig {
        WaitConfig {
            login_secs: 0,
            table_secs: 0,
            rows_secs: 0,
            modal_secs: 0,
            poll_interval_ms: 1,
        }
    }

    fn target() -> Target {
        Target::new(38772, 151, "aca JSTOR", "Alice Lloyd College")
    }

    async fn loaded(state: PageState) -> FakePage {
        let page = FakePage::new();
        page.add_state("platform", state);
        page.route(PAGE_URL, "platform");
        page.navigate(PAGE_URL).await.unwrap();
        page
    }

    #[tokio::test]
    async fn extracts_every_row_in_table_order() {
        let page = loaded(
            PageState::new(PAGE_URL)
                .with_schedule_row(
                    1,
                    ["101", "TR_J1", "JSTOR", "Monthly", "2026-12-31", "2026-08-01 Success", "Yes"],
                )
                .with_schedule_row(
                    2,
                    ["102", "TR_J4", "JSTOR", "Monthly", "2026-12-31", "2026-08-01 Success", "No"],
                ),
        )
        .await;

        let records = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].schedule_id, "101");
        assert_eq!(records[0].enabled, EnabledState::Yes);
        assert_eq!(records[0].library, "Alice Lloyd College");
        assert_eq!(records[0].dataset_name, "aca JSTOR");
        assert_eq!(records[1].schedule_id, "102");
        assert_eq!(records[1].enabled, EnabledState::No);
    }

    #[tokio::test]
    async fn missing_table_is_table_not_found() {
        let page = loaded(PageState::new(PAGE_URL)).await;

        let err = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::TableNotFound {
                dataset_id: 38772,
                platform_id: 151
            }
        ));
    }

    #[tokio::test]
    async fn empty_table_yields_zero_records_not_an_error() {
        let page = loaded(PageState::new(PAGE_URL).with_empty_schedule_table()).await;

        let records = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn driver_failure_on_row_wait_is_an_error_not_an_empty_table() {
        // The table root rendered, then the browser session died.
        let state = PageState::new(PAGE_URL)
            .with_empty_schedule_table()
            .with_broken_element(
                &Locator::css("#schedule-table tbody tr"),
                "invalid session id: session deleted",
            );
        let page = loaded(state).await;

        let err = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Page(PageError::Driver(_))));
    }

    #[tokio::test]
    async fn error_marker_in_last_fetch_sets_has_error_and_keeps_text_verbatim() {
        let raw = "2026-08-01 14:02\nSushi Error (code 3030):\nRequestor not authorized";
        let page = loaded(PageState::new(PAGE_URL).with_schedule_row(
            1,
            ["103", "DR_D1", "Oxford", "Monthly", "2026-12-31", raw, "Yes"],
        ))
        .await;

        let records = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap();
        assert!(records[0].has_error);
        assert_eq!(records[0].last_fetch, raw);
    }

    #[tokio::test]
    async fn unrecognized_enabled_indicator_maps_to_no() {
        let page = loaded(PageState::new(PAGE_URL).with_schedule_row(
            1,
            ["104", "TR_J1", "JSTOR", "Monthly", "2026-12-31", "ok", "Suspended"],
        ))
        .await;

        let records = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap();
        assert_eq!(records[0].enabled, EnabledState::No);
    }

    #[tokio::test]
    async fn short_rows_are_skipped_but_others_survive() {
        let state = PageState::new(PAGE_URL)
            .with_schedule_row(
                2,
                ["102", "TR_J4", "JSTOR", "Monthly", "2026-12-31", "ok", "Yes"],
            )
            // Row 1 is a spacer with a single cell.
            .with_short_schedule_row(1, 1);
        let page = loaded(state).await;

        let records = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].schedule_id, "102");
    }

    #[tokio::test]
    async fn extraction_is_idempotent_on_an_unchanged_page() {
        let page = loaded(PageState::new(PAGE_URL).with_schedule_row(
            1,
            ["101", "TR_J1", "JSTOR", "Monthly", "2026-12-31", "ok", "Yes"],
        ))
        .await;

        let first = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap();
        let second = extract_schedules(&page, &target(), &fast_waits())
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
