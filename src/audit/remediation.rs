//! Schedule remediation
//!
//! Re-enables a disabled schedule through the console's edit modal: open the
//! row's edit control, switch the enable radio, save, and wait for the modal
//! to close. Every step is bounded; any failure leaves the schedule (and its
//! extracted record) untouched and is reported as a note on the surrounding
//! target.
//!
//! Remediation is never retried within a run. A transient UI timing failure
//! is surfaced for the operator to re-run.

use thiserror::Error;
use tracing::{debug, info};

use crate::infrastructure::config::WaitConfig;
use crate::infrastructure::page::{Locator, PageDriver, PageError};

const MODAL: &str = "div.modal-content";

fn edit_control(schedule_id: &str) -> Locator {
    Locator::xpath(format!(
        "//tr[td[text()='{schedule_id}']]//a[@title='Edit']"
    ))
}

fn enable_radio() -> Locator {
    Locator::xpath("//div[contains(@class,'modal-content')]//input[@type='radio' and @value='1']")
}

fn modal_button(label: &str) -> Locator {
    Locator::xpath(format!(
        "//div[contains(@class,'modal-content')]//button[text()='{label}']"
    ))
}

#[derive(Debug, Error)]
pub enum RemediationError {
    #[error("edit control for schedule {schedule_id} not found")]
    EditControlNotFound { schedule_id: String },

    #[error("confirmation modal never opened for schedule {schedule_id}")]
    ModalNeverOpened { schedule_id: String },

    #[error("enable confirmation for schedule {schedule_id} not accepted: {reason}")]
    NotConfirmed { schedule_id: String, reason: String },

    #[error(transparent)]
    Page(#[from] PageError),
}

/// Enable one disabled schedule through the confirmation modal.
///
/// Success means the caller may mark the record auto-enabled; on any error
/// the schedule's state on the console is unknown-but-unchanged-at-best and
/// the record must stay `No`.
pub async fn enable_schedule<D: PageDriver>(
    page: &D,
    schedule_id: &str,
    waits: &WaitConfig,
) -> Result<(), RemediationError> {
    debug!("Attempting to enable schedule {schedule_id}");

    match page.click(&edit_control(schedule_id)).await {
        Ok(()) => {}
        Err(PageError::NotFound { .. }) => {
            return Err(RemediationError::EditControlNotFound {
                schedule_id: schedule_id.to_string(),
            })
        }
        Err(other) => return Err(other.into()),
    }

    let modal = Locator::css(MODAL);
    match page.wait_for(&modal, waits.modal()).await {
        Ok(()) => {}
        Err(PageError::Timeout { .. }) => {
            return Err(RemediationError::ModalNeverOpened {
                schedule_id: schedule_id.to_string(),
            })
        }
        Err(other) => return Err(other.into()),
    }

    // The edit modal may show the schedule already enabled (the status cell
    // lags the console's own state). Close without touching anything.
    if page.is_selected(&enable_radio()).await? {
        info!("Schedule {schedule_id} is already enabled; closing modal");
        page.click(&modal_button("Close")).await?;
        return close_modal(page, schedule_id, waits, "modal did not close").await;
    }

    page.click(&enable_radio()).await?;
    page.click(&modal_button("Save")).await?;
    debug!("Save clicked for schedule {schedule_id}");

    close_modal(page, schedule_id, waits, "modal did not close after save").await?;
    info!("Schedule {schedule_id} has been enabled");
    Ok(())
}

async fn close_modal<D: PageDriver>(
    page: &D,
    schedule_id: &str,
    waits: &WaitConfig,
    reason: &str,
) -> Result<(), RemediationError> {
    match page.wait_gone(&Locator::css(MODAL), waits.modal()).await {
        Ok(()) => Ok(()),
        Err(PageError::Timeout { .. }) => Err(RemediationError::NotConfirmed {
            schedule_id: schedule_id.to_string(),
            reason: reason.to_string(),
        }),
        Err(other) => Err(other.into()),
    }
}
