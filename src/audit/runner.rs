//! Audit run loop
//!
//! Iterates the configured targets in order over the one authenticated
//! session. Each target is processed in isolation: navigation, section
//! expansion, extraction, and optional remediation failures are converted to
//! failure notes on that target's outcome and the loop moves on. Only
//! authentication failures (handled before this loop starts) abort a run.

use tracing::{info, warn};

use crate::audit::extractor::extract_schedules;
use crate::audit::remediation::enable_schedule;
use crate::audit::session::AuthenticatedSession;
use crate::domain::{EnabledState, FailureNote, RunReport, Target, TargetOutcome};
use crate::infrastructure::config::{ConsoleConfig, WaitConfig};
use crate::infrastructure::page::{Locator, PageDriver};

/// Toggle button of the "Schedule Future SUSHI Harvesting" section; carries
/// a `collapsed` class while the table is hidden.
const SECTION_TOGGLE: &str = "//button[contains(text(), 'Schedule Future SUSHI Harvesting')]";

pub struct AuditRunner<'a, D: PageDriver> {
    session: &'a AuthenticatedSession<D>,
    console: &'a ConsoleConfig,
    waits: &'a WaitConfig,
    auto_enable: bool,
}

impl<'a, D: PageDriver> AuditRunner<'a, D> {
    pub fn new(
        session: &'a AuthenticatedSession<D>,
        console: &'a ConsoleConfig,
        waits: &'a WaitConfig,
        auto_enable: bool,
    ) -> Self {
        Self {
            session,
            console,
            waits,
            auto_enable,
        }
    }

    /// One full pass over the targets, in the caller's order.
    pub async fn run(&self, targets: &[Target]) -> RunReport {
        let mut report = RunReport::new();

        for target in targets {
            info!("Processing: {target}");
            let outcome = self.process_target(target).await;

            match &outcome.failure {
                Some(failure) => warn!("Target failed: {failure}"),
                None => info!(
                    "Extracted {} schedule(s) from {target}",
                    outcome.records.len()
                ),
            }
            for note in &outcome.remediation_notes {
                warn!("Remediation note: {note}");
            }

            report.absorb(outcome);
        }

        report
    }

    async fn process_target(&self, target: &Target) -> TargetOutcome {
        let page = self.session.page();

        if let Err(e) = page.navigate(&self.console.platform_url(target)).await {
            return TargetOutcome::failed(target.clone(), format!("navigation failed: {e}"));
        }

        self.expand_schedule_section(page).await;

        let mut records = match extract_schedules(page, target, self.waits).await {
            Ok(records) => records,
            Err(e) => return TargetOutcome::failed(target.clone(), e.to_string()),
        };

        let mut notes = Vec::new();
        if self.auto_enable {
            for record in &mut records {
                if record.enabled.is_enabled() {
                    continue;
                }
                match enable_schedule(page, &record.schedule_id, self.waits).await {
                    Ok(()) => {
                        info!(
                            "Schedule {} was disabled and has been auto-enabled",
                            record.schedule_id
                        );
                        record.enabled = EnabledState::AutoEnabled;
                    }
                    Err(e) => {
                        notes.push(FailureNote::for_target(
                            target,
                            format!("remediation failed for schedule {}: {e}", record.schedule_id),
                        ));
                    }
                }
            }
        }

        let mut outcome = TargetOutcome::success(target.clone(), records);
        outcome.remediation_notes = notes;
        outcome
    }

    /// Expand the harvesting section when the console renders it collapsed.
    /// An absent toggle means the section is already open; neither case is
    /// an error.
    async fn expand_schedule_section(&self, page: &D) {
        let toggle = Locator::xpath(SECTION_TOGGLE);
        match page.read_attr(&toggle, "class").await {
            Ok(Some(classes)) if classes.contains("collapsed") => {
                if let Err(e) = page.click(&toggle).await {
                    warn!("Failed to expand the harvesting section: {e}");
                }
            }
            Ok(_) => {}
            Err(_) => {} // no toggle on this page
        }
    }
}
