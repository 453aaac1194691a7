//! Audit engine
//!
//! The authenticated extraction-and-remediation core: login state machine,
//! per-target run loop with failure isolation, schedule table extraction,
//! and the conditional enable action.

pub mod extractor;
pub mod remediation;
pub mod runner;
pub mod session;

pub use extractor::{extract_schedules, ExtractionError};
pub use remediation::{enable_schedule, RemediationError};
pub use runner::AuditRunner;
pub use session::{authenticate, AuthError, AuthenticatedSession};
