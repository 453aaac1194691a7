//! Domain model for the harvest audit
//!
//! Plain data types shared by the audit engine and the infrastructure layer.

pub mod credentials;
pub mod entities;

pub use credentials::Credentials;
pub use entities::{
    EnabledState, FailureNote, RunReport, RunSummary, ScheduleRecord, Target, TargetOutcome,
};
