//! SUSHI harvest audit for the LibInsight admin console
//!
//! Logs into the console through its multi-factor login, visits each
//! configured dataset/platform page, extracts the rendered SUSHI schedule
//! status table into typed records, optionally re-enables disabled
//! schedules, and writes one consolidated CSV report per run.

pub mod audit;
pub mod domain;
pub mod infrastructure;
pub mod test_support;
