//! Infrastructure layer
//!
//! External collaborators of the audit engine: the browser session, the
//! configuration file, credential collection, logging, and the CSV report.

pub mod config;
pub mod credentials;
pub mod logging;
pub mod page;
pub mod report;

pub use config::{AppConfig, ConfigManager, ConsoleConfig, WaitConfig};
pub use page::{Locator, PageDriver, PageError, PageResult, WebDriverConfig, WebDriverPage};
pub use report::ReportWriter;
