//! Configuration infrastructure
//!
//! Loading and management of the audit configuration file. On first run a
//! default configuration is materialized under the user config directory so
//! operators have a concrete file to edit the target list into.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;
use url::Url;

use crate::domain::Target;

/// Default values for the generated configuration file.
pub mod defaults {
    pub const LIBINSIGHT_BASE_URL: &str = "https://acaweb.libinsight.com";
    pub const LIBAPPS_BASE_URL: &str = "https://acaweb.libapps.com";
    pub const LOGIN_SITE_ID: u32 = 25079;
    pub const WEBDRIVER_URL: &str = "http://localhost:9515";

    pub const LOGIN_WAIT_SECS: u64 = 10;
    pub const TABLE_WAIT_SECS: u64 = 10;
    pub const ROWS_WAIT_SECS: u64 = 5;
    pub const MODAL_WAIT_SECS: u64 = 10;
    pub const POLL_INTERVAL_MS: u64 = 250;

    pub const OUTPUT_DIRECTORY: &str = "output";
    pub const LOG_LEVEL: &str = "info";
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub console: ConsoleConfig,

    /// Ordered list of dataset/platform pages to audit. Order is preserved
    /// in the report.
    pub targets: Vec<Target>,

    /// When true, disabled schedules are re-enabled through the console's
    /// edit modal during the run.
    pub auto_enable_disabled: bool,

    pub waits: WaitConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Addresses and identifiers of the hosted console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub libinsight_base_url: String,
    pub libapps_base_url: String,
    pub login_site_id: u32,
    /// WebDriver endpoint the browser session is started against.
    pub webdriver_url: String,
}

impl ConsoleConfig {
    pub fn login_url(&self) -> String {
        format!(
            "{}/libapps/login.php?site_id={}&target=admin/welcome",
            self.libapps_base_url, self.login_site_id
        )
    }

    pub fn platform_url(&self, target: &Target) -> String {
        format!(
            "{}/admin/eresources/{}/platforms/{}/add",
            self.libinsight_base_url, target.dataset_id, target.platform_id
        )
    }

    /// Reject unparseable base URLs before the browser session is started.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.libinsight_base_url)
            .with_context(|| format!("invalid libinsight_base_url: {}", self.libinsight_base_url))?;
        Url::parse(&self.libapps_base_url)
            .with_context(|| format!("invalid libapps_base_url: {}", self.libapps_base_url))?;
        Url::parse(&self.webdriver_url)
            .with_context(|| format!("invalid webdriver_url: {}", self.webdriver_url))?;
        Ok(())
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            libinsight_base_url: defaults::LIBINSIGHT_BASE_URL.to_string(),
            libapps_base_url: defaults::LIBAPPS_BASE_URL.to_string(),
            login_site_id: defaults::LOGIN_SITE_ID,
            webdriver_url: defaults::WEBDRIVER_URL.to_string(),
        }
    }
}

/// Upper bounds for every suspension point in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Login page elements and post-login landing.
    pub login_secs: u64,
    /// Schedule table root element.
    pub table_secs: u64,
    /// Table rows after the root appeared (expiry means an empty table, not
    /// an error).
    pub rows_secs: u64,
    /// Confirmation modal open/close during remediation.
    pub modal_secs: u64,
    pub poll_interval_ms: u64,
}

impl WaitConfig {
    pub fn login(&self) -> Duration {
        Duration::from_secs(self.login_secs)
    }

    pub fn table(&self) -> Duration {
        Duration::from_secs(self.table_secs)
    }

    pub fn rows(&self) -> Duration {
        Duration::from_secs(self.rows_secs)
    }

    pub fn modal(&self) -> Duration {
        Duration::from_secs(self.modal_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            login_secs: defaults::LOGIN_WAIT_SECS,
            table_secs: defaults::TABLE_WAIT_SECS,
            rows_secs: defaults::ROWS_WAIT_SECS,
            modal_secs: defaults::MODAL_WAIT_SECS,
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the timestamped report file is written into.
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(defaults::OUTPUT_DIRECTORY),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing level; RUST_LOG overrides it.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            console: ConsoleConfig::default(),
            // Starter targets from the consortium audit this tool was built
            // for; operators replace these with their own list.
            targets: vec![
                Target::new(38772, 151, "aca JSTOR", "Alice Lloyd College"),
                Target::new(38772, 152, "aca JSTOR", "Berea College"),
                Target::new(38993, 196, "aca Oxford Grove", "Alice Lloyd College"),
            ],
            auto_enable_disabled: false,
            waits: WaitConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration manager for loading and saving settings.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory.
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("failed to get user config directory")?
            .join("sushi-harvest-audit");
        Ok(config_dir)
    }

    /// Manager over the default config file location.
    pub fn new() -> Result<Self> {
        let config_path = Self::config_dir()?.join("sushi_harvest_audit.json");
        Ok(Self { config_path })
    }

    /// Manager over an explicit config file path (the `--config` flag).
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Load the configuration, materializing defaults on first run.
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        let config_dir = self
            .config_path
            .parent()
            .context("failed to get config directory")?;

        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .await
                .context("failed to create config directory")?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if self.config_path.exists() {
            self.load_config().await
        } else {
            info!(
                "First run detected - writing default configuration to {:?}",
                self.config_path
            );
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            Ok(default_config)
        }
    }

    pub async fn load_config(&self) -> Result<AppConfig> {
        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("failed to read config file {:?}", self.config_path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {:?}", self.config_path))?;

        config.console.validate()?;
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        let content =
            serde_json::to_string_pretty(config).context("failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("failed to write config file {:?}", self.config_path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_embeds_site_id_and_admin_target() {
        let console = ConsoleConfig::default();
        assert_eq!(
            console.login_url(),
            "https://acaweb.libapps.com/libapps/login.php?site_id=25079&target=admin/welcome"
        );
    }

    #[test]
    fn platform_url_embeds_dataset_and_platform() {
        let console = ConsoleConfig::default();
        let target = Target::new(38772, 151, "aca JSTOR", "Alice Lloyd College");
        assert_eq!(
            console.platform_url(&target),
            "https://acaweb.libinsight.com/admin/eresources/38772/platforms/151/add"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let console = ConsoleConfig {
            libinsight_base_url: "not a url".to_string(),
            ..ConsoleConfig::default()
        };
        assert!(console.validate().is_err());
    }

    #[tokio::test]
    async fn first_run_materializes_defaults_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.json"));

        let written = manager.initialize_on_first_run().await.unwrap();
        assert!(!written.auto_enable_disabled);
        assert_eq!(written.targets.len(), 3);

        let reloaded = manager.load_config().await.unwrap();
        assert_eq!(reloaded.targets, written.targets);
        assert_eq!(reloaded.waits.login_secs, defaults::LOGIN_WAIT_SECS);
    }
}
