//! Command-line entry point for the harvest audit.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use sushi_harvest_audit::audit::{authenticate, AuditRunner, AuthError};
use sushi_harvest_audit::domain::Credentials;
use sushi_harvest_audit::infrastructure::config::{AppConfig, ConfigManager};
use sushi_harvest_audit::infrastructure::page::{WebDriverConfig, WebDriverPage};
use sushi_harvest_audit::infrastructure::{credentials, logging, ReportWriter};

/// Authentication failed; no target was processed and no report exists.
const EXIT_AUTH_FAILED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "sushi-harvest-audit", version, about)]
struct Cli {
    /// Path to the configuration file (defaults to the user config dir).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Re-enable disabled schedules during this run.
    #[arg(long)]
    auto_enable: bool,

    /// Override the configured report output directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Run the browser headless.
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // Config errors can arrive before logging is initialized.
            eprintln!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new()?,
    };
    let mut config = manager.initialize_on_first_run().await?;
    apply_cli_overrides(&mut config, &cli);

    logging::init_logging(&config.logging)?;

    if config.targets.is_empty() {
        warn!(
            "No targets configured; edit {:?} and re-run",
            manager.config_path
        );
        return Ok(ExitCode::SUCCESS);
    }

    // Read once, never logged, dropped with this scope.
    let creds = credentials::collect()?;

    let driver_config = WebDriverConfig {
        server_url: config.console.webdriver_url.clone(),
        headless: cli.headless,
        poll_interval: config.waits.poll_interval(),
    };
    let page = WebDriverPage::connect(&driver_config)
        .await
        .context("failed to start the browser session")?;

    // A second handle to the one session, so the browser is closed no matter
    // how the audit exits.
    let browser = page.clone();
    let outcome = run_audit(page, &config, &creds).await;
    if let Err(e) = browser.quit().await {
        warn!("Failed to close the browser session: {e}");
    }
    outcome
}

async fn run_audit(
    page: WebDriverPage,
    config: &AppConfig,
    creds: &Credentials,
) -> Result<ExitCode> {
    let session = match authenticate(page, &config.console, &config.waits, creds).await {
        Ok(session) => session,
        Err(e @ (AuthError::CredentialRejected | AuthError::MfaRejected | AuthError::Timeout { .. })) => {
            error!("Authentication failed: {e}");
            return Ok(ExitCode::from(EXIT_AUTH_FAILED));
        }
        Err(e) => return Err(e).context("browser session failed during login"),
    };

    let runner = AuditRunner::new(
        &session,
        &config.console,
        &config.waits,
        config.auto_enable_disabled,
    );
    let report = runner.run(&config.targets).await;

    let writer = ReportWriter::new(config.output.directory.clone());
    let path = writer.write(&report).context("failed to write the report")?;

    let summary = report.summary();
    info!("Run complete: report at {path:?}");
    info!("Total schedules processed: {}", summary.total_schedules);
    info!("Schedules with errors: {}", summary.schedules_with_errors);
    info!("Disabled schedules: {}", summary.disabled_schedules);
    if summary.failed_targets > 0 {
        warn!("{} target/remediation failure(s); see log above", summary.failed_targets);
    }
    if summary.disabled_schedules > 0 && !config.auto_enable_disabled {
        warn!("Auto-enable is off; pass --auto-enable or set auto_enable_disabled to fix them");
    }

    Ok(ExitCode::SUCCESS)
}

fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) {
    if cli.auto_enable {
        config.auto_enable_disabled = true;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.clone();
    }
}
