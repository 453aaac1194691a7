//! Rendered-page capability layer
//!
//! The audit engine never talks to the browser directly; it depends on the
//! [`PageDriver`] contract (navigate, bounded waits, element reads, clicks).
//! [`WebDriverPage`] binds that contract to a live WebDriver session;
//! `test_support::FakePage` replays canned page states for tests.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;
use tokio::time::{sleep, Instant};

/// How an element is located on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// CSS id shorthand.
    pub fn id(id: &str) -> Self {
        Self::Css(format!("#{id}"))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css `{s}`"),
            Self::XPath(s) => write!(f, "xpath `{s}`"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PageError {
    #[error("timed out after {timeout:?} waiting for {locator}")]
    Timeout { locator: String, timeout: Duration },

    #[error("element not found: {locator}")]
    NotFound { locator: String },

    #[error("webdriver failure: {0}")]
    Driver(String),
}

impl PageError {
    pub fn timeout(locator: &Locator, timeout: Duration) -> Self {
        Self::Timeout {
            locator: locator.to_string(),
            timeout,
        }
    }

    pub fn not_found(locator: &Locator) -> Self {
        Self::NotFound {
            locator: locator.to_string(),
        }
    }
}

impl From<WebDriverError> for PageError {
    fn from(err: WebDriverError) -> Self {
        Self::Driver(err.to_string())
    }
}

pub type PageResult<T> = Result<T, PageError>;

/// Capability contract over one browser session's current page.
///
/// Every wait is bounded by an explicit timeout; an expired wait surfaces as
/// [`PageError::Timeout`], never as a hang. Implementations hold exactly one
/// page at a time, so callers operate strictly in turn.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> PageResult<()>;

    async fn current_url(&self) -> PageResult<String>;

    /// Block until at least one element matches, up to `timeout`.
    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> PageResult<()>;

    /// Block until no element matches, up to `timeout`.
    async fn wait_gone(&self, locator: &Locator, timeout: Duration) -> PageResult<()>;

    async fn exists(&self, locator: &Locator) -> PageResult<bool>;

    /// Number of elements currently matching the locator.
    async fn count(&self, locator: &Locator) -> PageResult<usize>;

    /// Text content of the first matching element.
    ///
    /// Reads the DOM `textContent` rather than the visible text: the console
    /// fills the schedule table after the initial render and visible-text
    /// reads come back empty.
    async fn read_text(&self, locator: &Locator) -> PageResult<String>;

    async fn read_attr(&self, locator: &Locator, name: &str) -> PageResult<Option<String>>;

    /// Whether the first matching element (radio/checkbox) is selected.
    async fn is_selected(&self, locator: &Locator) -> PageResult<bool>;

    /// Type text into the first matching element.
    async fn fill(&self, locator: &Locator, text: &str) -> PageResult<()>;

    async fn click(&self, locator: &Locator) -> PageResult<()>;
}

/// Connection settings for the real browser session.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// WebDriver endpoint, e.g. a local chromedriver.
    pub server_url: String,
    pub headless: bool,
    /// Poll interval for the bounded waits.
    pub poll_interval: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9515".to_string(),
            headless: false,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// [`PageDriver`] implementation over a live WebDriver (Chrome) session.
///
/// Cloning clones the session handle, not the session: all clones drive the
/// one browser, and [`Self::quit`] through any of them ends it. The entry
/// point relies on this to close the browser on every exit path.
#[derive(Clone)]
pub struct WebDriverPage {
    driver: WebDriver,
    poll_interval: Duration,
}

impl WebDriverPage {
    /// Start a browser session against the configured WebDriver endpoint.
    pub async fn connect(config: &WebDriverConfig) -> PageResult<Self> {
        let mut caps = ChromeCapabilities::new();
        caps.add_arg("--start-maximized")?;
        caps.add_arg("--disable-blink-features=AutomationControlled")?;
        if config.headless {
            caps.set_headless()?;
        }

        let driver = WebDriver::new(&config.server_url, caps).await?;
        Ok(Self {
            driver,
            poll_interval: config.poll_interval,
        })
    }

    /// End the browser session. Errors here are the caller's to log; the run
    /// result is already decided by this point.
    pub async fn quit(self) -> PageResult<()> {
        self.driver.quit().await?;
        Ok(())
    }

    fn by(locator: &Locator) -> By {
        match locator {
            Locator::Css(s) => By::Css(s.as_str()),
            Locator::XPath(s) => By::XPath(s.as_str()),
        }
    }

    async fn find_one(&self, locator: &Locator) -> PageResult<WebElement> {
        let mut found = self.driver.find_all(Self::by(locator)).await?;
        if found.is_empty() {
            return Err(PageError::not_found(locator));
        }
        Ok(found.remove(0))
    }
}

#[async_trait]
impl PageDriver for WebDriverPage {
    async fn navigate(&self, url: &str) -> PageResult<()> {
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> PageResult<String> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> PageResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(locator).await? > 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PageError::timeout(locator, timeout));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn wait_gone(&self, locator: &Locator, timeout: Duration) -> PageResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count(locator).await? == 0 {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(PageError::timeout(locator, timeout));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn exists(&self, locator: &Locator) -> PageResult<bool> {
        Ok(self.count(locator).await? > 0)
    }

    async fn count(&self, locator: &Locator) -> PageResult<usize> {
        Ok(self.driver.find_all(Self::by(locator)).await?.len())
    }

    async fn read_text(&self, locator: &Locator) -> PageResult<String> {
        let element = self.find_one(locator).await?;
        let text = element.attr("textContent").await?.unwrap_or_default();
        Ok(text.trim().to_string())
    }

    async fn read_attr(&self, locator: &Locator, name: &str) -> PageResult<Option<String>> {
        let element = self.find_one(locator).await?;
        Ok(element.attr(name).await?)
    }

    async fn is_selected(&self, locator: &Locator) -> PageResult<bool> {
        let element = self.find_one(locator).await?;
        Ok(element.is_selected().await?)
    }

    async fn fill(&self, locator: &Locator, text: &str) -> PageResult<()> {
        let element = self.find_one(locator).await?;
        element.send_keys(text).await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> PageResult<()> {
        let element = self.find_one(locator).await?;
        element.click().await?;
        Ok(())
    }
}
