//! Test utilities
//!
//! Provides [`FakePage`], a scripted [`PageDriver`] that replays canned page
//! states so the audit engine can be exercised without a browser. Shared by
//! the unit tests and the integration tests under `tests/`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::infrastructure::page::{Locator, PageDriver, PageError, PageResult};

/// One element (or group of identical elements) visible in a page state,
/// keyed by the exact locator the engine uses to reach it.
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub text: String,
    pub count: usize,
    pub attrs: HashMap<String, String>,
    pub selected: bool,
}

impl FakeElement {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            count: 1,
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

/// One rendered page as the engine would observe it.
#[derive(Debug, Clone, Default)]
pub struct PageState {
    /// URL the browser reports while this state is current.
    pub url: String,
    elements: HashMap<String, FakeElement>,
    /// Locator string -> name of the state a click transitions to.
    on_click: HashMap<String, String>,
    /// Locator string -> driver failure message returned on any access.
    broken: HashMap<String, String>,
}

impl PageState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_element(mut self, locator: &Locator, element: FakeElement) -> Self {
        self.elements.insert(locator_key(locator), element);
        self
    }

    pub fn with_elements(mut self, locator: &Locator, count: usize) -> Self {
        self.elements.insert(
            locator_key(locator),
            FakeElement {
                count,
                ..FakeElement::default()
            },
        );
        self
    }

    /// Any access to `locator` fails as the webdriver transport would when
    /// the browser session has died mid-run.
    pub fn with_broken_element(mut self, locator: &Locator, message: &str) -> Self {
        self.broken.insert(locator_key(locator), message.to_string());
        self
    }

    /// Clicking `locator` switches the fake to the named state.
    pub fn clicking_goes_to(mut self, locator: &Locator, state: &str) -> Self {
        self.on_click.insert(locator_key(locator), state.to_string());
        self
    }

    /// A schedule table that rendered but holds no rows.
    pub fn with_empty_schedule_table(self) -> Self {
        self.with_elements(&Locator::css("#schedule-table"), 1)
    }

    /// Register one schedule-table row the way the console renders it. Rows
    /// are 1-based; cell texts are the seven fixed columns.
    pub fn with_schedule_row(mut self, row: usize, cells: [&str; 7]) -> Self {
        self = self.with_empty_schedule_table();
        let rows = self
            .elements
            .entry(locator_key(&Locator::css("#schedule-table tbody tr")))
            .or_default();
        rows.count = rows.count.max(row);

        self = self.with_elements(
            &Locator::css(&format!("#schedule-table tbody tr:nth-child({row}) td")),
            cells.len(),
        );
        for (i, cell) in cells.iter().enumerate() {
            self = self.with_element(
                &Locator::css(&format!(
                    "#schedule-table tbody tr:nth-child({row}) td:nth-child({})",
                    i + 1
                )),
                FakeElement::text(*cell),
            );
        }
        self
    }

    /// A row with fewer cells than the schedule table's fixed seven, e.g. a
    /// spacer or message row.
    pub fn with_short_schedule_row(mut self, row: usize, cell_count: usize) -> Self {
        self = self.with_empty_schedule_table();
        let rows = self
            .elements
            .entry(locator_key(&Locator::css("#schedule-table tbody tr")))
            .or_default();
        rows.count = rows.count.max(row);

        self.with_elements(
            &Locator::css(&format!("#schedule-table tbody tr:nth-child({row}) td")),
            cell_count,
        )
    }
}

fn locator_key(locator: &Locator) -> String {
    match locator {
        Locator::Css(s) | Locator::XPath(s) => s.clone(),
    }
}

/// Scripted page driver. States are registered by name; `navigate` maps a
/// URL to the state registered under it, clicks may transition states.
#[derive(Default)]
pub struct FakePage {
    states: Mutex<HashMap<String, PageState>>,
    routes: Mutex<HashMap<String, String>>,
    current: Mutex<Option<String>>,
    pub clicks: Mutex<Vec<String>>,
    pub fills: Mutex<Vec<(String, String)>>,
    pub navigations: Mutex<Vec<String>>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&self, name: &str, state: PageState) {
        self.states.lock().unwrap().insert(name.to_string(), state);
    }

    /// Navigating to `url` lands on the named state.
    pub fn route(&self, url: &str, state: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), state.to_string());
    }

    pub fn filled_value(&self, locator: &Locator) -> Option<String> {
        let key = locator_key(locator);
        self.fills
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(l, _)| *l == key)
            .map(|(_, v)| v.clone())
    }

    fn current_state(&self) -> PageResult<PageState> {
        let current = self.current.lock().unwrap();
        let name = current
            .as_ref()
            .ok_or_else(|| PageError::Driver("no page loaded".to_string()))?;
        self.states
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| PageError::Driver(format!("unknown page state `{name}`")))
    }

    fn element(&self, locator: &Locator) -> PageResult<Option<FakeElement>> {
        let state = self.current_state()?;
        if let Some(message) = state.broken.get(&locator_key(locator)) {
            return Err(PageError::Driver(message.clone()));
        }
        Ok(state
            .elements
            .get(&locator_key(locator))
            .filter(|e| e.count > 0)
            .cloned())
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn navigate(&self, url: &str) -> PageResult<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        let routes = self.routes.lock().unwrap();
        let state = routes
            .get(url)
            .cloned()
            .ok_or_else(|| PageError::Driver(format!("no route for `{url}`")))?;
        drop(routes);
        *self.current.lock().unwrap() = Some(state);
        Ok(())
    }

    async fn current_url(&self) -> PageResult<String> {
        Ok(self.current_state()?.url)
    }

    async fn wait_for(&self, locator: &Locator, timeout: Duration) -> PageResult<()> {
        // The fake renders instantly: an element absent now never appears.
        if self.element(locator)?.is_some() {
            Ok(())
        } else {
            Err(PageError::timeout(locator, timeout))
        }
    }

    async fn wait_gone(&self, locator: &Locator, timeout: Duration) -> PageResult<()> {
        if self.element(locator)?.is_none() {
            Ok(())
        } else {
            Err(PageError::timeout(locator, timeout))
        }
    }

    async fn exists(&self, locator: &Locator) -> PageResult<bool> {
        Ok(self.element(locator)?.is_some())
    }

    async fn count(&self, locator: &Locator) -> PageResult<usize> {
        Ok(self.element(locator)?.map_or(0, |e| e.count))
    }

    async fn read_text(&self, locator: &Locator) -> PageResult<String> {
        self.element(locator)?
            .map(|e| e.text.trim().to_string())
            .ok_or_else(|| PageError::not_found(locator))
    }

    async fn read_attr(&self, locator: &Locator, name: &str) -> PageResult<Option<String>> {
        self.element(locator)?
            .map(|e| e.attrs.get(name).cloned())
            .ok_or_else(|| PageError::not_found(locator))
    }

    async fn is_selected(&self, locator: &Locator) -> PageResult<bool> {
        self.element(locator)?
            .map(|e| e.selected)
            .ok_or_else(|| PageError::not_found(locator))
    }

    async fn fill(&self, locator: &Locator, text: &str) -> PageResult<()> {
        if self.element(locator)?.is_none() {
            return Err(PageError::not_found(locator));
        }
        self.fills
            .lock()
            .unwrap()
            .push((locator_key(locator), text.to_string()));
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> PageResult<()> {
        let state = self.current_state()?;
        if state.elements.get(&locator_key(locator)).filter(|e| e.count > 0).is_none() {
            return Err(PageError::not_found(locator));
        }
        self.clicks.lock().unwrap().push(locator_key(locator));
        if let Some(next) = state.on_click.get(&locator_key(locator)) {
            *self.current.lock().unwrap() = Some(next.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn navigation_switches_states_and_clicks_transition() {
        let page = FakePage::new();
        page.add_state(
            "login",
            PageState::new("https://example.com/login.php")
                .with_element(&Locator::id("go"), FakeElement::text("Go"))
                .clicking_goes_to(&Locator::id("go"), "landing"),
        );
        page.add_state("landing", PageState::new("https://example.com/admin/welcome"));
        page.route("https://example.com/login.php", "login");

        page.navigate("https://example.com/login.php").await.unwrap();
        assert!(page.exists(&Locator::id("go")).await.unwrap());

        page.click(&Locator::id("go")).await.unwrap();
        assert_eq!(
            page.current_url().await.unwrap(),
            "https://example.com/admin/welcome"
        );
    }

    #[tokio::test]
    async fn schedule_row_helper_registers_cells() {
        let page = FakePage::new();
        page.add_state(
            "platform",
            PageState::new("https://example.com/platform").with_schedule_row(
                1,
                ["101", "TR_J1", "JSTOR", "Monthly", "2026-12-31", "ok", "Yes"],
            ),
        );
        page.route("https://example.com/platform", "platform");
        page.navigate("https://example.com/platform").await.unwrap();

        let rows = Locator::css("#schedule-table tbody tr");
        assert_eq!(page.count(&rows).await.unwrap(), 1);
        let vendor = Locator::css("#schedule-table tbody tr:nth-child(1) td:nth-child(3)");
        assert_eq!(page.read_text(&vendor).await.unwrap(), "JSTOR");
    }
}
