//! Login session management
//!
//! Drives the page driver through the console's login state machine: entry
//! page, username/password submit, the multi-factor challenge when one is
//! presented, and the post-login landing check. All failures here are fatal
//! for the run; without a session no target can be processed.
//!
//! The MFA code is entered exactly once per run. Authenticator codes are
//! time-boxed, so an expired code is a re-run condition for the operator,
//! never an internal retry.

use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::domain::Credentials;
use crate::infrastructure::config::{ConsoleConfig, WaitConfig};
use crate::infrastructure::page::{Locator, PageDriver, PageError};

const EMAIL_FIELD: &str = "s-libapps-email";
const PASSWORD_FIELD: &str = "s-libapps-password";
const SIGN_IN_BUTTON: &str = "s-libapps-login-button";
const MFA_FIELD: &str = "s-libapps-code";
const MFA_VERIFY_BUTTON: &str = "s-libapps-mfa-button";

/// The console redirects back to a login URL whenever sign-in has not
/// completed; any URL still containing this marker means we are not in.
const LOGIN_URL_MARKER: &str = "login";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username or password rejected by the console")]
    CredentialRejected,

    #[error("multi-factor code rejected (codes expire quickly; re-run with a fresh one)")]
    MfaRejected,

    #[error("login timed out waiting for {waiting_for}")]
    Timeout { waiting_for: String },

    #[error("webdriver failure during login: {0}")]
    Page(#[from] PageError),
}

impl AuthError {
    fn from_wait(err: PageError, waiting_for: &str) -> Self {
        match err {
            PageError::Timeout { .. } => Self::Timeout {
                waiting_for: waiting_for.to_string(),
            },
            other => Self::Page(other),
        }
    }
}

/// Proof of a completed login. Owns the one browser session for the run;
/// every later step borrows the page through it, which keeps the
/// single-session constraint visible in each component's signature.
pub struct AuthenticatedSession<D: PageDriver> {
    driver: D,
}

impl<D: PageDriver> std::fmt::Debug for AuthenticatedSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedSession").finish_non_exhaustive()
    }
}

impl<D: PageDriver> AuthenticatedSession<D> {
    /// Wrap a driver whose session is already logged in. Production code
    /// goes through [`authenticate`]; this exists for scripted drivers that
    /// start past the login boundary.
    pub fn from_logged_in(driver: D) -> Self {
        Self { driver }
    }

    pub fn page(&self) -> &D {
        &self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }
}

/// Run the login state machine and hand back the authenticated session.
pub async fn authenticate<D: PageDriver>(
    driver: D,
    console: &ConsoleConfig,
    waits: &WaitConfig,
    credentials: &Credentials,
) -> Result<AuthenticatedSession<D>, AuthError> {
    info!("Logging into the console...");

    driver.navigate(&console.login_url()).await?;

    let email = Locator::id(EMAIL_FIELD);
    driver
        .wait_for(&email, waits.login())
        .await
        .map_err(|e| AuthError::from_wait(e, "the login form"))?;

    driver.fill(&email, &credentials.username).await?;
    driver
        .fill(&Locator::id(PASSWORD_FIELD), &credentials.password)
        .await?;
    driver.click(&Locator::id(SIGN_IN_BUTTON)).await?;
    debug!("Credentials submitted");

    match wait_for_challenge_or_landing(&driver, waits).await? {
        PostSignIn::Landed => {
            info!("Login successful (no multi-factor challenge presented)");
        }
        PostSignIn::MfaChallenge => {
            driver
                .fill(&Locator::id(MFA_FIELD), &credentials.mfa_code)
                .await?;
            driver.click(&Locator::id(MFA_VERIFY_BUTTON)).await?;
            debug!("Multi-factor code submitted");

            if !wait_until_landed(&driver, waits).await? {
                return Err(AuthError::MfaRejected);
            }
            info!("Login successful");
        }
        PostSignIn::StillOnLogin => return Err(AuthError::CredentialRejected),
    }

    Ok(AuthenticatedSession { driver })
}

enum PostSignIn {
    MfaChallenge,
    Landed,
    StillOnLogin,
}

/// After the password submit the console either renders the MFA challenge or
/// lands directly in the admin area. Staying on the login page until the
/// bound expires means the credentials were rejected.
async fn wait_for_challenge_or_landing<D: PageDriver>(
    driver: &D,
    waits: &WaitConfig,
) -> Result<PostSignIn, AuthError> {
    let deadline = Instant::now() + waits.login();
    loop {
        if driver.exists(&Locator::id(MFA_FIELD)).await? {
            return Ok(PostSignIn::MfaChallenge);
        }
        if is_landed(driver).await? {
            return Ok(PostSignIn::Landed);
        }
        if Instant::now() >= deadline {
            return Ok(PostSignIn::StillOnLogin);
        }
        sleep(waits.poll_interval()).await;
    }
}

/// True once the browser left the login URL within the login bound.
async fn wait_until_landed<D: PageDriver>(
    driver: &D,
    waits: &WaitConfig,
) -> Result<bool, AuthError> {
    let deadline = Instant::now() + waits.login();
    loop {
        if is_landed(driver).await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        sleep(waits.poll_interval()).await;
    }
}

async fn is_landed<D: PageDriver>(driver: &D) -> Result<bool, AuthError> {
    let url = driver.current_url().await?;
    Ok(!url.to_lowercase().contains(LOGIN_URL_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeElement, FakePage, PageState};

    fn fast_waits() -> WaitConfig {
        WaitConfig {
            login_secs: 0,
            table_secs: 0,
            rows_secs: 0,
            modal_secs: 0,
            poll_interval_ms: 1,
        }
    }

    fn console() -> ConsoleConfig {
        ConsoleConfig::default()
    }

    fn credentials() -> Credentials {
        Credentials::new("someone@example.edu", "hunter2", "123456")
    }

    fn login_state(next_on_sign_in: &str) -> PageState {
        PageState::new(console().login_url())
            .with_element(&Locator::id(EMAIL_FIELD), FakeElement::text(""))
            .with_element(&Locator::id(PASSWORD_FIELD), FakeElement::text(""))
            .with_element(&Locator::id(SIGN_IN_BUTTON), FakeElement::text("Sign In"))
            .clicking_goes_to(&Locator::id(SIGN_IN_BUTTON), next_on_sign_in)
    }

    fn mfa_state(next_on_verify: &str) -> PageState {
        PageState::new(console().login_url())
            .with_element(&Locator::id(MFA_FIELD), FakeElement::text(""))
            .with_element(&Locator::id(MFA_VERIFY_BUTTON), FakeElement::text("Verify"))
            .clicking_goes_to(&Locator::id(MFA_VERIFY_BUTTON), next_on_verify)
    }

    fn landing_state() -> PageState {
        PageState::new("https://acaweb.libapps.com/libapps/admin/welcome")
    }

    fn page_with_login(next_on_sign_in: &str) -> FakePage {
        let page = FakePage::new();
        page.add_state("login", login_state(next_on_sign_in));
        page.route(&console().login_url(), "login");
        page
    }

    #[tokio::test]
    async fn full_mfa_login_succeeds() {
        let page = page_with_login("mfa");
        page.add_state("mfa", mfa_state("landing"));
        page.add_state("landing", landing_state());

        let session = authenticate(page, &console(), &fast_waits(), &credentials())
            .await
            .expect("login should succeed");

        let driver = session.into_inner();
        assert_eq!(
            driver.filled_value(&Locator::id(MFA_FIELD)).as_deref(),
            Some("123456")
        );
        assert_eq!(
            driver.filled_value(&Locator::id(EMAIL_FIELD)).as_deref(),
            Some("someone@example.edu")
        );
    }

    #[tokio::test]
    async fn login_without_mfa_challenge_succeeds() {
        let page = page_with_login("landing");
        page.add_state("landing", landing_state());

        let session = authenticate(page, &console(), &fast_waits(), &credentials())
            .await
            .expect("login should succeed");

        // The collected code was simply unused.
        let driver = session.into_inner();
        assert_eq!(driver.filled_value(&Locator::id(MFA_FIELD)), None);
    }

    #[tokio::test]
    async fn staying_on_login_after_password_is_credential_rejection() {
        // Sign-in re-renders the login form: bad username or password.
        let page = page_with_login("login");

        let err = authenticate(page, &console(), &fast_waits(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::CredentialRejected));
    }

    #[tokio::test]
    async fn staying_on_login_after_mfa_is_mfa_rejection() {
        let page = page_with_login("mfa");
        page.add_state("mfa", mfa_state("mfa_rejected"));
        page.add_state("mfa_rejected", PageState::new(console().login_url()));

        let err = authenticate(page, &console(), &fast_waits(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MfaRejected));
    }

    #[tokio::test]
    async fn missing_login_form_is_a_timeout() {
        let page = FakePage::new();
        // Entry URL resolves, but the expected form never renders.
        page.add_state("blank", PageState::new(console().login_url()));
        page.route(&console().login_url(), "blank");

        let err = authenticate(page, &console(), &fast_waits(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Timeout { .. }));
    }
}
