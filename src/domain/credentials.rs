//! Login credentials
//!
//! Held only for the duration of login. Never persisted, never logged;
//! `Debug` deliberately redacts every field.

use std::fmt;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub mfa_code: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        mfa_code: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            mfa_code: mfa_code.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .field("mfa_code", &"<redacted>")
            .finish()
    }
}
