//! Credential collection
//!
//! Username and password come from `LA_USER` / `LA_PASS` (a local `.env`
//! file is honored), falling back to an interactive prompt with hidden
//! password input. The MFA code is always prompted: authenticator codes are
//! time-boxed and must be typed at run time. Everything is read exactly once
//! at process start and never written anywhere.

use std::env;
use std::io::{self, Write};

use anyhow::{Context, Result};

use crate::domain::Credentials;

const USERNAME_VAR: &str = "LA_USER";
const PASSWORD_VAR: &str = "LA_PASS";

pub fn collect() -> Result<Credentials> {
    // Missing .env is fine; env vars may be set directly.
    let _ = dotenvy::dotenv();

    let username = match non_empty_var(USERNAME_VAR) {
        Some(value) => value,
        None => prompt_line("LibApps username: ")?,
    };

    let password = match non_empty_var(PASSWORD_VAR) {
        Some(value) => value,
        None => rpassword::prompt_password("LibApps password: ")
            .context("failed to read password")?,
    };

    let mfa_code = prompt_line("Authenticator MFA code: ")?;

    Ok(Credentials::new(username, password, mfa_code))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{prompt}");
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read from stdin")?;

    Ok(line.trim().to_string())
}
