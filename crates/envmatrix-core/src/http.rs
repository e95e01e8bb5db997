use crate::error::Result;
use reqwest::blocking::Client;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("envmatrix/", env!("CARGO_PKG_VERSION"));

/// Blocking client shared by the fetchers, without a request timeout: a hung
/// remote call hangs the run.
pub fn client() -> Result<Client> {
    with_timeout(None)
}

/// `None` disables reqwest's built-in 30 second blocking timeout.
pub fn with_timeout(timeout: Option<Duration>) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Join a base URL and an absolute path without doubling the slash.
pub(crate) fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
