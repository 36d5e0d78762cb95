//! HTTP fetching and page loading.
//! Gated behind the "fetch" feature flag.

pub mod session;

pub use session::{Activation, Session, SessionConfig};

use reqwest::blocking::{Client, Response};
use std::io::Read;
use std::time::Duration;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Configuration for page fetching.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User-Agent header.
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Responses larger than this are rejected.
    pub max_response_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_millis(60_000),
            max_response_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Fetch a URL and return the response body as text.
pub fn fetch_html(client: &Client, url: &Url, config: &FetchConfig) -> Result<String, FetchError> {
    let response = client
        .get(url.as_str())
        .send()
        .map_err(classify)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpError(status.as_u16()));
    }

    read_response_text_limited(response, config.max_response_bytes)
}

/// Read a response body, refusing anything over `limit` bytes.
pub(crate) fn read_response_text_limited(response: Response, limit: usize) -> Result<String, FetchError> {
    let mut buf = Vec::new();
    response
        .take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .map_err(|e| FetchError::Network(e.to_string()))?;
    if buf.len() > limit {
        return Err(FetchError::TooLarge(limit));
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub(crate) fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(e.to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}

#[derive(Debug)]
pub enum FetchError {
    InvalidUrl(String),
    Network(String),
    Timeout(String),
    HttpError(u16),
    TooLarge(usize),
    Decode(String),
    ActionError(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::InvalidUrl(e) => write!(f, "Invalid URL: {}", e),
            FetchError::Network(e) => write!(f, "Network error: {}", e),
            FetchError::Timeout(e) => write!(f, "Timed out: {}", e),
            FetchError::HttpError(code) => write!(f, "HTTP error: {}", code),
            FetchError::TooLarge(limit) => write!(f, "Response exceeds {} bytes", limit),
            FetchError::Decode(e) => write!(f, "Unexpected response: {}", e),
            FetchError::ActionError(e) => write!(f, "Action failed: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}
