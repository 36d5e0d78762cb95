//! Run configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORTAL_URL: &str = "https://finance.yahoo.com/portfolios/";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Tabs scraped, in merge order.
pub const DEFAULT_TABS: &[&str] = &["Summary", "Holdings", "Fundamentals"];

/// Everything a run needs to know, passed explicitly to the workflow.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub portal_url: String,
    pub cookie_file: PathBuf,
    pub output_dir: PathBuf,
    /// Kept for capture backends that drive a real browser window.
    pub headless: bool,
    /// Per-navigation timeout; also bounds each readiness wait.
    pub timeout: Duration,
    /// How long to wait for a freshly activated tab to render its tables.
    pub render_wait: Duration,
    pub account_identifier: Option<String>,
    pub account_name: Option<String>,
    pub tabs: Vec<String>,
    pub quote_url: Option<String>,
    pub news_url: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            cookie_file: PathBuf::from("cookie.json"),
            output_dir: PathBuf::from("portfolio"),
            headless: false,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            render_wait: Duration::from_secs(10),
            account_identifier: None,
            account_name: None,
            tabs: DEFAULT_TABS.iter().map(|t| t.to_string()).collect(),
            quote_url: None,
            news_url: None,
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or empty keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("PUPPETEER_HEADLESS") {
            config.headless = v == "true";
        }
        if let Some(v) = get("PUPPETEER_TIMEOUT") {
            match v.trim().parse::<u64>() {
                Ok(ms) => config.timeout = Duration::from_millis(ms),
                Err(_) => warn!(value = %v, "PUPPETEER_TIMEOUT is not a number, using {}ms", DEFAULT_TIMEOUT_MS),
            }
        }
        config.account_identifier = get("ACCOUNT_IDENTIFIER");
        config.account_name = get("ACCOUNT_NAME");
        if let Some(v) = get("FOLIO_PORTAL_URL") {
            config.portal_url = v;
        }
        if let Some(v) = get("FOLIO_COOKIE_FILE") {
            config.cookie_file = PathBuf::from(v);
        }
        if let Some(v) = get("FOLIO_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v);
        }
        config.quote_url = get("FOLIO_QUOTE_URL");
        config.news_url = get("FOLIO_NEWS_URL");
        config
    }

    /// Account label for logs.
    pub fn account_label(&self) -> &str {
        self.account_identifier
            .as_deref()
            .or(self.account_name.as_deref())
            .unwrap_or("<unset>")
    }

    #[cfg(feature = "fetch")]
    pub fn session_config(&self) -> crate::fetch::SessionConfig {
        let mut session = crate::fetch::SessionConfig::default();
        session.fetch.timeout = self.timeout;
        session
    }
}
