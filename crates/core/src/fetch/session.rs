//! Browsing session with cookie injection, navigation, and tab activation.

use super::{classify, fetch_html, read_response_text_limited, FetchConfig, FetchError};
use crate::cookies::BrowserCookie;
use crate::dom::DomNode;
use crate::locate::{Locator, Target};
use crate::table::{self, Record, Table};
use reqwest::blocking::Client;
use reqwest::cookie::Jar;
use reqwest::redirect::Policy;
use serde::Serialize;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub fetch: FetchConfig,
    /// Delay between readiness checks.
    pub poll_interval: Duration,
    pub max_redirects: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            poll_interval: Duration::from_millis(500),
            max_redirects: 10,
        }
    }
}

/// What activating an element did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Activation {
    /// A link was followed to this URL.
    Navigated(String),
    /// Later reads are limited to the panel with this id.
    Panel(String),
    /// Nothing to follow; the page is unchanged.
    InPlace,
}

/// A browsing session: one cookie jar, one current page.
pub struct Session {
    client: Client,
    jar: Arc<Jar>,
    config: SessionConfig,
    current_url: Option<Url>,
    current_dom: Option<DomNode>,
    current_html: Option<String>,
    /// Whether the current page came from the network and can be reloaded.
    reloadable: bool,
    panel: Option<String>,
    history: Vec<String>,
}

impl Session {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Result<Self, FetchError> {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .user_agent(&config.fetch.user_agent)
            .timeout(config.fetch.timeout)
            .redirect(Policy::limited(config.max_redirects))
            .cookie_provider(Arc::clone(&jar))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            jar,
            config,
            current_url: None,
            current_dom: None,
            current_html: None,
            reloadable: false,
            panel: None,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Install cookies into the jar. Returns how many were accepted.
    pub fn add_cookies(&mut self, cookies: &[BrowserCookie]) -> usize {
        let mut added = 0;
        for cookie in cookies {
            match Url::parse(&cookie.origin_url()) {
                Ok(url) => {
                    self.jar.add_cookie_str(&cookie.to_set_cookie(), &url);
                    added += 1;
                }
                Err(e) => warn!(cookie = %cookie.name, domain = %cookie.domain, "skipping cookie: {}", e),
            }
        }
        added
    }

    /// Navigate to a URL and make it the current page.
    pub fn goto(&mut self, url: &str) -> Result<&DomNode, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        info!(url = %parsed, "navigating");
        let html = fetch_html(&self.client, &parsed, &self.config.fetch)?;

        self.history.push(parsed.to_string());
        self.install(html, Some(parsed), true);
        self.current_dom
            .as_ref()
            .ok_or_else(|| FetchError::ActionError("No page loaded".to_string()))
    }

    /// Load HTML content directly (without fetching).
    pub fn load_html(&mut self, html: &str, url: &str) -> &DomNode {
        let parsed = Url::parse(url).ok();
        self.install(html.to_string(), parsed, false);
        self.current_dom.get_or_insert_with(DomNode::new_document)
    }

    fn install(&mut self, html: String, url: Option<Url>, reloadable: bool) {
        self.current_dom = Some(crate::dom::parse_html(&html));
        self.current_html = Some(html);
        self.current_url = url;
        self.reloadable = reloadable;
        self.panel = None;
    }

    /// Fetch the current URL again, keeping the selected panel.
    fn reload(&mut self) -> Result<(), FetchError> {
        let url = match (&self.current_url, self.reloadable) {
            (Some(url), true) => url.clone(),
            _ => return Ok(()),
        };
        let html = fetch_html(&self.client, &url, &self.config.fetch)?;
        let panel = self.panel.take();
        self.install(html, Some(url), true);
        self.panel = panel;
        Ok(())
    }

    pub fn dom(&self) -> Option<&DomNode> {
        self.current_dom.as_ref()
    }

    pub fn html(&self) -> Option<&str> {
        self.current_html.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.current_url.as_ref().map(|u| u.as_str())
    }

    pub fn panel(&self) -> Option<&str> {
        self.panel.as_deref()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The part of the page reads apply to: the selected panel if it exists,
    /// otherwise the whole document.
    pub fn scope(&self) -> Option<&DomNode> {
        let dom = self.current_dom.as_ref()?;
        match self.panel.as_deref().and_then(|id| dom.find_by_id(id)) {
            Some(panel) => Some(panel),
            None => Some(dom),
        }
    }

    /// Tables in the current scope.
    pub fn tables(&self) -> Vec<Table> {
        self.scope().map(table::extract_tables).unwrap_or_default()
    }

    /// Records of every table in the current scope.
    pub fn records(&self) -> Vec<Record> {
        self.scope().map(table::extract_records).unwrap_or_default()
    }

    pub fn locate(&self, locator: &dyn Locator) -> Option<Target> {
        self.current_dom.as_ref().and_then(|dom| locator.locate(dom))
    }

    /// Find an element with `locator` and activate it.
    ///
    /// Links are followed and panel controls select their panel. Anything
    /// else is activated in place and clears the selected panel. Returns
    /// `Ok(None)` when nothing matched.
    pub fn activate(&mut self, locator: &dyn Locator) -> Result<Option<Activation>, FetchError> {
        let target = match self.locate(locator) {
            Some(t) => t,
            None => {
                debug!(what = %locator.describe(), "no element matched");
                return Ok(None);
            }
        };
        debug!(what = %locator.describe(), tag = %target.tag, text = %target.text, "activating");

        if let Some(href) = target.navigable_href() {
            let next = self.resolve_url(href);
            self.goto(&next)?;
            return Ok(Some(Activation::Navigated(next)));
        }

        if let Some(id) = target.controls.clone() {
            let exists = self
                .current_dom
                .as_ref()
                .map(|dom| dom.find_by_id(&id).is_some())
                .unwrap_or(false);
            if exists {
                self.panel = Some(id.clone());
                return Ok(Some(Activation::Panel(id)));
            }
            debug!(panel = %id, "control points at a missing panel");
        }

        // An in-place activation reads the whole page again.
        self.panel = None;
        Ok(Some(Activation::InPlace))
    }

    /// Poll until `ready` holds for the current page or `timeout` elapses.
    ///
    /// Network pages are re-fetched between checks; pages loaded from a
    /// string are checked once. Reload failures are logged, not returned.
    pub fn wait_until<F>(&mut self, timeout: Duration, ready: F) -> bool
    where
        F: Fn(&DomNode) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            if self.scope().map(&ready).unwrap_or(false) {
                return true;
            }
            let now = Instant::now();
            if !self.reloadable || now >= deadline {
                return false;
            }
            thread::sleep(self.config.poll_interval.min(deadline - now));
            if let Err(e) = self.reload() {
                warn!("reload while waiting failed: {}", e);
            }
        }
    }

    /// Wait until at least one table is present in the current scope.
    pub fn wait_for_tables(&mut self, timeout: Duration) -> bool {
        self.wait_until(timeout, |dom| table::count_tables(dom) > 0)
    }

    /// Fetch and parse a page without making it the current one.
    pub fn fetch_dom(&self, url: &str) -> Result<DomNode, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let html = fetch_html(&self.client, &parsed, &self.config.fetch)?;
        Ok(crate::dom::parse_html(&html))
    }

    /// GET a JSON document with the session's cookies.
    pub fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        let response = self
            .client
            .get(parsed.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpError(status.as_u16()));
        }
        let body = read_response_text_limited(response, self.config.fetch.max_response_bytes)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    pub fn resolve_url(&self, relative: &str) -> String {
        match &self.current_url {
            Some(base) => base
                .join(relative)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| relative.to_string()),
            None => relative.to_string(),
        }
    }
}
