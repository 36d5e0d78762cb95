//! End-to-end runs: open the portfolio, walk the tabs, write artifacts.
//!
//! Three variants share the same building blocks:
//! - [`capture`]: per-tab snapshots, timestamped JSON, and a PDF.
//! - [`parse`]: JSON only, plus a listing of candidate tab controls.
//! - [`print`]: the portfolio page as a PDF.
//!
//! Setup failures (cookies, portal, account) end the run. Everything after
//! that is best-effort: misses are logged and the run keeps going.

use crate::artifact::{ArtifactDir, ArtifactError, Capture, PageSnapshot, PdfOptions, StampStyle};
use crate::config::RunConfig;
use crate::cookies::{self, CookieError};
use crate::enrich::{self, NewsSource, QuoteSource};
use crate::fetch::{Activation, FetchError, Session};
use crate::locate::{self, AccountLink, Locator, PrintControl, TabLabel};
use crate::merge::{MergeStats, PortfolioData, TableMerger};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Labels that look like tab controls on the portfolio page.
pub const TAB_CANDIDATES: &[&str] = &["Summary", "Holdings", "Fundamentals", "Performance"];

/// Optional per-symbol lookups run after the merge.
#[derive(Default, Clone, Copy)]
pub struct Enrichment<'a> {
    pub quotes: Option<&'a dyn QuoteSource>,
    pub news: Option<&'a dyn NewsSource>,
}

impl Enrichment<'_> {
    pub fn is_empty(&self) -> bool {
        self.quotes.is_none() && self.news.is_none()
    }
}

/// How one tab went.
#[derive(Debug, Clone, PartialEq)]
pub struct TabOutcome {
    pub tab: String,
    pub activation: Option<Activation>,
    pub stats: MergeStats,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub symbols: Vec<String>,
    pub tabs: Vec<TabOutcome>,
    pub artifacts: Vec<PathBuf>,
}

/// Full capture: snapshots of every tab, merged JSON, and a PDF of the summary.
pub fn capture(config: &RunConfig, capture: &dyn Capture, enrichment: Enrichment<'_>) -> Result<RunReport, WorkflowError> {
    let mut session = open_session(config)?;
    open_portal(&mut session, config)?;
    if !open_account(&mut session, config, AccountLink::new(config.account_identifier.clone(), config.account_name.clone()))? {
        return Err(WorkflowError::AccountNotFound(config.account_label().to_string()));
    }

    let dir = ArtifactDir::create(&config.output_dir, StampStyle::Compact.now())?;
    info!(stamp = %dir.stamp(), "using timestamp");

    let mut report = RunReport::default();
    snapshot(&session, capture, &dir.stamped("screenshot_before", "png"), &mut report);

    let mut data = scrape_tabs(&mut session, config, Some((capture, &dir)), &mut report);
    apply_enrichment(&session, &mut data, enrichment);

    let json = dir.stamped("json", "json");
    report.artifacts.push(dir.write_json(&data, &json)?);
    info!(path = %json.display(), symbols = data.len(), "saved JSON data");
    log_summary(&data);

    // The PDF is taken from the summary tab.
    if let Some(first) = config.tabs.first() {
        if let Err(e) = session.activate(&TabLabel::new(first)) {
            warn!("could not return to {} tab: {}", first, e);
        }
        session.wait_for_tables(config.render_wait);
    }
    match render_pdf(&session, capture, &dir.stamped("print", "pdf")) {
        Ok(path) => {
            info!(path = %path.display(), "saved PDF");
            report.artifacts.push(path);
        }
        Err(e) => warn!("could not generate PDF, continuing with other outputs: {}", e),
    }

    report.symbols = data.symbols();
    info!(dir = %dir.root().display(), files = report.artifacts.len(), "capture complete");
    Ok(report)
}

/// Scrape to `portfolio-data.json`.
pub fn parse(config: &RunConfig, capture: &dyn Capture, enrichment: Enrichment<'_>) -> Result<RunReport, WorkflowError> {
    let mut session = open_session(config)?;
    open_portal(&mut session, config)?;
    if !open_account(&mut session, config, AccountLink::new(config.account_identifier.clone(), config.account_name.clone()))? {
        return Err(WorkflowError::AccountNotFound(config.account_label().to_string()));
    }

    let dir = ArtifactDir::create(&config.output_dir, StampStyle::Compact.now())?;
    let mut report = RunReport::default();
    snapshot(&session, capture, &dir.file("portfolio_page.png"), &mut report);

    if let Some(dom) = session.dom() {
        let candidates = locate::candidate_tabs(dom, TAB_CANDIDATES);
        match serde_json::to_string_pretty(&candidates) {
            Ok(listing) => info!("found potential tabs: {}", listing),
            Err(e) => debug!("could not list tab candidates: {}", e),
        }
    }

    let mut data = scrape_tabs(&mut session, config, None, &mut report);
    apply_enrichment(&session, &mut data, enrichment);

    let json = dir.file("portfolio-data.json");
    report.artifacts.push(dir.write_json(&data, &json)?);
    info!(path = %json.display(), symbols = data.len(), "saved portfolio data");
    log_summary(&data);

    report.symbols = data.symbols();
    Ok(report)
}

/// Save the account page as a PDF. A missing account or print control is
/// only a warning here; the PDF is written from whatever page is current.
pub fn print(config: &RunConfig, capture: &dyn Capture) -> Result<RunReport, WorkflowError> {
    let mut session = open_session(config)?;
    open_portal(&mut session, config)?;

    let dir = ArtifactDir::create(&config.output_dir, StampStyle::Full.now())?;
    let mut report = RunReport::default();
    snapshot(&session, capture, &dir.file("debug_before_click.png"), &mut report);

    let account = AccountLink::new(config.account_identifier.clone(), config.account_name.clone()).with_fallback();
    if open_account(&mut session, config, account)? {
        snapshot(&session, capture, &dir.file("debug_after_click.png"), &mut report);
    } else {
        warn!(account = %config.account_label(), "could not find account to click, check ACCOUNT_IDENTIFIER and ACCOUNT_NAME");
    }

    info!("looking for print button");
    match session.activate(&PrintControl) {
        Ok(Some(activation)) => {
            info!(?activation, "found and clicked print button");
            session.wait_for_tables(config.render_wait);
        }
        Ok(None) => warn!("could not find print button, will generate PDF anyway"),
        Err(e) => warn!("print button navigation failed: {}", e),
    }

    let path = render_pdf(&session, capture, &dir.stamped("portfolio", "pdf"))?;
    info!(path = %path.display(), "saved portfolio PDF");
    report.artifacts.push(path);
    Ok(report)
}

/// Read the cookie file and start a session carrying those cookies.
pub fn open_session(config: &RunConfig) -> Result<Session, WorkflowError> {
    info!(file = %config.cookie_file.display(), "loading cookies");
    let cookies = cookies::load_cookie_file(&config.cookie_file)?;
    let mut session = Session::with_config(config.session_config())?;
    let added = session.add_cookies(&cookies);
    info!(count = added, "loaded cookies");
    Ok(session)
}

/// Navigate to the portfolio list.
pub fn open_portal(session: &mut Session, config: &RunConfig) -> Result<(), WorkflowError> {
    info!(url = %config.portal_url, headless = config.headless, "opening portfolios");
    session.goto(&config.portal_url)?;
    Ok(())
}

/// Find and activate the account link.
///
/// Waits for the link to show up first. Returns `Ok(false)` when it never
/// does; a failed follow-up navigation is logged and treated as success.
pub fn open_account(session: &mut Session, config: &RunConfig, account: AccountLink) -> Result<bool, WorkflowError> {
    info!(account = %config.account_label(), "looking for account");
    session.wait_until(config.render_wait, |dom| account.locate(dom).is_some());

    match session.activate(&account) {
        Ok(Some(activation)) => info!(?activation, "clicked on account"),
        Ok(None) => return Ok(false),
        Err(e) => warn!("navigation after account click failed, continuing: {}", e),
    }

    if !session.wait_for_tables(config.render_wait) {
        warn!("no tables rendered after opening the account");
    }
    Ok(true)
}

/// Activate each configured tab in order and merge its tables by symbol.
///
/// With a capture backend, each tab is snapshotted as `screenshot_<tab>`.
pub fn scrape_tabs(
    session: &mut Session,
    config: &RunConfig,
    shots: Option<(&dyn Capture, &ArtifactDir)>,
    report: &mut RunReport,
) -> PortfolioData {
    let mut merger = TableMerger::new();

    for tab in &config.tabs {
        info!(%tab, "processing tab");
        let activation = match session.activate(&TabLabel::new(tab)) {
            Ok(Some(a)) => a,
            Ok(None) => {
                info!(%tab, "could not find tab, skipping");
                continue;
            }
            Err(e) => {
                warn!(%tab, "tab navigation failed, skipping: {}", e);
                continue;
            }
        };

        if !session.wait_for_tables(config.render_wait) {
            warn!(%tab, "no tables rendered before timeout");
        }

        if let Some((capture, dir)) = shots {
            let name = format!("screenshot_{}", tab.to_lowercase());
            snapshot(session, capture, &dir.stamped(&name, "png"), report);
        }

        let records = session.records();
        info!(%tab, rows = records.len(), "found rows");
        let stats = merger.merge_tab(tab, &records);
        report.tabs.push(TabOutcome {
            tab: tab.clone(),
            activation: Some(activation),
            stats,
        });
    }

    merger.finish()
}

fn apply_enrichment(session: &Session, data: &mut PortfolioData, enrichment: Enrichment<'_>) {
    if enrichment.is_empty() || data.is_empty() {
        return;
    }
    info!(symbols = data.len(), "enriching symbols");
    enrich::enrich(session, data, enrichment.quotes, enrichment.news);
}

fn page(session: &Session) -> PageSnapshot<'_> {
    PageSnapshot {
        url: session.url().unwrap_or(""),
        html: session.html().unwrap_or(""),
    }
}

/// Best-effort page capture; failures are logged.
fn snapshot(session: &Session, capture: &dyn Capture, path: &Path, report: &mut RunReport) {
    match capture.screenshot(&page(session), path) {
        Ok(written) => {
            info!(path = %written.display(), "saved screenshot");
            report.artifacts.push(written);
        }
        Err(e) => warn!("could not take screenshot: {}", e),
    }
}

fn render_pdf(session: &Session, capture: &dyn Capture, path: &Path) -> Result<PathBuf, ArtifactError> {
    capture.pdf(&page(session), &PdfOptions::default(), path)
}

/// Log each symbol with its field count.
pub fn log_summary(data: &PortfolioData) {
    info!(count = data.len(), "parsed symbols");
    for (symbol, entry) in data.iter() {
        info!("  {}: {} fields", symbol, entry.field_count());
    }
}

#[derive(Debug)]
pub enum WorkflowError {
    Cookies(CookieError),
    Fetch(FetchError),
    AccountNotFound(String),
    Artifact(ArtifactError),
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowError::Cookies(e) => write!(f, "{}", e),
            WorkflowError::Fetch(e) => write!(f, "{}", e),
            WorkflowError::AccountNotFound(account) => write!(
                f,
                "Could not find account {}. Check ACCOUNT_IDENTIFIER and ACCOUNT_NAME",
                account
            ),
            WorkflowError::Artifact(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for WorkflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkflowError::Cookies(e) => Some(e),
            WorkflowError::Fetch(e) => Some(e),
            WorkflowError::AccountNotFound(_) => None,
            WorkflowError::Artifact(e) => Some(e),
        }
    }
}

impl From<CookieError> for WorkflowError {
    fn from(e: CookieError) -> Self {
        WorkflowError::Cookies(e)
    }
}

impl From<FetchError> for WorkflowError {
    fn from(e: FetchError) -> Self {
        WorkflowError::Fetch(e)
    }
}

impl From<ArtifactError> for WorkflowError {
    fn from(e: ArtifactError) -> Self {
        WorkflowError::Artifact(e)
    }
}
