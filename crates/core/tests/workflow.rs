//! Tests for the end-to-end portfolio runs.

#![cfg(feature = "fetch")]

use folio_core::artifact::{ArtifactDir, HtmlSnapshot};
use folio_core::config::RunConfig;
use folio_core::fetch::{Activation, Session};
use folio_core::workflow::{self, Enrichment, RunReport, WorkflowError};
use pretty_assertions::assert_eq;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use std::time::Duration;

const ACCOUNT_PAGE: &str = r##"
<html><body>
    <h1>Brokerage 1234</h1>
    <div role="tablist">
        <button role="tab" aria-controls="panel-summary">Summary</button>
        <button role="tab" aria-controls="panel-holdings">Holdings</button>
        <a href="#panel-fundamentals">Fundamentals</a>
    </div>
    <section id="panel-summary">
        <table>
            <tr><th>Symbol</th><th>Last Price</th></tr>
            <tr><td>AAPL</td><td>150.00</td></tr>
            <tr><td></td><td>Total</td></tr>
        </table>
    </section>
    <section id="panel-holdings">
        <table>
            <tr><th>Symbol</th><th>Shares</th></tr>
            <tr><td>AAPL</td><td>10</td></tr>
            <tr><td>MSFT</td><td>5</td></tr>
        </table>
    </section>
    <section id="panel-fundamentals">
        <table>
            <tr><th>Symbol</th><th>P/E</th></tr>
            <tr><td>MSFT</td><td>35.1</td></tr>
        </table>
    </section>
</body></html>
"##;

const PORTAL_PAGE: &str = r#"
<html><body>
    <h1>Portfolios</h1>
    <a href="/portfolio/p_0">Watchlist</a>
    <a href="/portfolio/p_1">Brokerage 1234</a>
</body></html>
"#;

const COOKIES: &str = r#"[{"name": "A3", "value": "d=abc", "domain": ".example.com", "path": "/"}]"#;

fn test_config(dir: &Path) -> RunConfig {
    let cookie_file = dir.join("cookie.json");
    std::fs::write(&cookie_file, COOKIES).unwrap();
    RunConfig {
        cookie_file,
        output_dir: dir.join("portfolio"),
        render_wait: Duration::ZERO,
        account_identifier: Some("1234".to_string()),
        ..Default::default()
    }
}

fn serve(bodies: Vec<&'static str>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for body in bodies {
            let (mut stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let mut buf = [0u8; 4096];
            let mut request = Vec::new();
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}/portfolios", addr)
}

#[test]
fn test_scrape_tabs_merges_by_symbol() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let mut session = Session::new().unwrap();
    session.load_html(ACCOUNT_PAGE, "https://finance.example.com/portfolio/p_1");

    let mut report = RunReport::default();
    let data = workflow::scrape_tabs(&mut session, &config, None, &mut report);

    assert_eq!(data.symbols(), vec!["AAPL", "MSFT"]);
    let aapl = data.get("AAPL").unwrap();
    assert_eq!(aapl.get_str("summary_Last Price"), Some("150.00"));
    assert_eq!(aapl.get_str("holdings_Shares"), Some("10"));
    assert_eq!(aapl.get_str("fundamentals_P/E"), None);
    let msft = data.get("MSFT").unwrap();
    assert_eq!(msft.get_str("holdings_Shares"), Some("5"));
    assert_eq!(msft.get_str("fundamentals_P/E"), Some("35.1"));

    let tabs: Vec<_> = report.tabs.iter().map(|t| (t.tab.as_str(), t.stats.merged, t.stats.dropped)).collect();
    assert_eq!(tabs, vec![("Summary", 1, 1), ("Holdings", 2, 0), ("Fundamentals", 1, 0)]);
    assert_eq!(
        report.tabs[2].activation,
        Some(Activation::Panel("panel-fundamentals".to_string()))
    );
}

#[test]
fn test_scrape_tabs_skips_missing_tab_and_snapshots() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.tabs = vec!["Summary".to_string(), "Dividends".to_string()];
    let dir = ArtifactDir::create(&config.output_dir, "s".to_string()).unwrap();

    let mut session = Session::new().unwrap();
    session.load_html(ACCOUNT_PAGE, "https://finance.example.com/portfolio/p_1");

    let mut report = RunReport::default();
    let data = workflow::scrape_tabs(&mut session, &config, Some((&HtmlSnapshot, &dir)), &mut report);

    assert_eq!(data.symbols(), vec!["AAPL"]);
    assert_eq!(report.tabs.len(), 1);
    assert_eq!(report.artifacts, vec![dir.file("screenshot_summary_s.html")]);
    assert!(report.artifacts[0].exists());
}

#[test]
fn test_parse_writes_portfolio_data() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.portal_url = serve(vec![PORTAL_PAGE, ACCOUNT_PAGE]);

    let report = workflow::parse(&config, &HtmlSnapshot, Enrichment::default()).unwrap();

    assert_eq!(report.symbols, vec!["AAPL", "MSFT"]);
    let json_path = config.output_dir.join("portfolio-data.json");
    assert!(report.artifacts.contains(&json_path));
    assert!(config.output_dir.join("portfolio_page.html").exists());

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(written["MSFT"]["symbol"], "MSFT");
    assert_eq!(written["MSFT"]["fundamentals_P/E"], "35.1");
}

#[test]
fn test_missing_account_fails_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.account_identifier = Some("9999".to_string());
    config.portal_url = serve(vec![PORTAL_PAGE]);

    let err = workflow::capture(&config, &HtmlSnapshot, Enrichment::default()).unwrap_err();
    assert!(matches!(err, WorkflowError::AccountNotFound(ref a) if a == "9999"));
    assert_eq!(
        err.to_string(),
        "Could not find account 9999. Check ACCOUNT_IDENTIFIER and ACCOUNT_NAME"
    );
}

#[test]
fn test_missing_cookie_file_fails_before_navigation() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.cookie_file = tmp.path().join("absent.json");

    let err = workflow::parse(&config, &HtmlSnapshot, Enrichment::default()).unwrap_err();
    assert!(matches!(err, WorkflowError::Cookies(_)));
    assert!(!config.output_dir.exists());
}

#[test]
fn test_in_place_tab_after_panel_tab_reads_whole_page() {
    let page = r#"
    <html><body>
        <h1>Brokerage 1234</h1>
        <button aria-controls="panel-summary">Summary</button>
        <span>Holdings</span>
        <section id="panel-summary">
            <table>
                <tr><th>Symbol</th><th>Price</th></tr>
                <tr><td>AAPL</td><td>150</td></tr>
            </table>
        </section>
        <table>
            <tr><th>Symbol</th><th>Shares</th></tr>
            <tr><td>MSFT</td><td>5</td></tr>
        </table>
    </body></html>
    "#;
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.tabs = vec!["Summary".to_string(), "Holdings".to_string()];
    let mut session = Session::new().unwrap();
    session.load_html(page, "https://finance.example.com/portfolio/p_1");

    let mut report = RunReport::default();
    let data = workflow::scrape_tabs(&mut session, &config, None, &mut report);

    assert_eq!(report.tabs[1].activation, Some(Activation::InPlace));
    assert_eq!(session.panel(), None);
    assert_eq!(data.symbols(), vec!["AAPL", "MSFT"]);
    assert_eq!(data.get("MSFT").unwrap().get_str("holdings_Shares"), Some("5"));
    // The whole page includes the summary table, read again under the holdings prefix.
    assert_eq!(data.get("AAPL").unwrap().get_str("holdings_Price"), Some("150"));
}
