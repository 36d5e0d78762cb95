//! Optional per-symbol enrichment: quote lookups and related news.
//!
//! Both sources run strictly one symbol at a time. A failure for one symbol
//! is logged and recorded as an `{"error": ...}` placeholder; it never stops
//! the run.

use crate::dom::DomNode;
use crate::fetch::{FetchError, Session};
use crate::merge::{error_placeholder, PortfolioData, NEWS_KEY, QUOTE_KEY};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_QUOTE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_NEWS_URL: &str = "https://finance.yahoo.com";

/// Articles kept per symbol.
pub const NEWS_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub content: String,
}

/// Looks up a structured quote for a symbol.
pub trait QuoteSource {
    fn quote(&self, session: &Session, symbol: &str) -> Result<Value, FetchError>;
}

/// Lists and reads articles about a symbol.
pub trait NewsSource {
    fn articles(&self, session: &Session, symbol: &str, limit: usize) -> Result<Vec<Article>, FetchError>;
}

/// Quote endpoint returning `{"quoteResponse": {"result": [...]}}`.
#[derive(Debug, Clone)]
pub struct YahooQuotes {
    pub base_url: String,
}

impl Default for YahooQuotes {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_QUOTE_URL.to_string(),
        }
    }
}

impl QuoteSource for YahooQuotes {
    fn quote(&self, session: &Session, symbol: &str) -> Result<Value, FetchError> {
        let mut url = Url::parse(&format!("{}/v7/finance/quote", self.base_url.trim_end_matches('/')))
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("symbols", symbol);
        let body = session.get_json(url.as_str())?;
        first_quote(&body)
            .cloned()
            .ok_or_else(|| FetchError::Decode(format!("no quote returned for {}", symbol)))
    }
}

/// First result object of a quote response.
pub fn first_quote(body: &Value) -> Option<&Value> {
    body.pointer("/quoteResponse/result/0")
}

/// News listing page at `<base>/quote/<symbol>/news/`, then each article.
#[derive(Debug, Clone)]
pub struct SiteNews {
    pub base_url: String,
}

impl Default for SiteNews {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NEWS_URL.to_string(),
        }
    }
}

impl NewsSource for SiteNews {
    fn articles(&self, session: &Session, symbol: &str, limit: usize) -> Result<Vec<Article>, FetchError> {
        let listing_url = format!("{}/quote/{}/news/", self.base_url.trim_end_matches('/'), symbol);
        let listing = session.fetch_dom(&listing_url)?;

        let mut articles = Vec::new();
        for (title, href) in article_links(&listing, limit) {
            let link = join_url(&listing_url, &href);
            let content = match session.fetch_dom(&link) {
                Ok(page) => article_body(&page),
                Err(e) => {
                    warn!(%symbol, %link, "article fetch failed: {}", e);
                    format!("Error: {}", e)
                }
            };
            articles.push(Article { title, link, content });
        }
        Ok(articles)
    }
}

fn join_url(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Distinct `(title, href)` pairs of links that point at news articles.
pub fn article_links(dom: &DomNode, limit: usize) -> Vec<(String, String)> {
    let mut links: Vec<(String, String)> = Vec::new();
    for a in dom.descendants_where(|n| n.tag == "a") {
        if links.len() >= limit {
            break;
        }
        let href = match a.get_attr("href") {
            Some(h) if h.contains("/news/") => h.trim().to_string(),
            _ => continue,
        };
        let title = a.text_content();
        if title.is_empty() || links.iter().any(|(_, seen)| *seen == href) {
            continue;
        }
        links.push((title, href));
    }
    links
}

/// Paragraph text of an article page, preferring the `<article>` element.
pub fn article_body(dom: &DomNode) -> String {
    let root = dom
        .descendants_where(|n| n.tag == "article")
        .into_iter()
        .next()
        .unwrap_or(dom);
    root.descendants_where(|n| n.tag == "p")
        .into_iter()
        .map(|p| p.text_content())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Attach quote and news data to every symbol, in order.
pub fn enrich(
    session: &Session,
    data: &mut PortfolioData,
    quotes: Option<&dyn QuoteSource>,
    news: Option<&dyn NewsSource>,
) {
    for symbol in data.symbols() {
        if let Some(source) = quotes {
            let value = match source.quote(session, &symbol) {
                Ok(q) => q,
                Err(e) => {
                    warn!(%symbol, "quote lookup failed: {}", e);
                    error_placeholder(e)
                }
            };
            data.attach(&symbol, QUOTE_KEY, value);
        }

        if let Some(source) = news {
            let value = match source.articles(session, &symbol, NEWS_LIMIT) {
                Ok(articles) => {
                    info!(%symbol, count = articles.len(), "fetched news");
                    serde_json::to_value(articles).unwrap_or_else(|e| error_placeholder(e))
                }
                Err(e) => {
                    warn!(%symbol, "news fetch failed: {}", e);
                    error_placeholder(e)
                }
            };
            data.attach(&symbol, NEWS_KEY, value);
        }
    }
}
