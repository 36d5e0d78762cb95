//! Exported browser cookies → session cookie jar.
//!
//! The input is the JSON array produced by common cookie-export browser
//! extensions. Each entry is translated 1:1 into a [`BrowserCookie`] and
//! rendered as a `Set-Cookie` line for the HTTP client's jar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One cookie as written by the export tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<f64>,
    #[serde(default)]
    pub http_only: Option<bool>,
    #[serde(default)]
    pub secure: Option<bool>,
    #[serde(default)]
    pub same_site: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    None,
    Lax,
    Strict,
}

impl SameSite {
    /// Export values are `no_restriction`, `lax`, `strict`, or `unspecified`.
    /// Anything unrecognised is treated as `None`.
    pub fn from_export(value: Option<&str>) -> Self {
        match value {
            Some("lax") => SameSite::Lax,
            Some("strict") => SameSite::Strict,
            _ => SameSite::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::None => "None",
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
        }
    }
}

/// A cookie in the shape the session installs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Unix seconds; `-1` marks a session cookie.
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
}

impl From<ExportedCookie> for BrowserCookie {
    fn from(c: ExportedCookie) -> Self {
        let same_site = SameSite::from_export(c.same_site.as_deref());
        Self {
            name: c.name,
            value: c.value,
            domain: c.domain,
            path: c.path.unwrap_or_else(|| "/".to_string()),
            expires: c.expiration_date.filter(|e| *e != 0.0).unwrap_or(-1.0),
            http_only: c.http_only.unwrap_or(false),
            secure: c.secure.unwrap_or(false),
            same_site,
        }
    }
}

impl BrowserCookie {
    pub fn is_session(&self) -> bool {
        self.expires < 0.0
    }

    /// URL the cookie is registered against in the jar.
    pub fn origin_url(&self) -> String {
        let host = self.domain.trim_start_matches('.');
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("https://{}{}", host, path)
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let mut out = format!(
            "{}={}; Domain={}; Path={}",
            self.name, self.value, self.domain, self.path
        );
        if !self.is_session() {
            if let Some(at) = DateTime::<Utc>::from_timestamp(self.expires as i64, 0) {
                out.push_str(&format!("; Expires={}", at.format("%a, %d %b %Y %H:%M:%S GMT")));
            }
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if self.secure {
            out.push_str("; Secure");
        }
        out.push_str("; SameSite=");
        out.push_str(self.same_site.as_str());
        out
    }
}

/// Translate an export JSON document.
pub fn parse_cookies(json: &str) -> Result<Vec<BrowserCookie>, CookieError> {
    let exported: Vec<ExportedCookie> =
        serde_json::from_str(json).map_err(|e| CookieError::Malformed(e.to_string()))?;
    Ok(exported.into_iter().map(BrowserCookie::from).collect())
}

/// Read and translate a cookie export file.
pub fn load_cookie_file(path: &Path) -> Result<Vec<BrowserCookie>, CookieError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| CookieError::Unreadable(format!("{}: {}", path.display(), e)))?;
    parse_cookies(&json)
}

#[derive(Debug)]
pub enum CookieError {
    Unreadable(String),
    Malformed(String),
}

impl std::fmt::Display for CookieError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CookieError::Unreadable(e) => write!(f, "Cannot read cookie file {}", e),
            CookieError::Malformed(e) => write!(f, "Malformed cookie file: {}", e),
        }
    }
}

impl std::error::Error for CookieError {}
