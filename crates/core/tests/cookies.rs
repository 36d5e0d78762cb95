//! Tests for cookie export translation.

use folio_core::cookies::{self, BrowserCookie, CookieError, SameSite};
use pretty_assertions::assert_eq;
use std::io::Write;

const EXPORT: &str = r#"[
    {
        "name": "A1",
        "value": "d=abc",
        "domain": ".yahoo.com",
        "path": "/",
        "expirationDate": 1767225600.5,
        "httpOnly": true,
        "secure": true,
        "sameSite": "no_restriction"
    },
    {
        "name": "GUC",
        "value": "xyz",
        "domain": "finance.yahoo.com",
        "path": "/portfolios",
        "sameSite": "lax"
    },
    {
        "name": "T",
        "value": "1",
        "domain": ".yahoo.com",
        "sameSite": "strict",
        "hostOnly": false,
        "session": true
    },
    {
        "name": "U",
        "value": "2",
        "domain": ".yahoo.com",
        "sameSite": "unspecified"
    }
]"#;

#[test]
fn test_translation_defaults_and_same_site() {
    let cookies = cookies::parse_cookies(EXPORT).unwrap();
    assert_eq!(cookies.len(), 4);

    assert_eq!(
        cookies[0],
        BrowserCookie {
            name: "A1".into(),
            value: "d=abc".into(),
            domain: ".yahoo.com".into(),
            path: "/".into(),
            expires: 1767225600.5,
            http_only: true,
            secure: true,
            same_site: SameSite::None,
        }
    );

    assert_eq!(cookies[1].same_site, SameSite::Lax);
    assert_eq!(cookies[1].expires, -1.0);
    assert!(cookies[1].is_session());
    assert!(!cookies[1].http_only);
    assert!(!cookies[1].secure);

    assert_eq!(cookies[2].same_site, SameSite::Strict);
    assert_eq!(cookies[2].path, "/");
    assert_eq!(cookies[3].same_site, SameSite::None);
}

#[test]
fn test_set_cookie_rendering() {
    let cookies = cookies::parse_cookies(EXPORT).unwrap();

    let persistent = cookies[0].to_set_cookie();
    assert!(persistent.starts_with("A1=d=abc; Domain=.yahoo.com; Path=/"));
    assert!(persistent.contains("; Expires=Thu, 01 Jan 2026 00:00:00 GMT"));
    assert!(persistent.contains("; HttpOnly; Secure; SameSite=None"));

    let session = cookies[1].to_set_cookie();
    assert_eq!(session, "GUC=xyz; Domain=finance.yahoo.com; Path=/portfolios; SameSite=Lax");
}

#[test]
fn test_origin_url_strips_leading_dot() {
    let cookies = cookies::parse_cookies(EXPORT).unwrap();
    assert_eq!(cookies[0].origin_url(), "https://yahoo.com/");
    assert_eq!(cookies[1].origin_url(), "https://finance.yahoo.com/portfolios");
}

#[test]
fn test_zero_expiration_is_session() {
    let cookies = cookies::parse_cookies(
        r#"[{"name":"n","value":"v","domain":"x.com","expirationDate":0}]"#,
    )
    .unwrap();
    assert!(cookies[0].is_session());
}

#[test]
fn test_malformed_file_is_an_error() {
    let err = cookies::parse_cookies(r#"{"name": "not an array"}"#).unwrap_err();
    assert!(matches!(err, CookieError::Malformed(_)));

    let err = cookies::parse_cookies(r#"[{"value": "missing name"}]"#).unwrap_err();
    assert!(matches!(err, CookieError::Malformed(_)));
}

#[test]
fn test_load_cookie_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(EXPORT.as_bytes()).unwrap();
    let cookies = cookies::load_cookie_file(file.path()).unwrap();
    assert_eq!(cookies.len(), 4);

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("cookie.json");
    let err = cookies::load_cookie_file(&missing).unwrap_err();
    assert!(matches!(err, CookieError::Unreadable(_)));
    assert!(err.to_string().contains("cookie.json"));
}
