//! Files a run leaves behind: page captures, the PDF, and the JSON export.

use crate::merge::PortfolioData;
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Filename timestamp flavours used by the different run variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampStyle {
    /// `MMDDYY_HHMM`
    Compact,
    /// `YYYYMMDD_HHMMSS`
    Full,
}

impl StampStyle {
    pub fn format<Tz: TimeZone>(self, at: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        match self {
            StampStyle::Compact => at.format("%m%d%y_%H%M").to_string(),
            StampStyle::Full => at.format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    pub fn now(self) -> String {
        self.format(&Local::now())
    }
}

/// Paper sizes the PDF step understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PaperFormat {
    A4,
    Letter,
}

impl PaperFormat {
    /// Width and height in millimetres.
    pub fn size_mm(self) -> (f32, f32) {
        match self {
            PaperFormat::A4 => (210.0, 297.0),
            PaperFormat::Letter => (215.9, 279.4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margins {
    pub top_px: u32,
    pub right_px: u32,
    pub bottom_px: u32,
    pub left_px: u32,
}

impl Margins {
    pub fn uniform(px: u32) -> Self {
        Self {
            top_px: px,
            right_px: px,
            bottom_px: px,
            left_px: px,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdfOptions {
    pub format: PaperFormat,
    pub print_background: bool,
    pub margin: Margins,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            format: PaperFormat::A4,
            print_background: true,
            margin: Margins::uniform(20),
        }
    }
}

/// A page as handed to a capture backend.
#[derive(Debug, Clone, Copy)]
pub struct PageSnapshot<'a> {
    pub url: &'a str,
    pub html: &'a str,
}

/// Renders pages to disk. Backends decide the actual file format and
/// return the path they wrote.
pub trait Capture {
    fn screenshot(&self, page: &PageSnapshot<'_>, path: &Path) -> Result<PathBuf, ArtifactError>;
    fn pdf(&self, page: &PageSnapshot<'_>, options: &PdfOptions, path: &Path) -> Result<PathBuf, ArtifactError>;
}

/// Writes the page markup, with a `<base>` so relative assets still resolve
/// when the file is opened in a browser.
#[derive(Debug, Clone, Default)]
pub struct HtmlSnapshot;

impl HtmlSnapshot {
    fn write(&self, page: &PageSnapshot<'_>, path: &Path, extra_head: &str) -> Result<PathBuf, ArtifactError> {
        let target = path.with_extension("html");
        let mut head = String::new();
        if !page.url.is_empty() {
            head.push_str(&format!("<base href=\"{}\">", page.url));
        }
        head.push_str(extra_head);
        let body = inject_head(page.html, &head);
        fs::write(&target, body).map_err(|e| ArtifactError::Io(format!("{}: {}", target.display(), e)))?;
        Ok(target)
    }
}

impl Capture for HtmlSnapshot {
    fn screenshot(&self, page: &PageSnapshot<'_>, path: &Path) -> Result<PathBuf, ArtifactError> {
        self.write(page, path, "")
    }

    fn pdf(&self, page: &PageSnapshot<'_>, options: &PdfOptions, path: &Path) -> Result<PathBuf, ArtifactError> {
        self.write(page, path, &print_css(options))
    }
}

/// `@page` rules matching the PDF options, for a browser's own print dialog.
pub fn print_css(options: &PdfOptions) -> String {
    let (w, h) = options.format.size_mm();
    let m = options.margin;
    let background = if options.print_background {
        "* { -webkit-print-color-adjust: exact; print-color-adjust: exact; }"
    } else {
        ""
    };
    format!(
        "<style>@page {{ size: {}mm {}mm; margin: {}px {}px {}px {}px; }} {}</style>",
        w, h, m.top_px, m.right_px, m.bottom_px, m.left_px, background
    )
}

fn inject_head(html: &str, head: &str) -> String {
    if head.is_empty() {
        return html.to_string();
    }
    match head_open_end(html) {
        Some(split) => format!("{}{}{}", &html[..split], head, &html[split..]),
        None => format!("{}{}", head, html),
    }
}

/// Byte offset just past the `<head ...>` open tag. `<header>` does not count.
fn head_open_end(html: &str) -> Option<usize> {
    let lower = html.to_ascii_lowercase();
    lower.match_indices("<head").find_map(|(at, tag)| {
        let rest = &lower[at + tag.len()..];
        match rest.chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_ascii_whitespace() => {
                rest.find('>').map(|close| at + tag.len() + close + 1)
            }
            _ => None,
        }
    })
}

/// The output directory of one run, with its shared timestamp.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    root: PathBuf,
    stamp: String,
}

impl ArtifactDir {
    /// Create `root` if needed.
    pub fn create(root: impl Into<PathBuf>, stamp: String) -> Result<Self, ArtifactError> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)
                .map_err(|e| ArtifactError::Io(format!("{}: {}", root.display(), e)))?;
            info!(dir = %root.display(), "created output directory");
        }
        Ok(Self { root, stamp })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    /// `<root>/<prefix>_<stamp>.<ext>`
    pub fn stamped(&self, prefix: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{}_{}.{}", prefix, self.stamp, ext))
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write pretty JSON to `path`.
    pub fn write_json(&self, data: &PortfolioData, path: &Path) -> Result<PathBuf, ArtifactError> {
        let json = data
            .to_json_pretty()
            .map_err(|e| ArtifactError::Serialize(e.to_string()))?;
        fs::write(path, json).map_err(|e| ArtifactError::Io(format!("{}: {}", path.display(), e)))?;
        Ok(path.to_path_buf())
    }
}

#[derive(Debug)]
pub enum ArtifactError {
    Io(String),
    Serialize(String),
}

impl std::fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactError::Io(e) => write!(f, "Write failed: {}", e),
            ArtifactError::Serialize(e) => write!(f, "Serialization failed: {}", e),
        }
    }
}

impl std::error::Error for ArtifactError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_injection_keeps_document_order() {
        let out = inject_head("<html><head><title>t</title></head></html>", "<base href=\"x\">");
        assert_eq!(out, "<html><head><base href=\"x\"><title>t</title></head></html>");
        assert_eq!(inject_head("<p>x</p>", "<i>"), "<i><p>x</p>");
    }

    #[test]
    fn head_with_attributes_is_found() {
        let html = "<!DOCTYPE html><html><HEAD lang=\"en\" class=\"x\"><title>t</title></HEAD></html>";
        assert_eq!(
            inject_head(html, "<base href=\"x\">"),
            "<!DOCTYPE html><html><HEAD lang=\"en\" class=\"x\"><base href=\"x\"><title>t</title></HEAD></html>"
        );
        assert_eq!(
            inject_head("<body><header>h</header></body>", "<i>"),
            "<i><body><header>h</header></body>"
        );
    }
}
