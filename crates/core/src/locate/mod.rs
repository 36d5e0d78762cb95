//! Locate an element to activate by its visible text.
//!
//! Selector heuristics live behind [`Locator`] so a site redesign only means
//! swapping a strategy; extraction and merge never see these rules.

use crate::dom::{DomNode, NodePath};
use serde::Serialize;

/// An element chosen for activation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Target {
    /// Path from the document root.
    pub path: NodePath,
    pub tag: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Id of the panel this control shows, if it declares one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controls: Option<String>,
}

impl Target {
    pub fn from_node(node: &DomNode, path: NodePath) -> Self {
        let href = node.get_attr("href").map(|h| h.trim().to_string());
        let controls = node
            .get_attr("aria-controls")
            .map(str::to_string)
            .or_else(|| {
                node.get_attr("data-target")
                    .or(href.as_deref())
                    .and_then(|t| t.strip_prefix('#'))
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
            });
        Self {
            path,
            tag: node.tag.clone(),
            text: node.text_content(),
            role: node.role().map(str::to_string),
            href,
            controls,
        }
    }

    /// Link target worth following, if any.
    pub fn navigable_href(&self) -> Option<&str> {
        if self.tag != "a" {
            return None;
        }
        let href = self.href.as_deref()?;
        let lower = href.to_lowercase();
        let inert = lower.is_empty()
            || lower.starts_with('#')
            || lower.starts_with("javascript:")
            || lower.starts_with("mailto:")
            || lower.starts_with("tel:")
            || lower.starts_with("data:");
        if inert {
            None
        } else {
            Some(href)
        }
    }
}

/// A strategy for picking the element to activate.
pub trait Locator {
    fn locate(&self, root: &DomNode) -> Option<Target>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Elements a user would expect to respond to a click.
pub fn is_clickable(node: &DomNode) -> bool {
    if !node.is_element() {
        return false;
    }
    node.tag == "button"
        || node.tag == "a"
        || matches!(node.role(), Some("tab") | Some("button"))
        || node.attributes.contains_key("onclick")
        || has_pointer_cursor(node)
}

fn has_pointer_cursor(node: &DomNode) -> bool {
    node.get_attr("style")
        .map(|style| {
            style.split(';').any(|decl| {
                let mut parts = decl.splitn(2, ':');
                let prop = parts.next().unwrap_or("").trim();
                let value = parts.next().unwrap_or("").trim();
                prop.eq_ignore_ascii_case("cursor") && value.eq_ignore_ascii_case("pointer")
            })
        })
        .unwrap_or(false)
}

fn is_link_or_button(node: &DomNode) -> bool {
    node.tag == "a" || node.tag == "button" || node.role() == Some("button")
}

/// A tab control whose trimmed text equals the label exactly.
///
/// The matched element and its nearest ancestors are checked for something
/// clickable; if none is, the matched element is used as-is.
#[derive(Debug, Clone)]
pub struct TabLabel {
    pub label: String,
    /// Candidates checked: the element itself plus `depth - 1` ancestors.
    pub depth: usize,
}

impl TabLabel {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            depth: 3,
        }
    }
}

impl Locator for TabLabel {
    fn locate(&self, root: &DomNode) -> Option<Target> {
        let path = root.find_path(&mut |node, path| {
            node.text_equals(&self.label).then(|| path.clone())
        })?;

        for up in 0..self.depth.min(path.len() + 1) {
            let candidate_path = &path[..path.len() - up];
            let candidate = root.node_at(candidate_path)?;
            if !candidate.is_element() {
                break;
            }
            if is_clickable(candidate) {
                return Some(Target::from_node(candidate, candidate_path.to_vec()));
            }
        }

        let node = root.node_at(&path)?;
        Some(Target::from_node(node, path))
    }

    fn describe(&self) -> String {
        format!("tab '{}'", self.label)
    }
}

/// The link or button for an account, matched by identifier or display name.
#[derive(Debug, Clone, Default)]
pub struct AccountLink {
    pub identifier: Option<String>,
    pub name: Option<String>,
    /// Fall back to any element containing the text when no link or button does.
    pub any_element: bool,
}

impl AccountLink {
    pub fn new(identifier: Option<String>, name: Option<String>) -> Self {
        Self {
            identifier: identifier.filter(|s| !s.is_empty()),
            name: name.filter(|s| !s.is_empty()),
            any_element: false,
        }
    }

    pub fn with_fallback(mut self) -> Self {
        self.any_element = true;
        self
    }

    fn matches(&self, text: &str) -> bool {
        let hit = |needle: &Option<String>| {
            needle.as_deref().map(|n| text.contains(n)).unwrap_or(false)
        };
        hit(&self.identifier) || hit(&self.name)
    }
}

impl Locator for AccountLink {
    fn locate(&self, root: &DomNode) -> Option<Target> {
        if self.identifier.is_none() && self.name.is_none() {
            return None;
        }
        let link = root.find_path(&mut |node, path| {
            (is_link_or_button(node) && self.matches(&node.text_content()))
                .then(|| Target::from_node(node, path.clone()))
        });
        if link.is_some() || !self.any_element {
            return link;
        }
        root.find_path(&mut |node, path| {
            self.matches(&node.text_content())
                .then(|| Target::from_node(node, path.clone()))
        })
    }

    fn describe(&self) -> String {
        let label = self
            .identifier
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("<unset>");
        format!("account '{}'", label)
    }
}

/// A print button, found by text, `aria-label`, or `title`.
#[derive(Debug, Clone, Default)]
pub struct PrintControl;

impl Locator for PrintControl {
    fn locate(&self, root: &DomNode) -> Option<Target> {
        root.find_path(&mut |node, path| {
            if !is_link_or_button(node) {
                return None;
            }
            let labelled = |attr: &str| {
                node.get_attr(attr)
                    .map(|v| v.contains("Print") || v.contains("print"))
                    .unwrap_or(false)
            };
            (node.text_content().contains("Print") || labelled("aria-label") || labelled("title"))
                .then(|| Target::from_node(node, path.clone()))
        })
    }

    fn describe(&self) -> String {
        "print control".to_string()
    }
}

/// Elements whose text is exactly one of `labels`. Diagnostic only.
pub fn candidate_tabs(root: &DomNode, labels: &[&str]) -> Vec<Target> {
    let mut found = Vec::new();
    root.find_path(&mut |node, path| {
        if labels.iter().any(|label| node.text_equals(label)) {
            found.push(Target::from_node(node, path.clone()));
        }
        None::<()>
    });
    found
}
