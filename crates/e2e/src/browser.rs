//! Browser automation boundary
//!
//! Everything the interaction helpers need from a browser goes through the
//! [`Browser`] trait, so the helpers run unchanged against a live WebDriver
//! session or the in-memory page in [`crate::mock`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// How to locate an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum By {
    Id(String),
    ClassName(String),
    TagName(String),
    Name(String),
    Attribute { name: String, value: String },
    Css(String),
    XPath(String),
}

impl By {
    pub fn id(id: impl Into<String>) -> Self {
        By::Id(id.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        By::ClassName(class.into())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        By::TagName(tag.into())
    }

    pub fn attr(name: impl Into<String>, value: impl Into<String>) -> Self {
        By::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        By::XPath(path.into())
    }

    /// Parse selector shorthand as used in scenario files.
    ///
    /// - `#menu` is an id
    /// - `.x-fld-record-close` is a class name
    /// - `[data-bs-target="#menuAboutDlg"]` is an attribute match
    /// - `./..`, `//div` are XPath expressions
    /// - a bare word such as `footer` is a tag name
    ///
    /// Anything else is passed through as a CSS selector.
    pub fn parse(selector: &str) -> Self {
        let s = selector.trim();

        if s.starts_with("./") || s.starts_with("//") || s == ".." || s == "." {
            return By::XPath(s.to_string());
        }
        if let Some(id) = s.strip_prefix('#') {
            if is_identifier(id) {
                return By::Id(id.to_string());
            }
        }
        if let Some(class) = s.strip_prefix('.') {
            if is_identifier(class) {
                return By::ClassName(class.to_string());
            }
        }
        if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            if let Some((name, value)) = inner.split_once('=') {
                let value = value.trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                    .unwrap_or(value);
                if is_identifier(name.trim()) {
                    return By::attr(name.trim(), value);
                }
            }
        }
        if is_identifier(s) {
            return By::TagName(s.to_string());
        }
        By::Css(s.to_string())
    }

    /// W3C locator strategy and value.
    ///
    /// WebDriver has no id, class or attribute strategies of its own, so
    /// those are expressed as CSS selectors.
    pub fn to_locator(&self) -> (&'static str, String) {
        match self {
            By::Id(id) => ("css selector", format!("[id=\"{}\"]", escape_quotes(id))),
            By::ClassName(class) => ("css selector", format!(".{}", class)),
            By::TagName(tag) => ("tag name", tag.clone()),
            By::Name(name) => ("css selector", format!("[name=\"{}\"]", escape_quotes(name))),
            By::Attribute { name, value } => (
                "css selector",
                format!("[{}=\"{}\"]", name, escape_quotes(value)),
            ),
            By::Css(css) => ("css selector", css.clone()),
            By::XPath(path) => ("xpath", path.clone()),
        }
    }
}

impl fmt::Display for By {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            By::Id(id) => write!(f, "#{}", id),
            By::ClassName(class) => write!(f, ".{}", class),
            By::TagName(tag) => write!(f, "{}", tag),
            By::Name(name) => write!(f, "[name=\"{}\"]", name),
            By::Attribute { name, value } => write!(f, "[{}=\"{}\"]", name, value),
            By::Css(css) => write!(f, "{}", css),
            By::XPath(path) => write!(f, "xpath:{}", path),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Opaque reference to one DOM node.
///
/// The node belongs to the application; the reference goes stale as soon as
/// the application replaces or removes it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A page in a running browser
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate the current window to `url`
    async fn goto(&self, url: &str) -> E2eResult<()>;

    /// Resize the current window
    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()>;

    /// Find the first element in the document matching `by`
    async fn find(&self, by: &By) -> E2eResult<ElementRef>;

    /// Find every element in the document matching `by`, in document order
    async fn find_all(&self, by: &By) -> E2eResult<Vec<ElementRef>>;

    /// Find the first element matching `by`, relative to `root`
    async fn find_in(&self, root: &ElementRef, by: &By) -> E2eResult<ElementRef>;

    /// Find every element matching `by`, relative to `root`
    async fn find_all_in(&self, root: &ElementRef, by: &By) -> E2eResult<Vec<ElementRef>>;

    async fn click(&self, element: &ElementRef) -> E2eResult<()>;

    /// Type `text` into an element
    async fn send_keys(&self, element: &ElementRef, text: &str) -> E2eResult<()>;

    /// Rendered text of an element; empty when it is not displayed
    async fn text(&self, element: &ElementRef) -> E2eResult<String>;

    async fn attribute(&self, element: &ElementRef, name: &str) -> E2eResult<Option<String>>;

    async fn property(&self, element: &ElementRef, name: &str) -> E2eResult<serde_json::Value>;

    async fn is_displayed(&self, element: &ElementRef) -> E2eResult<bool>;

    async fn is_enabled(&self, element: &ElementRef) -> E2eResult<bool>;

    /// Lower-case tag name of an element
    async fn tag_name(&self, element: &ElementRef) -> E2eResult<String>;

    /// Handle of the current window
    async fn window_handle(&self) -> E2eResult<String>;

    async fn window_handles(&self) -> E2eResult<Vec<String>>;

    async fn switch_to_window(&self, handle: &str) -> E2eResult<()>;

    /// Close the current window
    async fn close_window(&self) -> E2eResult<()>;

    /// Text of the open native alert/confirm dialog
    async fn alert_text(&self) -> E2eResult<String>;

    async fn accept_alert(&self) -> E2eResult<()>;
}
