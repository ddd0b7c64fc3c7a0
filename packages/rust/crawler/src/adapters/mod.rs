//! Table-of-contents adapters.
//!
//! Adapters recognise a particular style of navigation markup and read it into
//! a tree of [`TocItem`]s. The registry tries them in priority order.

mod htmlhelp;
mod nested_list;

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

pub use htmlhelp::HtmlHelpAdapter;
pub use nested_list::NestedListAdapter;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// One navigation entry as found in the markup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TocItem {
    /// Display title.
    pub title: String,
    /// Absolute link target, if any.
    pub url: Option<Url>,
    /// Nested entries in source order.
    pub children: Vec<TocItem>,
    /// Marked as collapsed: its children live on the linked page.
    pub collapsed: bool,
}

impl TocItem {
    pub(crate) fn link(title: String, url: Url) -> Self {
        Self {
            title,
            url: Some(url),
            ..Self::default()
        }
    }
}

/// Reads one style of table-of-contents markup.
pub trait TocAdapter: Send + Sync {
    /// Whether this adapter understands the document's navigation.
    fn detect(&self, doc: &Html) -> bool;

    /// Read the navigation tree, resolving links against `base`.
    fn extract(&self, doc: &Html, base: &Url) -> Vec<TocItem>;

    /// Human-readable adapter name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered adapters in priority order.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn TocAdapter>>,
}

impl AdapterRegistry {
    /// Create a registry with all built-in adapters (most specific first).
    pub fn new() -> Self {
        Self {
            adapters: vec![Box::new(HtmlHelpAdapter), Box::new(NestedListAdapter)],
        }
    }

    /// Find the first adapter that recognises the document.
    pub fn detect(&self, doc: &Html) -> Option<&dyn TocAdapter> {
        self.adapters
            .iter()
            .find(|a| a.detect(doc))
            .map(|a| a.as_ref())
    }

    /// Look up an adapter by its [`TocAdapter::name`].
    pub fn by_name(&self, name: &str) -> Option<&dyn TocAdapter> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Text of an element with runs of whitespace collapsed to single spaces.
pub(crate) fn collapsed_text(el: &ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Label of a link: its `title` attribute if present, else its text.
pub(crate) fn link_label(a: &ElementRef) -> String {
    a.value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .unwrap_or_else(|| collapsed_text(a))
}

/// Resolve a navigational `href`, ignoring in-page anchors and non-HTTP schemes.
pub(crate) fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then_some(resolved)
}

/// Title of the document from `<title>`, if non-empty.
pub fn document_title(doc: &Html) -> Option<String> {
    static TITLE_SEL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("title").expect("valid selector"));

    doc.select(&TITLE_SEL)
        .next()
        .map(|el| collapsed_text(&el))
        .filter(|t| !t.is_empty())
}
