//! Nested `<ul>`/`<ol>` navigation trees.
//!
//! Covers most generated documentation sites: a sidebar list where every `li`
//! holds a link and, optionally, a nested list of its children.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use super::{TocAdapter, TocItem, link_label, resolve_href};

/// Navigation containers in priority order; `body` is the last resort.
const CONTAINERS: &[&str] = &["#toc", ".toc", "nav", r#"[role="navigation"]"#, "body"];

static CONTAINER_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    CONTAINERS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

static LIST_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ul, ol").expect("valid selector"));

static LINKED_ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li a[href]").expect("valid selector"));

/// Reads nested list navigation.
pub struct NestedListAdapter;

impl TocAdapter for NestedListAdapter {
    fn detect(&self, doc: &Html) -> bool {
        find_list(doc).is_some()
    }

    fn extract(&self, doc: &Html, base: &Url) -> Vec<TocItem> {
        find_list(doc)
            .map(|list| read_list(list, base))
            .unwrap_or_default()
    }

    fn name(&self) -> &str {
        "nested-list"
    }
}

/// First list with at least one linked item inside the highest-priority container.
fn find_list(doc: &Html) -> Option<ElementRef<'_>> {
    CONTAINER_SELS.iter().find_map(|container_sel| {
        doc.select(container_sel).find_map(|container| {
            container
                .select(&LIST_SEL)
                .find(|list| list.select(&LINKED_ITEM_SEL).next().is_some())
        })
    })
}

fn read_list(list: ElementRef<'_>, base: &Url) -> Vec<TocItem> {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
        .filter_map(|li| read_item(li, base))
        .collect()
}

/// Parts of one `li` found without descending into its nested lists.
#[derive(Default)]
struct ItemParts<'a> {
    anchor: Option<ElementRef<'a>>,
    text: String,
    lists: Vec<ElementRef<'a>>,
}

fn scan<'a>(el: ElementRef<'a>, parts: &mut ItemParts<'a>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) if parts.anchor.is_none() => parts.text.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                match child_el.value().name() {
                    "ul" | "ol" => parts.lists.push(child_el),
                    "a" if parts.anchor.is_none() => parts.anchor = Some(child_el),
                    "a" => {}
                    _ => scan(child_el, parts),
                }
            }
            _ => {}
        }
    }
}

fn read_item(li: ElementRef<'_>, base: &Url) -> Option<TocItem> {
    let mut parts = ItemParts::default();
    scan(li, &mut parts);

    let children: Vec<TocItem> = parts
        .lists
        .iter()
        .flat_map(|list| read_list(*list, base))
        .collect();

    let title = parts
        .anchor
        .as_ref()
        .map(link_label)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| parts.text.split_whitespace().collect::<Vec<_>>().join(" "));

    let url = parts
        .anchor
        .as_ref()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_href(href, base));

    if title.is_empty() || (url.is_none() && children.is_empty()) {
        return None;
    }

    let collapsed = children.is_empty()
        && (is_collapsed(&li) || parts.anchor.is_some_and(|a| is_collapsed(&a)));

    Some(TocItem {
        title,
        url,
        children,
        collapsed,
    })
}

fn is_collapsed(el: &ElementRef<'_>) -> bool {
    el.value().attr("aria-expanded") == Some("false")
        || el.value().classes().any(|c| c.contains("collapsed"))
}
