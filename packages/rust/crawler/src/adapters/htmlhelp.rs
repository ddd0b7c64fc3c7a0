//! HTML-Help style table of contents.
//!
//! Help-authoring tools export a flat list of links where the hierarchy is only
//! visible through marker images: a book icon in front of a category, a smaller
//! one in front of a subcategory, and plain `a.clsTOCItem` links for pages.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{TocAdapter, TocItem, link_label, resolve_href};

/// Marker image that introduces a top-level category.
const CATEGORY_MARKER: &str = "p4.gif";

/// Marker image that introduces a subcategory of the current category.
const SUBCATEGORY_MARKER: &str = "p3.gif";

/// Class carried by every page link.
const PAGE_CLASS: &str = "clsTOCItem";

static ITEM_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img, a").expect("valid selector"));

static DETECT_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a.clsTOCItem, img[src*="p4.gif"]"#).expect("valid selector")
});

/// Reads marker-image tables of contents.
pub struct HtmlHelpAdapter;

impl TocAdapter for HtmlHelpAdapter {
    fn detect(&self, doc: &Html) -> bool {
        doc.select(&DETECT_SEL).next().is_some()
    }

    fn extract(&self, doc: &Html, base: &Url) -> Vec<TocItem> {
        let elements: Vec<ElementRef> = doc.select(&ITEM_SEL).collect();
        let mut outline = Outline::default();

        for (i, el) in elements.iter().enumerate() {
            match el.value().name() {
                "img" => {
                    let src = el.value().attr("src").unwrap_or("");
                    let is_category = src.contains(CATEGORY_MARKER);
                    let is_subcategory = src.contains(SUBCATEGORY_MARKER);
                    if !is_category && !is_subcategory {
                        continue;
                    }

                    // The label is the link right after the marker.
                    let Some(label) = elements.get(i + 1).filter(|n| n.value().name() == "a")
                    else {
                        continue;
                    };
                    let title = link_label(label);
                    if title.is_empty() {
                        continue;
                    }
                    let url = label.value().attr("href").and_then(|h| resolve_href(h, base));

                    if is_category {
                        outline.open_category(title, url);
                    } else {
                        outline.open_subcategory(title, url);
                    }
                }
                "a" => {
                    if let Some(page) = page_link(el, base) {
                        outline.push_page(page);
                    }
                }
                _ => {}
            }
        }

        outline.items
    }

    fn name(&self) -> &str {
        "htmlhelp"
    }
}

/// A page link is an `a.clsTOCItem` pointing at an `.htm`/`.html` document.
fn page_link(a: &ElementRef, base: &Url) -> Option<TocItem> {
    if !a.value().classes().any(|c| c == PAGE_CLASS) {
        return None;
    }

    let url = resolve_href(a.value().attr("href")?, base)?;
    let path = url.path().to_ascii_lowercase();
    if !(path.ends_with(".htm") || path.ends_with(".html")) {
        return None;
    }

    let title = link_label(a);
    if title.is_empty() {
        return None;
    }
    Some(TocItem::link(title, url))
}

/// Builder tracking the currently open category and subcategory.
#[derive(Default)]
struct Outline {
    items: Vec<TocItem>,
    category: Option<usize>,
    subcategory: Option<usize>,
}

impl Outline {
    fn open_category(&mut self, title: String, url: Option<Url>) {
        self.items.push(group(title, url));
        self.category = Some(self.items.len() - 1);
        self.subcategory = None;
    }

    fn open_subcategory(&mut self, title: String, url: Option<Url>) {
        match self.category {
            Some(c) => {
                let children = &mut self.items[c].children;
                children.push(group(title, url));
                self.subcategory = Some(children.len() - 1);
            }
            // a subcategory marker with no enclosing category acts as one
            None => self.open_category(title, url),
        }
    }

    fn push_page(&mut self, page: TocItem) {
        match (self.category, self.subcategory) {
            (Some(c), Some(s)) => self.items[c].children[s].children.push(page),
            (Some(c), None) => self.items[c].children.push(page),
            (None, _) => self.items.push(page),
        }
    }
}

fn group(title: String, url: Option<Url>) -> TocItem {
    TocItem {
        title,
        url,
        ..TocItem::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOC: &str = r##"<html><head><title>Manual</title></head><body>
        <a class="clsTOCItem" href="intro.htm">Welcome</a>
        <p><img src="images/p4.gif"><a class="clsTOCItem" href="start.htm" title="Getting Started">Start</a></p>
        <p><a class="clsTOCItem" href="install.htm">Installation</a></p>
        <p><img src="images/p3.gif"><a href="#">Brokers</a></p>
        <p><a class="clsTOCItem" href="ib.htm#setup">Interactive Brokers</a></p>
        <p><a class="clsTOCItem" href="fxcm.html">FXCM</a></p>
        <p><img src="images/p4.gif"><a href="scripts.htm">Scripts</a></p>
        <p><a class="clsTOCItem" href="variables.htm">Variables</a></p>
        <p><a class="clsTOCItem" href="notes.pdf">Notes</a></p>
        <p><a href="other.htm">Not a TOC item</a></p>
    </body></html>"##;

    fn extract() -> Vec<TocItem> {
        let doc = Html::parse_document(TOC);
        let base = Url::parse("https://docs.example.com/manual/ht_contents.htm").unwrap();
        HtmlHelpAdapter.extract(&doc, &base)
    }

    fn titles(items: &[TocItem]) -> Vec<&str> {
        items.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn detects_marker_toc() {
        let doc = Html::parse_document(TOC);
        assert!(HtmlHelpAdapter.detect(&doc));
    }

    #[test]
    fn builds_categories_from_markers() {
        let items = extract();
        assert_eq!(titles(&items), vec!["Welcome", "Getting Started", "Scripts"]);

        let started = &items[1];
        // the label link is itself a page, so it opens the category's listing
        assert_eq!(titles(&started.children), vec!["Getting Started", "Installation", "Brokers"]);
        assert_eq!(started.url.as_ref().unwrap().path(), "/manual/start.htm");

        let brokers = &started.children[2];
        assert_eq!(brokers.url, None);
        assert_eq!(titles(&brokers.children), vec!["Interactive Brokers", "FXCM"]);
        assert_eq!(
            brokers.children[0].url.as_ref().unwrap().as_str(),
            "https://docs.example.com/manual/ib.htm#setup"
        );
    }

    #[test]
    fn new_category_resets_subcategory() {
        let items = extract();
        let scripts = &items[2];
        // plain label link without the page class is not a page
        assert_eq!(titles(&scripts.children), vec!["Variables"]);
    }

    #[test]
    fn subcategory_without_category_becomes_category() {
        let doc = Html::parse_document(
            r#"<body><img src="p3.gif"><a href="x.htm">Loose</a>
               <a class="clsTOCItem" href="y.htm">Y</a></body>"#,
        );
        let base = Url::parse("https://docs.example.com/").unwrap();
        let items = HtmlHelpAdapter.extract(&doc, &base);
        assert_eq!(titles(&items), vec!["Loose"]);
        assert_eq!(titles(&items[0].children), vec!["Y"]);
    }
}
