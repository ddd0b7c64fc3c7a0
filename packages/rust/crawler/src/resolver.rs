//! Table-of-contents resolution.
//!
//! Fetches the root page, reads its navigation with the first matching
//! adapter, expands collapsed entries whose children live on their own page,
//! and turns the result into a [`HierarchyNode`] tree with local paths.

use std::collections::HashSet;

use scraper::Html;
use tracing::{debug, info, instrument, warn};
use url::Url;

use docmirror_shared::{
    DEFAULT_SITE_TITLE, DocMirrorError, HierarchyNode, OutlineEntry, Result, page_key,
};

use crate::adapters::{AdapterRegistry, TocItem, document_title};
use crate::fetch::PageFetcher;

/// Upper bound on nested rounds of collapsed-entry expansion.
const MAX_EXPAND_ROUNDS: usize = 3;

/// Category that collects pages listed outside any category.
const MAIN_CATEGORY: &str = "Main";

/// Navigation read from one page.
struct Navigation {
    title: Option<String>,
    adapter: String,
    items: Vec<TocItem>,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Builds the documentation hierarchy from a site's navigation.
pub struct Resolver<'a, F> {
    fetcher: &'a F,
    registry: AdapterRegistry,
}

impl<'a, F: PageFetcher> Resolver<'a, F> {
    pub fn new(fetcher: &'a F) -> Self {
        Self {
            fetcher,
            registry: AdapterRegistry::new(),
        }
    }

    /// Resolve the full hierarchy below `root_url`.
    ///
    /// `site_title` overrides the root page's `<title>`. Fails with
    /// [`DocMirrorError::Resolution`] if the root (or a page needed to expand
    /// the navigation) cannot be fetched, no adapter recognises the markup,
    /// or the navigation lists no pages.
    #[instrument(skip_all, fields(root_url = %root_url))]
    pub async fn resolve(&self, root_url: &Url, site_title: Option<&str>) -> Result<HierarchyNode> {
        info!("resolving table of contents");

        let body = self.fetcher.fetch(root_url).await.map_err(|e| {
            DocMirrorError::resolution(root_url.as_str(), format!("root page unreachable: {e}"))
        })?;
        let nav = self.read_navigation(&body, root_url)?;
        debug!(adapter = %nav.adapter, entries = nav.items.len(), "navigation detected");

        let mut items = nav.items;
        self.expand_collapsed(&mut items, &nav.adapter, root_url)
            .await?;

        let outline = normalize(items);
        let page_count: usize = outline.iter().map(OutlineEntry::leaf_count).sum();
        if page_count == 0 {
            return Err(DocMirrorError::resolution(
                root_url.as_str(),
                "navigation lists no pages",
            ));
        }

        let title = site_title
            .map(str::to_string)
            .or(nav.title)
            .unwrap_or_else(|| DEFAULT_SITE_TITLE.to_string());

        let root = HierarchyNode::from_outline(&title, root_url, &outline);
        info!(
            pages = root.page_count(),
            categories = root.children.len(),
            "table of contents resolved"
        );
        Ok(root)
    }

    fn read_navigation(&self, body: &str, url: &Url) -> Result<Navigation> {
        let doc = Html::parse_document(body);
        let adapter = self.registry.detect(&doc).ok_or_else(|| {
            DocMirrorError::resolution(url.as_str(), "no recognizable navigation structure")
        })?;

        Ok(Navigation {
            title: document_title(&doc),
            adapter: adapter.name().to_string(),
            items: adapter.extract(&doc, url),
        })
    }

    fn read_with(&self, adapter: &str, body: &str, url: &Url) -> Vec<TocItem> {
        let doc = Html::parse_document(body);
        self.registry
            .by_name(adapter)
            .map(|a| a.extract(&doc, url))
            .unwrap_or_default()
    }

    /// Replace collapsed leaves with the children listed on their own page.
    async fn expand_collapsed(
        &self,
        items: &mut [TocItem],
        adapter: &str,
        root_url: &Url,
    ) -> Result<()> {
        let mut seen: HashSet<String> = HashSet::from([page_key(root_url)]);

        for round in 0..MAX_EXPAND_ROUNDS {
            let mut pending = Vec::new();
            collect_collapsed(items, &mut Vec::new(), &mut pending);
            if pending.is_empty() {
                return Ok(());
            }
            debug!(round, pending = pending.len(), "expanding collapsed entries");

            for (position, url) in pending {
                let key = page_key(&url);
                let children = if seen.insert(key.clone()) {
                    let body = self.fetcher.fetch(&url).await.map_err(|e| {
                        DocMirrorError::resolution(
                            url.as_str(),
                            format!("cannot expand collapsed entry: {e}"),
                        )
                    })?;
                    let listing = self.read_with(adapter, &body, &url);
                    find_children(&listing, &key).unwrap_or_default()
                } else {
                    Vec::new()
                };

                if let Some(item) = item_at_mut(items, &position) {
                    if children.is_empty() {
                        debug!(%url, title = %item.title, "collapsed entry has no children");
                    }
                    item.collapsed = false;
                    item.children = children;
                }
            }
        }

        let mut remaining = Vec::new();
        collect_collapsed(items, &mut Vec::new(), &mut remaining);
        if !remaining.is_empty() {
            warn!(
                remaining = remaining.len(),
                "expansion depth reached, treating collapsed entries as pages"
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tree helpers
// ---------------------------------------------------------------------------

/// Positions and links of collapsed leaves, in document order.
fn collect_collapsed(items: &[TocItem], prefix: &mut Vec<usize>, out: &mut Vec<(Vec<usize>, Url)>) {
    for (i, item) in items.iter().enumerate() {
        prefix.push(i);
        if item.collapsed && item.children.is_empty() {
            if let Some(url) = &item.url {
                out.push((prefix.clone(), url.clone()));
            }
        } else {
            collect_collapsed(&item.children, prefix, out);
        }
        prefix.pop();
    }
}

fn item_at_mut<'t>(items: &'t mut [TocItem], position: &[usize]) -> Option<&'t mut TocItem> {
    let (first, rest) = position.split_first()?;
    let item = items.get_mut(*first)?;
    if rest.is_empty() {
        Some(item)
    } else {
        item_at_mut(&mut item.children, rest)
    }
}

/// Children of the first entry linking to `key` that lists any.
fn find_children(items: &[TocItem], key: &str) -> Option<Vec<TocItem>> {
    items.iter().find_map(|item| {
        let matches = item.url.as_ref().is_some_and(|u| page_key(u) == key);
        if matches && !item.children.is_empty() {
            Some(item.children.clone())
        } else {
            find_children(&item.children, key)
        }
    })
}

/// Drop dead entries and gather loose top-level pages under [`MAIN_CATEGORY`].
fn normalize(items: Vec<TocItem>) -> Vec<OutlineEntry> {
    let mut out: Vec<OutlineEntry> = Vec::new();
    let mut main: Option<usize> = None;

    for entry in items.into_iter().filter_map(to_outline) {
        if !entry.children.is_empty() {
            out.push(entry);
            continue;
        }
        match main {
            Some(i) => out[i].children.push(entry),
            None => {
                out.push(OutlineEntry::group(MAIN_CATEGORY, None, vec![entry]));
                main = Some(out.len() - 1);
            }
        }
    }
    out
}

/// Groups without children become pages if linked, and vanish otherwise.
fn to_outline(item: TocItem) -> Option<OutlineEntry> {
    let children: Vec<OutlineEntry> = item.children.into_iter().filter_map(to_outline).collect();
    match (children.is_empty(), item.url) {
        (false, url) => Some(OutlineEntry::group(item.title, url, children)),
        (true, Some(url)) => Some(OutlineEntry::page(item.title, url)),
        (true, None) => None,
    }
}
