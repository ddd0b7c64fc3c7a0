//! Lookup from source URLs to mirrored page files.

use std::collections::HashMap;
use std::path::PathBuf;

use url::Url;

use docmirror_shared::{HierarchyNode, page_key};

/// A mirrored page a link can point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub title: String,
    /// Output path relative to the mirror root.
    pub path: PathBuf,
}

/// Known pages keyed by fragment-less source URL.
#[derive(Debug, Clone, Default)]
pub struct LinkMap {
    pages: HashMap<String, LinkTarget>,
}

impl LinkMap {
    /// Every page of the hierarchy; when a URL is listed twice the first entry wins.
    pub fn from_hierarchy(root: &HierarchyNode) -> Self {
        let mut map = Self::default();
        for page in root.pages() {
            map.insert(
                &page.node.source_url,
                page.node.title.clone(),
                page.node.local_path.clone(),
            );
        }
        map
    }

    pub fn insert(&mut self, url: &Url, title: String, path: PathBuf) {
        self.pages
            .entry(page_key(url))
            .or_insert(LinkTarget { title, path });
    }

    pub fn get(&self, url: &Url) -> Option<&LinkTarget> {
        self.pages.get(&page_key(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmirror_shared::OutlineEntry;

    #[test]
    fn first_listing_wins_and_fragments_are_ignored() {
        let base = Url::parse("https://docs.example.com/").unwrap();
        let outline = vec![OutlineEntry::group(
            "Guide",
            None,
            vec![
                OutlineEntry::page("Trading", base.join("trade.htm").unwrap()),
                OutlineEntry::page("Stops", base.join("trade.htm#stop").unwrap()),
            ],
        )];
        let root = HierarchyNode::from_outline("Docs", &base, &outline);
        let map = LinkMap::from_hierarchy(&root);

        assert_eq!(map.pages.len(), 1);
        let target = map.get(&base.join("trade.htm#other").unwrap()).unwrap();
        assert_eq!(target.title, "Trading");
        assert_eq!(target.path, PathBuf::from("Guide/Trading.md"));
        assert!(map.get(&base.join("missing.htm").unwrap()).is_none());
    }
}
