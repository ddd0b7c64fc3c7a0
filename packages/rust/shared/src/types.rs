//! Core domain types: the documentation hierarchy.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::paths;

/// File name of the generated index inside every directory node.
pub const INDEX_FILE_NAME: &str = "index.md";

// ---------------------------------------------------------------------------
// OutlineEntry
// ---------------------------------------------------------------------------

/// One entry of a table of contents as read from navigation markup,
/// before kinds and local paths are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutlineEntry {
    /// Display title.
    pub title: String,
    /// Absolute link target, if the entry has one.
    pub url: Option<Url>,
    /// Nested entries in source order.
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    /// A leaf entry with a link.
    pub fn page(title: impl Into<String>, url: Url) -> Self {
        Self {
            title: title.into(),
            url: Some(url),
            children: Vec::new(),
        }
    }

    /// A grouping entry.
    pub fn group(title: impl Into<String>, url: Option<Url>, children: Vec<OutlineEntry>) -> Self {
        Self {
            title: title.into(),
            url,
            children,
        }
    }

    /// Number of leaf entries below (and including) this one.
    pub fn leaf_count(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.iter().map(OutlineEntry::leaf_count).sum()
        }
    }
}

// ---------------------------------------------------------------------------
// HierarchyNode
// ---------------------------------------------------------------------------

/// Position of a node in the documentation tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Category,
    Subcategory,
    Page,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Root => "root",
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::Page => "page",
        };
        f.write_str(s)
    }
}

/// One entry in the resolved documentation tree.
///
/// Built once by the resolver and read-only afterwards. `local_path` is relative
/// to the output root: a directory for nodes with children, a `.md` file for pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    /// Display title.
    pub title: String,
    /// Absolute source URL (for groups without a link, the nearest ancestor's).
    pub source_url: Url,
    /// Root, category, subcategory or page.
    pub kind: NodeKind,
    /// Path relative to the output root.
    pub local_path: PathBuf,
    /// Children in table-of-contents order; empty for pages.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

/// A page together with the chain of nodes above it.
#[derive(Debug, Clone)]
pub struct PageRef<'a> {
    /// The page node.
    pub node: &'a HierarchyNode,
    /// Ancestors from the root (inclusive) down to the direct parent.
    pub ancestors: Vec<&'a HierarchyNode>,
}

impl PageRef<'_> {
    /// Titles of the enclosing categories, outermost first (root excluded).
    pub fn breadcrumb(&self) -> Vec<String> {
        self.ancestors
            .iter()
            .filter(|n| n.kind != NodeKind::Root)
            .map(|n| n.title.clone())
            .collect()
    }
}

impl HierarchyNode {
    /// Build the full tree from a resolved outline.
    ///
    /// Kinds follow position: depth 1 groups are categories, deeper groups are
    /// subcategories and every leaf is a page. Local paths are assigned from the
    /// sanitized title chain, with sibling collisions disambiguated in order.
    pub fn from_outline(site_title: &str, root_url: &Url, entries: &[OutlineEntry]) -> Self {
        let children = build_children(entries, root_url, Path::new(""), 1);
        Self {
            title: site_title.to_string(),
            source_url: root_url.clone(),
            kind: NodeKind::Root,
            local_path: PathBuf::new(),
            children,
        }
    }

    /// Whether this node is a leaf page.
    pub fn is_page(&self) -> bool {
        self.kind == NodeKind::Page
    }

    /// Path of this directory node's index file, relative to the output root.
    pub fn index_path(&self) -> PathBuf {
        self.local_path.join(INDEX_FILE_NAME)
    }

    /// Link target for this node as seen from its parent's directory.
    pub fn link_from_parent(&self) -> String {
        let name = self
            .local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.is_page() {
            name
        } else {
            format!("{name}/{INDEX_FILE_NAME}")
        }
    }

    /// All pages, depth-first in table-of-contents order.
    pub fn pages(&self) -> Vec<PageRef<'_>> {
        let mut out = Vec::new();
        let mut ancestors = Vec::new();
        collect_pages(self, &mut ancestors, &mut out);
        out
    }

    /// All nodes that own a directory (root, categories, subcategories), pre-order.
    pub fn directories(&self) -> Vec<&HierarchyNode> {
        let mut out = Vec::new();
        collect_directories(self, &mut out);
        out
    }

    /// Total number of pages in the subtree.
    pub fn page_count(&self) -> usize {
        if self.is_page() {
            1
        } else {
            self.children.iter().map(HierarchyNode::page_count).sum()
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentMetadata
// ---------------------------------------------------------------------------

/// Header fields written in front of every converted page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Page title as listed in the table of contents.
    pub title: String,
    /// Where the page was fetched from.
    pub source_url: Url,
    /// When the page was fetched.
    pub retrieved_at: DateTime<Utc>,
    /// Enclosing category titles, outermost first.
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    /// Other mirrored pages this page links to.
    #[serde(default)]
    pub related: Vec<RelatedPage>,
}

/// A link from one mirrored page to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedPage {
    pub title: String,
    /// Relative link from the linking page.
    pub path: String,
}

fn build_children(
    entries: &[OutlineEntry],
    parent_url: &Url,
    parent_dir: &Path,
    depth: usize,
) -> Vec<HierarchyNode> {
    let mut taken = paths::SiblingNames::new();

    entries
        .iter()
        .map(|entry| {
            let is_page = entry.children.is_empty();
            let kind = match (is_page, depth) {
                (true, _) => NodeKind::Page,
                (false, 1) => NodeKind::Category,
                (false, _) => NodeKind::Subcategory,
            };
            let source_url = entry.url.clone().unwrap_or_else(|| parent_url.clone());

            let segment = taken.claim(&entry.title, is_page);
            let local_path = parent_dir.join(segment);

            let children = if is_page {
                Vec::new()
            } else {
                build_children(&entry.children, &source_url, &local_path, depth + 1)
            };

            HierarchyNode {
                title: entry.title.clone(),
                source_url,
                kind,
                local_path,
                children,
            }
        })
        .collect()
}

fn collect_pages<'a>(
    node: &'a HierarchyNode,
    ancestors: &mut Vec<&'a HierarchyNode>,
    out: &mut Vec<PageRef<'a>>,
) {
    if node.is_page() {
        out.push(PageRef {
            node,
            ancestors: ancestors.clone(),
        });
        return;
    }

    ancestors.push(node);
    for child in &node.children {
        collect_pages(child, ancestors, out);
    }
    ancestors.pop();
}

fn collect_directories<'a>(node: &'a HierarchyNode, out: &mut Vec<&'a HierarchyNode>) {
    if node.is_page() {
        return;
    }
    out.push(node);
    for child in &node.children {
        collect_directories(child, out);
    }
}
