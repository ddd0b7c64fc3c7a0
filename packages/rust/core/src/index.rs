//! `index.md` generation for every directory of the mirror.

use std::path::Path;

use tracing::{debug, instrument};

use docmirror_shared::{HierarchyNode, INDEX_FILE_NAME, Result};

use crate::materializer::write_atomic;

/// Render the index of a directory node.
///
/// Lists every direct child in table-of-contents order, whether or not its
/// page was written. With `parent`, a link back to the parent index follows.
pub fn render_index(node: &HierarchyNode, parent: Option<&HierarchyNode>) -> String {
    let mut out = format!("# {}\n\n", node.title);
    for (i, child) in node.children.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}]({})\n",
            i + 1,
            escape_link_text(&child.title),
            link_target(&child.link_from_parent())
        ));
    }
    if let Some(parent) = parent {
        out.push_str(&format!(
            "\nPart of [{}](../{INDEX_FILE_NAME})\n",
            escape_link_text(&parent.title)
        ));
    }
    out
}

/// Write `index.md` into every directory of the tree. Returns how many were written.
#[instrument(skip_all, fields(output_root = %output_root.display()))]
pub fn write_indexes(
    output_root: &Path,
    root: &HierarchyNode,
    parent_links: bool,
) -> Result<usize> {
    let mut written = 0;
    write_recursive(output_root, root, None, parent_links, &mut written)?;
    debug!(written, "indexes written");
    Ok(written)
}

fn write_recursive(
    output_root: &Path,
    node: &HierarchyNode,
    parent: Option<&HierarchyNode>,
    parent_links: bool,
    written: &mut usize,
) -> Result<()> {
    if node.is_page() {
        return Ok(());
    }

    let content = render_index(node, parent.filter(|_| parent_links));
    write_atomic(&output_root.join(node.index_path()), &content)?;
    *written += 1;

    for child in &node.children {
        write_recursive(output_root, child, Some(node), parent_links, written)?;
    }
    Ok(())
}

fn escape_link_text(title: &str) -> String {
    title.replace('[', "\\[").replace(']', "\\]")
}

/// Angle-bracket destinations that would otherwise end the link early.
fn link_target(path: &str) -> String {
    if path.contains([' ', '(', ')']) {
        format!("<{path}>")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmirror_shared::OutlineEntry;
    use url::Url;

    fn tree() -> HierarchyNode {
        let base = Url::parse("https://docs.example.com/").unwrap();
        let page = |t: &str, p: &str| OutlineEntry::page(t, base.join(p).unwrap());
        HierarchyNode::from_outline(
            "Docs",
            &base,
            &[OutlineEntry::group(
                "Category A",
                None,
                vec![
                    page("Page 1", "page1.htm"),
                    OutlineEntry::group(
                        "Subcategory A1",
                        None,
                        vec![page("Page 2", "page2.htm")],
                    ),
                    page("Stops [adv]", "stops(1).htm"),
                ],
            )],
        )
    }

    #[test]
    fn renders_children_in_order() {
        let root = tree();
        let cat = &root.children[0];
        assert_eq!(
            render_index(cat, Some(&root)),
            "# Category A\n\n\
             1. [Page 1](Page1.md)\n\
             2. [Subcategory A1](SubcategoryA1/index.md)\n\
             3. [Stops \\[adv\\]](Stops[adv].md)\n\
             \nPart of [Docs](../index.md)\n"
        );
        assert_eq!(
            render_index(&root, None),
            "# Docs\n\n1. [Category A](CategoryA/index.md)\n"
        );
    }

    #[test]
    fn writes_every_directory_index() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tree();

        let written = write_indexes(tmp.path(), &root, true).unwrap();
        assert_eq!(written, 3);

        let sub =
            std::fs::read_to_string(tmp.path().join("CategoryA/SubcategoryA1/index.md")).unwrap();
        assert_eq!(
            sub,
            "# Subcategory A1\n\n1. [Page 2](Page2.md)\n\nPart of [Category A](../index.md)\n"
        );
        assert!(tmp.path().join("index.md").exists());
    }

    #[test]
    fn parent_links_can_be_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        write_indexes(tmp.path(), &tree(), false).unwrap();
        let cat = std::fs::read_to_string(tmp.path().join("CategoryA/index.md")).unwrap();
        assert!(!cat.contains("Part of"));
    }

    #[test]
    fn angle_brackets_wrap_awkward_paths() {
        assert_eq!(link_target("A/B.md"), "A/B.md");
        assert_eq!(link_target("Bars(1).md"), "<Bars(1).md>");
    }
}
