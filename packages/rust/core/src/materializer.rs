//! Writes finished pages into the mirror tree.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use docmirror_shared::{DocMirrorError, HierarchyNode, Result};

/// Write a page's final Markdown to `<output_root>/<local_path>`.
///
/// Missing ancestor directories are created and an existing file is replaced.
/// Returns the path written.
#[instrument(skip_all, fields(path = %node.local_path.display()))]
pub fn write_page(output_root: &Path, node: &HierarchyNode, content: &str) -> Result<PathBuf> {
    let target = output_root.join(&node.local_path);
    write_atomic(&target, content)?;
    debug!(bytes = content.len(), "wrote page");
    Ok(target)
}

/// Delete a page's file left by an earlier run. A missing file is not an error.
#[instrument(skip_all, fields(path = %node.local_path.display()))]
pub fn remove_page(output_root: &Path, node: &HierarchyNode) -> Result<()> {
    let target = output_root.join(&node.local_path);
    match std::fs::remove_file(&target) {
        Ok(()) => {
            debug!("removed stale page");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DocMirrorError::write(target, e)),
    }
}

/// Write `content` to a temporary sibling, then rename it over `target`.
pub(crate) fn write_atomic(target: &Path, content: &str) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DocMirrorError::write(parent, e))?;
    }

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| DocMirrorError::write(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| DocMirrorError::write(target, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmirror_shared::NodeKind;
    use url::Url;

    fn page(path: &str) -> HierarchyNode {
        HierarchyNode {
            title: "Page 2".into(),
            source_url: Url::parse("https://docs.example.com/page2.htm").unwrap(),
            kind: NodeKind::Page,
            local_path: PathBuf::from(path),
            children: Vec::new(),
        }
    }

    #[test]
    fn creates_ancestors_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let node = page("CategoryA/SubcategoryA1/Page2.md");

        let written = write_page(tmp.path(), &node, "first\n").unwrap();
        assert_eq!(written, tmp.path().join("CategoryA/SubcategoryA1/Page2.md"));

        write_page(tmp.path(), &node, "second\n").unwrap();
        assert_eq!(std::fs::read_to_string(&written).unwrap(), "second\n");

        let leftovers: Vec<_> = std::fs::read_dir(written.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1, "temporary file left behind: {leftovers:?}");
    }

    #[test]
    fn remove_page_deletes_file_and_tolerates_absence() {
        let tmp = tempfile::tempdir().unwrap();
        let node = page("CategoryA/Page1.md");
        let written = write_page(tmp.path(), &node, "old\n").unwrap();

        remove_page(tmp.path(), &node).unwrap();
        assert!(!written.exists());
        // already gone
        remove_page(tmp.path(), &node).unwrap();
    }

    #[test]
    fn remove_page_on_directory_is_write_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("CategoryA/Page1.md")).unwrap();

        let err = remove_page(tmp.path(), &page("CategoryA/Page1.md")).unwrap_err();
        assert!(matches!(err, DocMirrorError::Write { .. }));
    }

    #[test]
    fn unwritable_target_is_write_error() {
        let tmp = tempfile::tempdir().unwrap();
        // a file where a directory is needed
        std::fs::write(tmp.path().join("CategoryA"), "not a directory").unwrap();

        let err = write_page(tmp.path(), &page("CategoryA/Page1.md"), "x").unwrap_err();
        assert!(matches!(err, DocMirrorError::Write { .. }));
        assert!(!err.is_recoverable());
        assert_eq!(err.stage(), "write");
    }
}
