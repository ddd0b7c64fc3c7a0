//! Title-to-filesystem mapping and relative link computation.

use std::collections::HashSet;
use std::path::{Component, Path};

use url::Url;

use crate::types::INDEX_FILE_NAME;

/// Characters that are unsafe in a path segment on common filesystems.
const RESERVED: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Device names Windows refuses as file names regardless of extension.
const WINDOWS_DEVICES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Map a title to a filesystem-safe path segment.
///
/// Whitespace is removed, reserved and control characters become `_`,
/// leading/trailing dots are stripped. The mapping is pure, so the same title
/// always yields the same segment.
pub fn sanitize_segment(title: &str) -> String {
    let mapped: String = title
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            if RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = mapped.trim_matches('.');
    if trimmed.is_empty() {
        return "untitled".to_string();
    }

    if WINDOWS_DEVICES
        .iter()
        .any(|d| d.eq_ignore_ascii_case(trimmed))
    {
        return format!("{trimmed}_");
    }

    trimmed.to_string()
}

/// Allocates unique file/directory names among the children of one node.
///
/// Comparison is case-insensitive so the tree survives case-folding filesystems.
/// The directory's own `index.md` is pre-claimed.
#[derive(Debug)]
pub(crate) struct SiblingNames {
    taken: HashSet<String>,
}

impl SiblingNames {
    pub(crate) fn new() -> Self {
        let mut taken = HashSet::new();
        taken.insert(INDEX_FILE_NAME.to_lowercase());
        Self { taken }
    }

    /// Claim a name for `title`; pages get a `.md` extension.
    pub(crate) fn claim(&mut self, title: &str, is_page: bool) -> String {
        let base = sanitize_segment(title);
        let with_ext = |stem: &str| {
            if is_page {
                format!("{stem}.md")
            } else {
                stem.to_string()
            }
        };

        let mut candidate = with_ext(&base);
        let mut n = 2;
        while !self.taken.insert(candidate.to_lowercase()) {
            candidate = with_ext(&format!("{base}-{n}"));
            n += 1;
        }
        candidate
    }
}

/// Relative link from one output file to another (both relative to the output root).
///
/// Uses `/` separators on every platform.
pub fn relative_link(from_file: &Path, to_file: &Path) -> String {
    let from_dir: Vec<String> = from_file
        .parent()
        .map(normal_components)
        .unwrap_or_default();
    let to: Vec<String> = normal_components(to_file);

    let common = from_dir
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    for _ in common..from_dir.len() {
        parts.push("..");
    }
    parts.extend(to[common..].iter().map(String::as_str));
    parts.join("/")
}

fn normal_components(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// Key used to match link targets against known pages (fragment stripped).
pub fn page_key(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    normalized.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_removes_whitespace_and_reserved() {
        assert_eq!(sanitize_segment("Category A"), "CategoryA");
        assert_eq!(sanitize_segment("Page 1"), "Page1");
        assert_eq!(sanitize_segment("What's new?"), "What'snew_");
        assert_eq!(sanitize_segment("a/b\\c:d*e|f\"g<h>"), "a_b_c_d_e_f_g_h_");
        assert_eq!(sanitize_segment("  Trading\tStrategies \n"), "TradingStrategies");
    }

    #[test]
    fn sanitize_edge_cases() {
        assert_eq!(sanitize_segment(""), "untitled");
        assert_eq!(sanitize_segment("..."), "untitled");
        assert_eq!(sanitize_segment(".hidden."), "hidden");
        assert_eq!(sanitize_segment("con"), "con_");
        assert_eq!(sanitize_segment("Über straße"), "Überstraße");
    }

    #[test]
    fn sanitize_is_deterministic() {
        let title = "Bars, Candles & Ticks: Overview";
        assert_eq!(sanitize_segment(title), sanitize_segment(title));
    }

    #[test]
    fn sibling_names_disambiguate_case_insensitively() {
        let mut names = SiblingNames::new();
        assert_eq!(names.claim("Setup", true), "Setup.md");
        assert_eq!(names.claim("setup", true), "setup-2.md");
        assert_eq!(names.claim("Setup", false), "Setup");
        assert_eq!(names.claim("Index", true), "Index-2.md");
    }

    #[test]
    fn relative_link_between_files() {
        let from = Path::new("CategoryA/Page1.md");
        assert_eq!(
            relative_link(from, Path::new("CategoryA/SubcategoryA1/Page2.md")),
            "SubcategoryA1/Page2.md"
        );
        assert_eq!(
            relative_link(
                Path::new("CategoryA/SubcategoryA1/Page2.md"),
                Path::new("CategoryB/Page3.md")
            ),
            "../../CategoryB/Page3.md"
        );
        assert_eq!(relative_link(from, Path::new("CategoryA/Page1.md")), "Page1.md");
        assert_eq!(relative_link(Path::new("index.md"), Path::new("A/index.md")), "A/index.md");
    }

    #[test]
    fn page_key_strips_fragment() {
        let a = Url::parse("https://docs.example.com/manual/trade.htm#stop").unwrap();
        let b = Url::parse("https://docs.example.com/manual/trade.htm").unwrap();
        assert_eq!(page_key(&a), page_key(&b));
    }
}
