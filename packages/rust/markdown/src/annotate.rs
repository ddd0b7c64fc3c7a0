//! YAML front matter for converted pages.

use chrono::SecondsFormat;

use docmirror_shared::DocumentMetadata;

/// A converted page body together with its header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    pub markdown_body: String,
    pub metadata: DocumentMetadata,
}

impl ConvertedDocument {
    /// Final file contents: front matter, a blank line, then the body.
    pub fn render(&self) -> String {
        annotate(&self.markdown_body, &self.metadata)
    }
}

/// Prefix `body` with a front matter block describing `meta`.
///
/// Fields are always written in the same order so reruns differ only in
/// `retrieved_at`.
pub fn annotate(body: &str, meta: &DocumentMetadata) -> String {
    let mut out = String::from("---\n");
    out.push_str(&format!("title: {}\n", quote(&meta.title)));
    out.push_str(&format!("source_url: {}\n", quote(meta.source_url.as_str())));
    out.push_str(&format!(
        "retrieved_at: {}\n",
        quote(&meta.retrieved_at.to_rfc3339_opts(SecondsFormat::Secs, true))
    ));

    let breadcrumb: Vec<String> = meta.breadcrumb.iter().map(|t| quote(t)).collect();
    out.push_str(&format!("breadcrumb: [{}]\n", breadcrumb.join(", ")));

    if meta.related.is_empty() {
        out.push_str("related_pages: []\n");
    } else {
        out.push_str("related_pages:\n");
        for page in &meta.related {
            out.push_str(&format!("  - title: {}\n", quote(&page.title)));
            out.push_str(&format!("    path: {}\n", quote(&page.path)));
        }
    }
    out.push_str("---\n\n");
    out.push_str(body);
    out
}

/// Double-quoted YAML scalar.
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
