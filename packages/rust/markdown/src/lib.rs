//! HTML-to-Markdown conversion, cleanup passes, and page annotation.
//!
//! [`convert`] extracts a page's main region, rebuilds it without chrome and
//! with links pointing into the mirror, converts it with `htmd`, and runs the
//! cleanup pipeline. [`annotate`] prefixes the result with front matter.

mod annotate;
mod cleanup;
mod links;
mod rebuild;

use std::path::Path;

use tracing::{debug, instrument};
use url::Url;

use docmirror_shared::{DocMirrorError, RelatedPage, Result};

pub use annotate::{ConvertedDocument, annotate};
pub use links::{LinkMap, LinkTarget};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Inputs for converting one page.
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions<'a> {
    /// Page URL, used to resolve relative links and images.
    pub source_url: &'a Url,
    /// Output path of the page relative to the mirror root.
    pub local_path: &'a Path,
    /// Pages of the mirror that links may be rewritten to.
    pub links: &'a LinkMap,
    /// Language tag for code blocks without a hint.
    pub default_code_language: Option<&'a str>,
}

/// Markdown body of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedBody {
    pub markdown: String,
    /// Mirrored pages the body links to, in order of first appearance.
    pub related: Vec<RelatedPage>,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert a fetched page to Markdown.
///
/// Fails with [`DocMirrorError::Conversion`] if the main region is empty or
/// `htmd` rejects the rebuilt HTML.
#[instrument(skip_all, fields(url = %opts.source_url))]
pub fn convert(html: &str, opts: &ConvertOptions<'_>) -> Result<ConvertedBody> {
    let rebuilt = rebuild::rebuild(html, opts);
    if !rebuilt.has_content {
        return Err(DocMirrorError::conversion(
            opts.source_url.as_str(),
            "main content region is empty",
        ));
    }

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "nav", "iframe", "noscript", "svg"])
        .build();

    let raw_markdown = converter.convert(&rebuilt.html).map_err(|e| {
        DocMirrorError::conversion(
            opts.source_url.as_str(),
            format!("htmd conversion failed: {e}"),
        )
    })?;
    debug!(
        raw_len = raw_markdown.len(),
        blocks = rebuilt.blocks.len(),
        "htmd conversion complete"
    );

    let restored = rebuild::restore_blocks(&raw_markdown, &rebuilt.blocks);
    let markdown = cleanup::run_pipeline(&restored);

    debug!(
        final_len = markdown.len(),
        related = rebuilt.related.len(),
        "conversion complete"
    );

    Ok(ConvertedBody {
        markdown,
        related: rebuilt.related,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
