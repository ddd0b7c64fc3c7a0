//! End-to-end `mirror` pipeline: TOC → fetch → convert → annotate → write → indexes.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument, warn};

use docmirror_crawler::{PageFetcher, Resolver};
use docmirror_markdown::{ConvertOptions, ConvertedDocument, LinkMap};
use docmirror_shared::{DocumentMetadata, PageRef, Result, RunConfig};

use crate::{index, materializer};

/// A page that could not be mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPage {
    pub title: String,
    pub url: String,
    /// Failing stage (`fetch` or `convert`).
    pub stage: String,
    pub reason: String,
}

/// Result of one mirror run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Pages listed in the table of contents.
    pub pages_total: usize,
    /// Pages written to disk.
    pub pages_written: usize,
    /// Pages skipped after a recoverable failure, in visiting order.
    pub skipped: Vec<SkippedPage>,
    /// Number of `index.md` files written.
    pub indexes_written: usize,
    /// Mirror root.
    pub output_dir: PathBuf,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before a page is fetched.
    fn page_started(&self, title: &str, current: usize, total: usize);
    /// Called after a page was written.
    fn page_done(&self, path: &Path);
    /// Called when a page is skipped.
    fn page_skipped(&self, page: &SkippedPage);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_started(&self, _title: &str, _current: usize, _total: usize) {}
    fn page_done(&self, _path: &Path) {}
    fn page_skipped(&self, _page: &SkippedPage) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Mirror the documentation site described by `config`.
///
/// Resolution and write failures abort the run. Fetch and conversion failures
/// skip the page, are recorded in the summary, and processing continues. A
/// skipped page's file from an earlier run is removed.
#[instrument(skip_all, fields(output_dir = %config.output_dir.display()))]
pub async fn run<F: PageFetcher>(
    config: &RunConfig,
    fetcher: &F,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let root_url = config.require_root_url()?;
    info!(%root_url, "starting mirror run");

    // --- Phase 1: Table of contents ---
    progress.phase("Resolving table of contents");
    let root = Resolver::new(fetcher)
        .resolve(&root_url, config.site_title.as_deref())
        .await?;
    let links = LinkMap::from_hierarchy(&root);

    // --- Phase 2: Pages ---
    progress.phase("Mirroring pages");
    let pages = root.pages();
    let total = pages.len();
    let delay = Duration::from_millis(config.http.request_delay_ms);
    let mut pages_written = 0;
    let mut skipped = Vec::new();

    for (i, page) in pages.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        progress.page_started(&page.node.title, i + 1, total);

        match mirror_page(config, fetcher, &links, page).await {
            Ok(path) => {
                pages_written += 1;
                progress.page_done(&path);
            }
            Err(e) if e.is_recoverable() => {
                warn!(
                    url = %page.node.source_url,
                    stage = e.stage(),
                    error = %e,
                    "skipping page"
                );
                let skip = SkippedPage {
                    title: page.node.title.clone(),
                    url: page.node.source_url.to_string(),
                    stage: e.stage().to_string(),
                    reason: e.to_string(),
                };
                materializer::remove_page(&config.output_dir, page.node)?;
                progress.page_skipped(&skip);
                skipped.push(skip);
            }
            Err(e) => return Err(e),
        }
    }

    // --- Phase 3: Indexes ---
    progress.phase("Writing indexes");
    let indexes_written = index::write_indexes(&config.output_dir, &root, config.parent_links)?;

    let summary = RunSummary {
        pages_total: total,
        pages_written,
        skipped,
        indexes_written,
        output_dir: config.output_dir.clone(),
        elapsed: start.elapsed(),
    };
    progress.done(&summary);

    info!(
        pages_total = summary.pages_total,
        pages_written = summary.pages_written,
        skipped = summary.skipped.len(),
        indexes_written = summary.indexes_written,
        elapsed_ms = summary.elapsed.as_millis(),
        "mirror run complete"
    );

    Ok(summary)
}

/// Fetch, convert, annotate and write one page.
async fn mirror_page<F: PageFetcher>(
    config: &RunConfig,
    fetcher: &F,
    links: &LinkMap,
    page: &PageRef<'_>,
) -> Result<PathBuf> {
    let node = page.node;
    let html = fetcher.fetch(&node.source_url).await?;
    let retrieved_at = Utc::now();

    let opts = ConvertOptions {
        source_url: &node.source_url,
        local_path: &node.local_path,
        links,
        default_code_language: config.default_code_language.as_deref(),
    };
    let body = docmirror_markdown::convert(&html, &opts)?;

    let document = ConvertedDocument {
        markdown_body: body.markdown,
        metadata: DocumentMetadata {
            title: node.title.clone(),
            source_url: node.source_url.clone(),
            retrieved_at,
            breadcrumb: page.breadcrumb(),
            related: body.related,
        },
    };
    materializer::write_page(&config.output_dir, node, &document.render())
}
