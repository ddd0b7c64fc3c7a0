//! CLI command definitions, routing, and tracing setup.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Report, Result, eyre};
use docmirror_core::{ProgressReporter, RunSummary, SkippedPage};
use docmirror_crawler::{HttpFetcher, Resolver, RetryPolicy, RetryingFetcher};
use docmirror_shared::{
    AppConfig, DocMirrorError, HierarchyNode, RunConfig, init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docmirror: mirror a documentation site into a local Markdown tree.
#[derive(Parser)]
#[command(
    name = "docmirror",
    version,
    about = "Mirror an online documentation site into a directory tree of Markdown files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Mirror every page listed in the table of contents.
    Mirror {
        #[command(flatten)]
        source: SourceArgs,

        /// Output directory for the mirror.
        #[arg(short, long, env = "DOCMIRROR_OUTPUT_DIR")]
        out: Option<PathBuf>,

        /// Per-request timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Extra attempts for transient fetch failures.
        #[arg(long)]
        retries: Option<u32>,

        /// Pause between page fetches, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Resolve and print the documentation hierarchy without fetching pages.
    Toc {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the hierarchy as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Which site to read.
#[derive(Args)]
pub(crate) struct SourceArgs {
    /// URL of the table-of-contents page.
    #[arg(env = "DOCMIRROR_ROOT_URL")]
    pub url: Option<String>,

    /// Title of the root index (defaults to the TOC page's title).
    #[arg(long)]
    pub title: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docmirror=info",
        1 => "docmirror=debug",
        _ => "docmirror=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Mirror {
            source,
            out,
            timeout,
            retries,
            delay_ms,
        } => {
            let overrides = Overrides {
                url: source.url,
                title: source.title,
                out,
                timeout,
                retries,
                delay_ms,
            };
            cmd_mirror(overrides).await
        }
        Command::Toc { source, json } => {
            let overrides = Overrides {
                url: source.url,
                title: source.title,
                ..Overrides::default()
            };
            cmd_toc(overrides, json).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Command-line values layered over the config file.
#[derive(Debug, Default)]
struct Overrides {
    url: Option<String>,
    title: Option<String>,
    out: Option<PathBuf>,
    timeout: Option<u64>,
    retries: Option<u32>,
    delay_ms: Option<u64>,
}

impl Overrides {
    fn apply(self, config: &AppConfig) -> RunConfig {
        let mut run = RunConfig::from(config);
        if let Some(url) = self.url {
            run.root_url = Some(url);
        }
        if let Some(title) = self.title {
            run.site_title = Some(title);
        }
        if let Some(out) = self.out {
            run.output_dir = out;
        }
        if let Some(secs) = self.timeout {
            run.http.timeout_secs = secs;
        }
        if let Some(n) = self.retries {
            run.http.max_retries = n;
        }
        if let Some(ms) = self.delay_ms {
            run.http.request_delay_ms = ms;
        }
        run
    }
}

/// Report a fatal library error as `<stage> failed: <detail>`.
fn fatal(err: DocMirrorError) -> Report {
    eyre!("{} failed: {err}", err.stage())
}

/// One client per run, shared by the resolver and every page fetch.
fn build_fetcher(config: &RunConfig) -> Result<RetryingFetcher<HttpFetcher>> {
    let client = HttpFetcher::new(&config.http).map_err(fatal)?;
    Ok(RetryingFetcher::new(client, RetryPolicy::from(&config.http)))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_mirror(overrides: Overrides) -> Result<()> {
    let config = overrides.apply(&load_config().map_err(fatal)?);
    let fetcher = build_fetcher(&config)?;

    info!(
        root_url = config.root_url.as_deref().unwrap_or(""),
        output_dir = %config.output_dir.display(),
        "mirroring documentation"
    );

    let reporter = CliProgress::new();
    let summary = docmirror_core::run(&config, &fetcher, &reporter)
        .await
        .map_err(|e| {
            reporter.abort();
            fatal(e)
        })?;

    print!("{}", render_summary(&summary));
    Ok(())
}

async fn cmd_toc(overrides: Overrides, json: bool) -> Result<()> {
    let config = overrides.apply(&load_config().map_err(fatal)?);
    let root_url = config.require_root_url().map_err(fatal)?;
    let fetcher = build_fetcher(&config)?;

    let root = Resolver::new(&fetcher)
        .resolve(&root_url, config.site_title.as_deref())
        .await
        .map_err(fatal)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&root)?);
    } else {
        print!("{}", render_tree(&root));
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config().map_err(fatal)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config().map_err(fatal)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn render_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  Mirror complete!");
    let _ = writeln!(out, "  Pages:    {}/{}", summary.pages_written, summary.pages_total);
    let _ = writeln!(out, "  Skipped:  {}", summary.skipped.len());
    let _ = writeln!(out, "  Indexes:  {}", summary.indexes_written);
    let _ = writeln!(out, "  Output:   {}", summary.output_dir.display());
    let _ = writeln!(out, "  Time:     {:.1}s", summary.elapsed.as_secs_f64());

    if !summary.skipped.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Skipped pages:");
        for skip in &summary.skipped {
            let _ = writeln!(
                out,
                "    - {} ({}) [{}] {}",
                skip.title, skip.url, skip.stage, skip.reason
            );
        }
    }
    let _ = writeln!(out);
    out
}

/// Indented outline of the hierarchy, one node per line with its local path.
fn render_tree(root: &HierarchyNode) -> String {
    let mut out = String::new();
    write_tree(&mut out, root, 0);
    out
}

fn write_tree(out: &mut String, node: &HierarchyNode, depth: usize) {
    let path = if node.is_page() {
        node.local_path.clone()
    } else {
        node.index_path()
    };
    let _ = writeln!(
        out,
        "{:indent$}[{}] {}  ({})",
        "",
        node.kind,
        node.title,
        path.display(),
        indent = depth * 2
    );
    for child in &node.children {
        write_tree(out, child, depth + 1);
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn abort(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_started(&self, title: &str, current: usize, total: usize) {
        self.spinner.set_message(format!("Mirroring [{current}/{total}] {title}"));
    }

    fn page_done(&self, _path: &Path) {}

    fn page_skipped(&self, page: &SkippedPage) {
        self.spinner
            .println(format!("  skipped {} ({}): {}", page.title, page.stage, page.reason));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmirror_shared::OutlineEntry;
    use url::Url;

    #[test]
    fn parses_mirror_flags() {
        let cli = Cli::try_parse_from([
            "docmirror",
            "-vv",
            "mirror",
            "https://docs.example.com/toc.htm",
            "-o",
            "out",
            "--retries",
            "2",
            "--delay-ms",
            "0",
            "--title",
            "Manual",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let Command::Mirror {
            source,
            out,
            retries,
            delay_ms,
            timeout,
        } = cli.command
        else {
            panic!("expected mirror command");
        };
        assert_eq!(source.url.as_deref(), Some("https://docs.example.com/toc.htm"));
        assert_eq!(source.title.as_deref(), Some("Manual"));
        assert_eq!(out, Some(PathBuf::from("out")));
        assert_eq!(retries, Some(2));
        assert_eq!(delay_ms, Some(0));
        assert_eq!(timeout, None);
    }

    #[test]
    fn parses_toc_json_and_log_format() {
        let cli = Cli::try_parse_from([
            "docmirror",
            "toc",
            "https://docs.example.com/toc.htm",
            "--json",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(cli.command, Command::Toc { json: true, .. }));
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = AppConfig::default();
        file.source.root_url = Some("https://file.example.com/toc.htm".into());
        file.http.max_retries = 1;

        let run = Overrides {
            url: Some("https://cli.example.com/toc.htm".into()),
            out: Some(PathBuf::from("mirror")),
            timeout: Some(5),
            ..Overrides::default()
        }
        .apply(&file);

        assert_eq!(run.root_url.as_deref(), Some("https://cli.example.com/toc.htm"));
        assert_eq!(run.output_dir, PathBuf::from("mirror"));
        assert_eq!(run.http.timeout_secs, 5);
        // untouched values come from the file
        assert_eq!(run.http.max_retries, 1);
        assert_eq!(run.http.request_delay_ms, 500);
    }

    #[test]
    fn fatal_errors_name_their_stage() {
        let err = fatal(DocMirrorError::resolution("https://x/toc.htm", "no navigation found"));
        assert!(err.to_string().starts_with("resolve failed: "));
    }

    #[test]
    fn tree_lists_kinds_and_paths() {
        let base = Url::parse("https://docs.example.com/").unwrap();
        let root = HierarchyNode::from_outline(
            "Docs",
            &base,
            &[OutlineEntry::group(
                "Category A",
                None,
                vec![OutlineEntry::page("Page 1", base.join("page1.htm").unwrap())],
            )],
        );

        assert_eq!(
            render_tree(&root),
            "[root] Docs  (index.md)\n\
             \x20\x20[category] Category A  (CategoryA/index.md)\n\
             \x20\x20\x20\x20[page] Page 1  (CategoryA/Page1.md)\n"
        );
    }

    #[test]
    fn summary_lists_skipped_pages() {
        let summary = RunSummary {
            pages_total: 3,
            pages_written: 2,
            skipped: vec![SkippedPage {
                title: "Page 3".into(),
                url: "https://docs.example.com/page3.htm".into(),
                stage: "fetch".into(),
                reason: "HTTP 404".into(),
            }],
            indexes_written: 2,
            output_dir: PathBuf::from("docs_mirror"),
            elapsed: Duration::from_millis(1500),
        };
        let text = render_summary(&summary);
        assert!(text.contains("Pages:    2/3"));
        assert!(text.contains("- Page 3 (https://docs.example.com/page3.htm) [fetch] HTTP 404"));
    }
}
