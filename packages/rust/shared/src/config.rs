//! Application configuration for docmirror.
//!
//! User config lives at `~/.docmirror/docmirror.toml`.
//! CLI flags override environment variables, which override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocMirrorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docmirror.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docmirror";

/// Title of the root index when neither config nor the TOC page provides one.
pub const DEFAULT_SITE_TITLE: &str = "Documentation Index";

// ---------------------------------------------------------------------------
// Config structs (matching docmirror.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which documentation site to mirror.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where to write the mirror.
    #[serde(default)]
    pub output: OutputConfig,

    /// HTTP client behaviour.
    #[serde(default)]
    pub http: HttpConfig,

    /// HTML-to-Markdown options.
    #[serde(default)]
    pub convert: ConvertConfig,

    /// Index file options.
    #[serde(default)]
    pub index: IndexConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL of the table-of-contents page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_url: Option<String>,

    /// Title for the root index (defaults to the TOC page's `<title>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_title: Option<String>,
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory of the mirrored tree.
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "docs_mirror".into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts for transient failures (0 disables retrying).
    #[serde(default)]
    pub max_retries: u32,

    /// Base delay before the first retry; doubles on each further attempt.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Pause between consecutive page fetches.
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
            retry_delay_ms: default_retry_delay(),
            request_delay_ms: default_request_delay(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    /// Per-request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_retry_delay() -> u64 {
    500
}
fn default_request_delay() -> u64 {
    500
}
fn default_user_agent() -> String {
    concat!("docmirror/", env!("CARGO_PKG_VERSION")).into()
}

/// `[convert]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Language tag for code blocks that carry no language hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_code_language: Option<String>,
}

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Append a link back to the parent index in every non-root index.
    #[serde(default = "default_true")]
    pub parent_links: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { parent_links: true }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one mirror run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// URL of the table-of-contents page (required to run).
    pub root_url: Option<String>,
    /// Root index title override.
    pub site_title: Option<String>,
    /// Output directory.
    pub output_dir: PathBuf,
    /// HTTP settings.
    pub http: HttpConfig,
    /// Code language used when a block has no hint.
    pub default_code_language: Option<String>,
    /// Whether indexes link back to their parent.
    pub parent_links: bool,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            root_url: config.source.root_url.clone(),
            site_title: config.source.site_title.clone(),
            output_dir: PathBuf::from(&config.output.dir),
            http: config.http.clone(),
            default_code_language: config.convert.default_code_language.clone(),
            parent_links: config.index.parent_links,
        }
    }
}

impl RunConfig {
    /// Parse the configured root URL, failing if it is absent or malformed.
    pub fn require_root_url(&self) -> Result<url::Url> {
        let raw = self.root_url.as_deref().ok_or_else(|| {
            DocMirrorError::config(
                "no root URL configured. Pass one on the command line, set \
                 DOCMIRROR_ROOT_URL, or add [source] root_url to the config file",
            )
        })?;

        url::Url::parse(raw)
            .map_err(|e| DocMirrorError::config(format!("invalid root URL '{raw}': {e}")))
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docmirror/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocMirrorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docmirror/docmirror.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocMirrorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocMirrorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocMirrorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DocMirrorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocMirrorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
