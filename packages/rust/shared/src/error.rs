//! Error types for docmirror.
//!
//! Library crates use [`DocMirrorError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Errors fall into two groups. Per-page failures ([`DocMirrorError::Fetch`],
//! [`DocMirrorError::Conversion`]) are recorded in the run summary and the run
//! continues; everything else aborts the run.

use std::path::PathBuf;

/// Why a single HTTP fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchCause {
    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("HTTP {0}")]
    Status(u16),

    /// Connection could not be established or was reset.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The response body could not be read or decoded.
    #[error("body read failed: {0}")]
    Body(String),

    /// Anything else reported by the HTTP client.
    #[error("{0}")]
    Client(String),
}

impl FetchCause {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Connection(_) => true,
            Self::Status(code) => *code == 429 || (500..600).contains(code),
            Self::Body(_) | Self::Client(_) => false,
        }
    }
}

/// Top-level error type for all docmirror operations.
#[derive(Debug, thiserror::Error)]
pub enum DocMirrorError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The table of contents could not be fetched or understood.
    #[error("cannot resolve table of contents at {url}: {message}")]
    Resolution { url: String, message: String },

    /// A single page could not be retrieved.
    #[error("fetch failed for {url}: {cause}")]
    Fetch { url: String, cause: FetchCause },

    /// A page was retrieved but its content could not be converted.
    #[error("conversion failed for {url}: {message}")]
    Conversion { url: String, message: String },

    /// Writing to the output tree failed.
    #[error("write failed at {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading a non-output file failed.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocMirrorError>;

impl DocMirrorError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a resolution error for the given TOC URL.
    pub fn resolution(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Resolution {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Create a fetch error for the given URL.
    pub fn fetch(url: impl Into<String>, cause: FetchCause) -> Self {
        Self::Fetch {
            url: url.into(),
            cause,
        }
    }

    /// Create a conversion error for the given page URL.
    pub fn conversion(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Conversion {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` raised while writing output.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Short name of the pipeline stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::Resolution { .. } => "resolve",
            Self::Fetch { .. } => "fetch",
            Self::Conversion { .. } => "convert",
            Self::Write { .. } => "write",
            Self::Io { .. } => "io",
        }
    }

    /// Per-page errors that skip one page instead of aborting the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Conversion { .. })
    }
}
