//! Shared types, error model, and configuration for docmirror.
//!
//! This crate is the foundation depended on by all other docmirror crates.
//! It provides:
//! - [`DocMirrorError`]: the unified error type
//! - Domain types ([`HierarchyNode`], [`NodeKind`], [`OutlineEntry`], [`DocumentMetadata`])
//! - Path mapping ([`sanitize_segment`], [`relative_link`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod paths;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConvertConfig, DEFAULT_SITE_TITLE, HttpConfig, IndexConfig, OutputConfig,
    RunConfig, SourceConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{DocMirrorError, FetchCause, Result};
pub use paths::{page_key, relative_link, sanitize_segment};
pub use types::{
    DocumentMetadata, HierarchyNode, INDEX_FILE_NAME, NodeKind, OutlineEntry, PageRef, RelatedPage,
};
