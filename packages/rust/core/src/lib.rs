//! Mirror pipeline orchestration for docmirror.
//!
//! This crate ties together table-of-contents resolution, page conversion,
//! and the filesystem side: writing pages and generating `index.md` files.

pub mod index;
pub mod materializer;
pub mod pipeline;

pub use index::{render_index, write_indexes};
pub use materializer::{remove_page, write_page};
pub use pipeline::{ProgressReporter, RunSummary, SilentProgress, SkippedPage, run};
