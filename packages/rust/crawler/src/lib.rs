//! Fetching and table-of-contents resolution.
//!
//! This crate provides:
//! - [`fetch`]: the [`PageFetcher`] seam, an HTTP implementation, and a retry layer
//! - [`adapters`]: navigation markup readers behind an [`AdapterRegistry`]
//! - [`resolver`]: builds the [`HierarchyNode`](docmirror_shared::HierarchyNode) tree

pub mod adapters;
pub mod fetch;
pub mod resolver;

pub use adapters::{
    AdapterRegistry, HtmlHelpAdapter, NestedListAdapter, TocAdapter, TocItem, document_title,
};
pub use fetch::{HttpFetcher, PageFetcher, RetryPolicy, RetryingFetcher};
pub use resolver::Resolver;
