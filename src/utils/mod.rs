//! Helpers for building tracking links and filtering candidate links.
//!
//! - [`url_builder`] - Joining base URLs and tokens, extracting tokens from paths
//! - [`link_filter`] - Which links the HTML adapter rewrites

pub mod link_filter;
pub mod url_builder;

pub use link_filter::{SkipReason, check_link, is_trackable_link};
pub use url_builder::{build_url, strip_base_url, token_from_path};
