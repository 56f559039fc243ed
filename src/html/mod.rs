//! HTML adaptation engine.
//!
//! - [`tree`] - Arena-backed document tree
//! - [`parser`] - Lenient parser that keeps source text for untouched nodes
//! - [`serializer`] - Writes a tree back to text
//! - [`adapter`] - [`adapt_html`], the click/open tracking rewrite
//!
//! The parser is not a full HTML5 tree builder: it tolerates unclosed and
//! mis-nested elements by keeping them as written rather than repairing them.

pub mod adapter;
pub mod parser;
pub mod serializer;
pub mod tree;

pub use adapter::adapt_html;
pub use parser::parse;
pub use serializer::serialize;
pub use tree::{Attribute, Document, Element, Node, NodeId, NodeKind};
