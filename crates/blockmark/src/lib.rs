//! Two-way conversion between block-tagged text and a rich document tree.
//!
//! Custom blocks are written in text as JSX-like tags:
//!
//! ```text
//! <Note title="Heads up">
//!   Body text
//! </Note>
//! ```
//!
//! and live in the tree as [`BlockNode`]s with a type slug and opaque fields.
//! Each block type is described by a [`BlockDefinition`] registered in a
//! [`BlockRegistry`]; the registry drives both directions.
//!
//! # Architecture
//!
//! - [`TagPatterns`]: case-insensitive start/end matchers for a tag name
//! - [`PropsMap`]: attribute string parsing and rendering
//! - [`scan_body`]: nesting-aware search for a block's closing tag
//! - [`Converter`]: the ordered transformer list (block transformers first,
//!   then [`ElementTransformer`]s) applied to text or to a tree
//!
//! Blocks without custom code can be described with [`DeclarativeBlock`].
//!
//! # Example
//!
//! ```
//! use blockmark::{BlockRegistry, DeclarativeBlock, default_transformers, text_from_tree, tree_from_text};
//!
//! let registry = BlockRegistry::new()
//!     .with_block(DeclarativeBlock::new("Note").with_content_field("content"))
//!     .unwrap();
//! let transformers = default_transformers();
//!
//! let text = "# Intro\n\n<Note title=\"Heads up\">\n  Body text\n</Note>";
//! let tree = tree_from_text(text, &registry, &transformers);
//! assert_eq!(tree.len(), 2);
//! assert_eq!(text_from_tree(&tree, &registry, &transformers), text);
//! ```

mod convert;
mod declarative;
mod definition;
mod error;
mod export;
mod import;
mod pattern;
mod props;
mod registry;
mod scanner;
mod transformer;
mod tree;

pub use convert::{Converter, text_from_snapshot, text_from_tree, tree_from_text};
pub use declarative::DeclarativeBlock;
pub use definition::{
    BlockDefinition, BlockExport, CustomDelimiters, EndTag, ExportContext, ImportContext,
};
pub use error::{ConvertError, RegistryError};
pub use export::render_tag;
pub use pattern::TagPatterns;
pub use props::PropsMap;
pub use registry::BlockRegistry;
pub use scanner::{ScanState, ScanStep, ScannedBody, TextDocument, scan_body};
pub use transformer::{
    ElementTransformer, HeadingTransformer, QuoteTransformer, default_transformers,
};
pub use tree::{BlockNode, DocumentTree, Fields, Node};
