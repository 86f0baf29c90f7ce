//! Block type definition trait.
//!
//! Each participating block type implements [`BlockDefinition`]: an `export`
//! operation rendering a node's fields to text, and an `import` operation
//! turning a matched tag back into fields.

use regex::Regex;
use serde_json::Value;

use crate::convert::Converter;
use crate::props::PropsMap;
use crate::tree::{DocumentTree, Fields};

/// Whether a block's closing tag must be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndTag {
    /// `</Slug>` must follow; without it the block is not recognized.
    #[default]
    Required,
    /// Without a closing tag the block resolves as self-closing.
    Optional,
    /// The block never has a body; every opening tag is complete.
    Void,
}

/// Host-supplied delimiters replacing the `<Slug>` tag syntax.
///
/// Used for fence-like syntax (e.g., ```` ```lang ````). The open line must
/// match `start`; the first subsequent line matching `end` closes the block.
/// Capture group 1 of `start` is parsed as the props string.
#[derive(Debug, Clone)]
pub struct CustomDelimiters {
    /// Open line matcher.
    pub start: Regex,
    /// Close line matcher.
    pub end: Regex,
}

/// Export result from a [`BlockDefinition`].
///
/// # Example
///
/// ```
/// use blockmark::{BlockExport, PropsMap};
///
/// // Render `<Note title="Hi"/>`
/// let props: PropsMap = [("title", "Hi")].into_iter().collect();
/// let output = BlockExport::self_closing(props);
///
/// // Render preformatted text as-is
/// let output = BlockExport::literal("```rust\nfn main() {}\n```");
///
/// // Decline; the next transformer is tried
/// let output = BlockExport::Reject;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockExport {
    /// Don't render this node.
    Reject,
    /// Preformatted text fragment.
    Literal(String),
    /// Tag with attributes and optional inner text.
    Tag {
        /// Attributes on the opening tag.
        attributes: PropsMap,
        /// Body text; `None` renders a self-closing tag.
        inner_text: Option<String>,
    },
}

impl BlockExport {
    /// Create a literal output.
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// Create a self-closing tag output.
    #[must_use]
    pub fn self_closing(attributes: PropsMap) -> Self {
        Self::Tag {
            attributes,
            inner_text: None,
        }
    }

    /// Create a paired tag output with a body.
    #[must_use]
    pub fn with_body(attributes: PropsMap, inner_text: impl Into<String>) -> Self {
        Self::Tag {
            attributes,
            inner_text: Some(inner_text.into()),
        }
    }
}

/// Handler for one block type.
///
/// Definitions are built once from configuration and shared read-only by
/// every conversion.
///
/// # Example
///
/// ```
/// use blockmark::{BlockDefinition, BlockExport, ExportContext, Fields, ImportContext, PropsMap};
/// use serde_json::Value;
///
/// struct NoteBlock;
///
/// impl BlockDefinition for NoteBlock {
///     fn slug(&self) -> &str { "Note" }
///
///     fn export(&self, fields: &Fields, _ctx: &ExportContext<'_>) -> BlockExport {
///         match fields.get("text").and_then(Value::as_str) {
///             Some(text) => BlockExport::with_body(PropsMap::new(), text),
///             None => BlockExport::Reject,
///         }
///     }
///
///     fn import(&self, content: &str, _props: PropsMap, _ctx: &ImportContext<'_>) -> Option<Fields> {
///         let mut fields = Fields::new();
///         fields.insert("text".to_owned(), Value::from(content));
///         Some(fields)
///     }
/// }
/// ```
pub trait BlockDefinition: Send + Sync {
    /// Block type slug, also used as the tag name.
    ///
    /// Unique within a registry, compared case-insensitively.
    fn slug(&self) -> &str;

    /// Whether this block has a textual form.
    ///
    /// Tree-only blocks are left out of text conversion entirely.
    fn has_text_form(&self) -> bool {
        true
    }

    /// Closing tag rule for the default tag syntax.
    fn end_tag(&self) -> EndTag {
        EndTag::Required
    }

    /// Custom delimiters replacing the default tag syntax.
    fn custom_delimiters(&self) -> Option<&CustomDelimiters> {
        None
    }

    /// Render a node's fields.
    fn export(&self, fields: &Fields, ctx: &ExportContext<'_>) -> BlockExport;

    /// Build fields from a matched block.
    ///
    /// `content` is the trimmed text between the opening and closing tags
    /// (empty for self-closing tags). Returns `None` to decline; no lines are
    /// consumed and the text falls through to default handling.
    fn import(&self, content: &str, props: PropsMap, ctx: &ImportContext<'_>) -> Option<Fields>;
}

/// Context passed to [`BlockDefinition::import`].
pub struct ImportContext<'a> {
    /// Zero-based index of the opening line.
    pub line: usize,
    /// Capture groups of the opening match (group 0 is the whole match).
    pub open_captures: Vec<Option<&'a str>>,
    /// Capture groups of the closing match, for custom delimiters.
    pub close_captures: Option<Vec<Option<&'a str>>>,
    pub(crate) converter: Converter<'a>,
}

impl ImportContext<'_> {
    /// Get an opening capture group.
    #[must_use]
    pub fn capture(&self, index: usize) -> Option<&str> {
        self.open_captures.get(index).copied().flatten()
    }

    /// Convert nested text with the same blocks and transformers.
    #[must_use]
    pub fn text_to_tree(&self, text: &str) -> DocumentTree {
        self.converter.tree_from_text(text)
    }

    /// Convert nested text to a tree snapshot value, for storing in a field.
    #[must_use]
    pub fn text_to_snapshot(&self, text: &str) -> Value {
        self.converter.snapshot_from_text(text)
    }
}

/// Context passed to [`BlockDefinition::export`].
pub struct ExportContext<'a> {
    pub(crate) converter: Converter<'a>,
}

impl ExportContext<'_> {
    /// Convert a nested tree with the same blocks and transformers.
    #[must_use]
    pub fn tree_to_text(&self, tree: &DocumentTree) -> String {
        self.converter.text_from_tree(tree)
    }

    /// Convert a nested tree snapshot stored in a field.
    ///
    /// Returns an empty string if the snapshot cannot be read.
    #[must_use]
    pub fn snapshot_to_text(&self, snapshot: &Value) -> String {
        self.converter.text_from_snapshot_value(snapshot)
    }
}
