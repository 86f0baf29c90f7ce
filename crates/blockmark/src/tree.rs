//! Rich document tree.
//!
//! The structured side of the conversion. Only [`BlockNode`] belongs to the
//! block transformer; the other node kinds are produced and rendered by
//! [`ElementTransformer`](crate::ElementTransformer)s and default line handling.
//!
//! Trees serialize to a JSON snapshot:
//!
//! ```json
//! {"children": [{"type": "block", "blockType": "Note", "fields": {"title": "Hi"}}]}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Block fields: insertion-ordered name to value mapping.
///
/// Values are stored verbatim. Nested rich text is stored as a tree snapshot
/// value.
pub type Fields = serde_json::Map<String, Value>;

/// Ordered forest of document nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentTree {
    /// Top-level nodes in document order.
    #[serde(default)]
    pub children: Vec<Node>,
}

impl DocumentTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node at the insertion point (the end of the tree).
    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Number of top-level nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Iterate over top-level block nodes.
    pub fn blocks(&self) -> impl Iterator<Item = &BlockNode> {
        self.children.iter().filter_map(|node| match node {
            Node::Block(block) => Some(block),
            _ => None,
        })
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    /// Custom block with a type slug and opaque fields.
    Block(BlockNode),
    /// Plain text paragraph (default line handling).
    Paragraph { text: String },
    /// Heading with level 1-6.
    Heading { level: u8, text: String },
    /// Block quote.
    Quote { text: String },
}

impl Node {
    /// Create a paragraph node.
    #[must_use]
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::Paragraph { text: text.into() }
    }
}

/// A block instance in the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    /// Block type slug (e.g., "Note").
    #[serde(rename = "blockType")]
    pub type_slug: String,
    /// Field values, unvalidated.
    #[serde(default)]
    pub fields: Fields,
}

impl BlockNode {
    /// Create a block node.
    #[must_use]
    pub fn new(type_slug: impl Into<String>, fields: Fields) -> Self {
        Self {
            type_slug: type_slug.into(),
            fields,
        }
    }

    /// Get a field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a string field value.
    #[must_use]
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

impl From<BlockNode> for Node {
    fn from(block: BlockNode) -> Self {
        Self::Block(block)
    }
}
