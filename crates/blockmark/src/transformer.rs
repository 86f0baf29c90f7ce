//! Generic element transformers.
//!
//! Line-level converters for non-block nodes (headings, quotes). They run
//! after all block transformers in the same conversion pass.

use std::sync::LazyLock;

use regex::Regex;

use crate::tree::Node;

static HEADING_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*$").expect("invalid heading regex"));

static QUOTE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s?(.*)$").expect("invalid quote regex"));

/// Converter for one kind of non-block node.
///
/// # Example
///
/// ```
/// use blockmark::{ElementTransformer, Node};
///
/// struct RuleTransformer;
///
/// impl ElementTransformer for RuleTransformer {
///     fn name(&self) -> &str { "rule" }
///
///     fn import_line(&self, line: &str) -> Option<Node> {
///         (line.trim() == "---").then(|| Node::paragraph("---"))
///     }
///
///     fn export(&self, _node: &Node) -> Option<String> {
///         None
///     }
/// }
/// ```
pub trait ElementTransformer: Send + Sync {
    /// Transformer name, for logging.
    fn name(&self) -> &str;

    /// Convert a single line, or `None` if this transformer doesn't match it.
    fn import_line(&self, line: &str) -> Option<Node>;

    /// Render a node, or `None` if this transformer doesn't handle it.
    fn export(&self, node: &Node) -> Option<String>;
}

/// ATX headings: `# Title` through `###### Title`.
#[derive(Debug, Default)]
pub struct HeadingTransformer;

impl ElementTransformer for HeadingTransformer {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn import_line(&self, line: &str) -> Option<Node> {
        let caps = HEADING_PATTERN.captures(line)?;
        let level = u8::try_from(caps[1].len()).ok()?;
        Some(Node::Heading {
            level,
            text: caps[2].to_owned(),
        })
    }

    fn export(&self, node: &Node) -> Option<String> {
        match node {
            Node::Heading { level, text } => {
                let level = usize::from((*level).clamp(1, 6));
                Some(format!("{} {text}", "#".repeat(level)))
            }
            _ => None,
        }
    }
}

/// Block quotes: `> text`.
#[derive(Debug, Default)]
pub struct QuoteTransformer;

impl ElementTransformer for QuoteTransformer {
    fn name(&self) -> &'static str {
        "quote"
    }

    fn import_line(&self, line: &str) -> Option<Node> {
        let caps = QUOTE_PATTERN.captures(line)?;
        Some(Node::Quote {
            text: caps[1].to_owned(),
        })
    }

    fn export(&self, node: &Node) -> Option<String> {
        match node {
            Node::Quote { text } => Some(
                text.lines()
                    .map(|line| format!("> {line}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            _ => None,
        }
    }
}

/// The built-in generic transformers, in matching order.
#[must_use]
pub fn default_transformers() -> Vec<Box<dyn ElementTransformer>> {
    vec![Box::new(HeadingTransformer), Box::new(QuoteTransformer)]
}
