//! Document conversion in both directions.
//!
//! Builds one ordered transformer list per call (block transformers in
//! registry order, then generic transformers) and drives the importer or the
//! exporter with it. Nothing is cached between calls; every call owns its
//! text cursor, scan states and output tree.

use serde::Deserialize;
use serde_json::Value;

use crate::definition::ExportContext;
use crate::error::ConvertError;
use crate::export::export_block;
use crate::import::{ImportedBlock, import_block};
use crate::registry::{BlockRegistry, RegisteredBlock};
use crate::scanner::TextDocument;
use crate::transformer::ElementTransformer;
use crate::tree::{DocumentTree, Node};

/// Convert text to a document tree.
///
/// # Example
///
/// ```
/// use blockmark::{BlockRegistry, DeclarativeBlock, Node, default_transformers, tree_from_text};
///
/// let registry = BlockRegistry::new()
///     .with_block(DeclarativeBlock::new("Note").with_content_field("content"))
///     .unwrap();
/// let transformers = default_transformers();
///
/// let tree = tree_from_text("# Title\n\n<Note/>\n\nText", &registry, &transformers);
/// assert_eq!(tree.len(), 3);
/// assert!(matches!(tree.children[1], Node::Block(_)));
/// ```
#[must_use]
pub fn tree_from_text(
    text: &str,
    registry: &BlockRegistry,
    transformers: &[Box<dyn ElementTransformer>],
) -> DocumentTree {
    Converter::new(registry, transformers).tree_from_text(text)
}

/// Convert a document tree to text.
#[must_use]
pub fn text_from_tree(
    tree: &DocumentTree,
    registry: &BlockRegistry,
    transformers: &[Box<dyn ElementTransformer>],
) -> String {
    Converter::new(registry, transformers).text_from_tree(tree)
}

/// Convert a stored JSON tree snapshot to text.
///
/// A snapshot that cannot be read is logged and yields an empty string.
#[must_use]
pub fn text_from_snapshot(
    snapshot: &str,
    registry: &BlockRegistry,
    transformers: &[Box<dyn ElementTransformer>],
) -> String {
    Converter::new(registry, transformers).text_from_snapshot(snapshot)
}

/// One entry of the ordered transformer list.
#[derive(Clone, Copy)]
enum Transformer<'a> {
    Block(&'a RegisteredBlock),
    Element(&'a dyn ElementTransformer),
}

/// Conversion entry points bound to a registry and generic transformers.
///
/// Cheap to copy; holds only shared references. Block definitions receive one
/// through their contexts to convert nested content.
#[derive(Clone, Copy)]
pub struct Converter<'a> {
    registry: &'a BlockRegistry,
    transformers: &'a [Box<dyn ElementTransformer>],
}

impl<'a> Converter<'a> {
    /// Create a converter.
    #[must_use]
    pub fn new(
        registry: &'a BlockRegistry,
        transformers: &'a [Box<dyn ElementTransformer>],
    ) -> Self {
        Self {
            registry,
            transformers,
        }
    }

    fn transformer_list(&self) -> Vec<Transformer<'a>> {
        self.registry
            .textual()
            .map(Transformer::Block)
            .chain(
                self.transformers
                    .iter()
                    .map(|t| Transformer::Element(t.as_ref())),
            )
            .collect()
    }

    /// Convert text to a document tree.
    ///
    /// Lines no transformer handles become paragraphs; consecutive lines merge
    /// into one paragraph and blank lines separate them.
    #[must_use]
    pub fn tree_from_text(&self, text: &str) -> DocumentTree {
        let transformers = self.transformer_list();
        let mut doc = TextDocument::new(text);
        let mut tree = DocumentTree::new();
        let mut paragraph: Vec<&str> = Vec::new();

        while let Some(line) = doc.current() {
            let cursor = doc.cursor();

            if let Some((node, next_line)) = self.import_at(&transformers, &doc, cursor) {
                flush_paragraph(&mut tree, &mut paragraph);
                tree.push(node);
                doc.seek(next_line);
                continue;
            }

            if line.trim().is_empty() {
                flush_paragraph(&mut tree, &mut paragraph);
            } else {
                paragraph.push(line);
            }
            doc.advance();
        }

        flush_paragraph(&mut tree, &mut paragraph);
        tree
    }

    /// Try each transformer at `line` in order.
    fn import_at(
        &self,
        transformers: &[Transformer<'_>],
        doc: &TextDocument<'_>,
        line: usize,
    ) -> Option<(Node, usize)> {
        let text = doc.line(line)?;

        transformers.iter().find_map(|transformer| match *transformer {
            Transformer::Block(entry) => import_block(entry, doc, line, *self)
                .map(|ImportedBlock { node, next_line }| (Node::Block(node), next_line)),
            Transformer::Element(element) => {
                element.import_line(text).map(|node| (node, line + 1))
            }
        })
    }

    /// Convert a document tree to text.
    ///
    /// Top-level nodes are separated by a blank line.
    #[must_use]
    pub fn text_from_tree(&self, tree: &DocumentTree) -> String {
        let transformers = self.transformer_list();
        tree.children
            .iter()
            .filter_map(|node| self.export_node(&transformers, node))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn export_node(&self, transformers: &[Transformer<'_>], node: &Node) -> Option<String> {
        let ctx = ExportContext { converter: *self };

        let exported = transformers.iter().find_map(|transformer| match (*transformer, node) {
            (Transformer::Block(entry), Node::Block(block)) => export_block(entry, block, &ctx),
            (Transformer::Block(_), _) => None,
            (Transformer::Element(element), _) => element.export(node),
        });

        match (exported, node) {
            (Some(text), _) => Some(text),
            (None, Node::Paragraph { text }) => Some(text.clone()),
            (None, Node::Block(block)) => {
                tracing::warn!(slug = %block.type_slug, "No transformer rendered block");
                None
            }
            (None, _) => {
                tracing::warn!(?node, "No transformer rendered node");
                None
            }
        }
    }

    /// Convert a stored JSON tree snapshot to text.
    ///
    /// A snapshot that cannot be read is logged and yields an empty string.
    #[must_use]
    pub fn text_from_snapshot(&self, snapshot: &str) -> String {
        self.try_text_from_snapshot(snapshot).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to parse document snapshot");
            String::new()
        })
    }

    /// Convert a stored JSON tree snapshot to text, reporting parse failures.
    pub fn try_text_from_snapshot(&self, snapshot: &str) -> Result<String, ConvertError> {
        let tree: DocumentTree = serde_json::from_str(snapshot)?;
        Ok(self.text_from_tree(&tree))
    }

    /// Convert a tree snapshot value (e.g. a nested field) to text.
    ///
    /// A snapshot that cannot be read is logged and yields an empty string.
    #[must_use]
    pub fn text_from_snapshot_value(&self, snapshot: &Value) -> String {
        match DocumentTree::deserialize(snapshot) {
            Ok(tree) => self.text_from_tree(&tree),
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse document snapshot");
                String::new()
            }
        }
    }

    /// Convert text to a tree snapshot value.
    #[must_use]
    pub fn snapshot_from_text(&self, text: &str) -> Value {
        let tree = self.tree_from_text(text);
        serde_json::to_value(&tree).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize document snapshot");
            Value::Null
        })
    }
}

fn flush_paragraph(tree: &mut DocumentTree, lines: &mut Vec<&str>) {
    if !lines.is_empty() {
        tree.push(Node::paragraph(lines.join("\n")));
        lines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarative::DeclarativeBlock;
    use crate::definition::{BlockDefinition, BlockExport, CustomDelimiters, EndTag, ImportContext};
    use crate::props::PropsMap;
    use crate::transformer::default_transformers;
    use crate::tree::{BlockNode, Fields};
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use serde_json::json;

    /// Stores its body as a nested tree snapshot.
    struct Frame;

    impl BlockDefinition for Frame {
        fn slug(&self) -> &str {
            "Frame"
        }

        fn export(&self, fields: &Fields, ctx: &ExportContext<'_>) -> BlockExport {
            let body = fields
                .get("body")
                .map(|snapshot| ctx.snapshot_to_text(snapshot))
                .unwrap_or_default();
            BlockExport::with_body(PropsMap::new(), body)
        }

        fn import(&self, content: &str, _props: PropsMap, ctx: &ImportContext<'_>) -> Option<Fields> {
            let mut fields = Fields::new();
            fields.insert("body".to_owned(), ctx.text_to_snapshot(content));
            Some(fields)
        }
    }

    fn registry() -> BlockRegistry {
        BlockRegistry::new()
            .with_block(DeclarativeBlock::new("Note").with_content_field("content"))
            .unwrap()
            .with_block(DeclarativeBlock::new("NoteTaking"))
            .unwrap()
            .with_block(
                DeclarativeBlock::new("Greeting")
                    .with_content_field("content")
                    .with_end_tag(EndTag::Optional),
            )
            .unwrap()
            .with_block(
                DeclarativeBlock::new("Code")
                    .with_content_field("code")
                    .with_capture_field("language")
                    .with_custom_delimiters(CustomDelimiters {
                        start: Regex::new(r"^```(\w*)").unwrap(),
                        end: Regex::new(r"^```\s*$").unwrap(),
                    })
                    .with_fence("```", "```"),
            )
            .unwrap()
            .with_block(DeclarativeBlock::new("Hidden").tree_only())
            .unwrap()
            .with_block(Frame)
            .unwrap()
    }

    fn block(slug: &str, value: Value) -> Node {
        let Value::Object(fields) = value else {
            panic!("expected object");
        };
        Node::Block(BlockNode::new(slug, fields))
    }

    #[test]
    fn test_round_trip_document() {
        let registry = registry();
        let transformers = default_transformers();
        let converter = Converter::new(&registry, &transformers);
        let text = "# Title\n\n<Note kind=\"tip\">\n  Hello\n</Note>\n\nSome text\nmore\n\n> quoted";

        let tree = converter.tree_from_text(text);
        assert_eq!(
            tree.children,
            vec![
                Node::Heading {
                    level: 1,
                    text: "Title".to_owned()
                },
                block("Note", json!({"kind": "tip", "content": "Hello"})),
                Node::paragraph("Some text\nmore"),
                Node::Quote {
                    text: "quoted".to_owned()
                },
            ]
        );
        assert_eq!(converter.text_from_tree(&tree), text);
    }

    #[test]
    fn test_self_closing_round_trip() {
        let registry = registry();
        let text = r#"<Note a="x" b="1 2"/>"#;

        let tree = tree_from_text(text, &registry, &[]);
        assert_eq!(tree.children, vec![block("Note", json!({"a": "x", "b": "1 2"}))]);
        assert_eq!(text_from_tree(&tree, &registry, &[]), text);
    }

    #[test]
    fn test_nested_same_name_balances() {
        let registry = registry();
        let tree = tree_from_text("<Note>\n<Note>\ninner\n</Note>\n</Note>\nafter", &registry, &[]);
        assert_eq!(
            tree.children,
            vec![
                block("Note", json!({"content": "<Note>\ninner\n</Note>"})),
                Node::paragraph("after"),
            ]
        );
    }

    #[test]
    fn test_tag_name_boundary() {
        let registry = registry();
        let tree = tree_from_text("<NoteTaking/>\n\n<Note>\n<NoteTaking/>\n</Note>", &registry, &[]);
        assert_eq!(
            tree.children,
            vec![
                block("NoteTaking", json!({})),
                block("Note", json!({"content": "<NoteTaking/>"})),
            ]
        );
    }

    #[test]
    fn test_optional_end_unterminated() {
        let registry = registry();
        let tree = tree_from_text("<Greeting attr=\"x\">\nhello", &registry, &[]);
        assert_eq!(
            tree.children,
            vec![block("Greeting", json!({"attr": "x"})), Node::paragraph("hello")]
        );
    }

    #[test]
    fn test_required_end_unterminated_falls_through() {
        let registry = registry();
        let tree = tree_from_text("<Note>\ntext", &registry, &[]);
        assert_eq!(tree.children, vec![Node::paragraph("<Note>\ntext")]);
    }

    #[test]
    fn test_props_round_trip_in_order() {
        let registry = registry();
        let text = r#"<Note z="last" a='single' n={42} flag=on/>"#;

        let tree = tree_from_text(text, &registry, &[]);
        assert_eq!(
            tree.children,
            vec![block(
                "Note",
                json!({"z": "last", "a": "single", "n": "42", "flag": "on"})
            )]
        );
        assert_eq!(
            text_from_tree(&tree, &registry, &[]),
            r#"<Note z="last" a="single" n="42" flag="on"/>"#
        );
    }

    #[test]
    fn test_multiline_attribute_round_trip() {
        let registry = registry();
        let tree = DocumentTree {
            children: vec![block(
                "Note",
                json!({"title": "line one\nline two", "path": "C:\\dir \"x\"", "content": "Body"}),
            )],
        };

        let text = text_from_tree(&tree, &registry, &[]);
        assert_eq!(
            text,
            "<Note title=\"line one\\nline two\" path=\"C:\\\\dir \\\"x\\\"\">\n  Body\n</Note>"
        );
        assert_eq!(tree_from_text(&text, &registry, &[]), tree);
    }

    #[test]
    fn test_unwritable_field_names_are_dropped_on_export() {
        let registry = registry();
        let tree = DocumentTree {
            children: vec![block("Note", json!({"my key": "x", "ok": "yes"}))],
        };

        let text = text_from_tree(&tree, &registry, &[]);
        assert_eq!(text, r#"<Note ok="yes"/>"#);
        assert_eq!(
            tree_from_text(&text, &registry, &[]).children,
            vec![block("Note", json!({"ok": "yes"}))]
        );
    }

    #[test]
    fn test_custom_delimiter_round_trip() {
        let registry = registry();
        let text = "```rust\nfn main() {}\n```\n\nafter";

        let tree = tree_from_text(text, &registry, &[]);
        assert_eq!(
            tree.children,
            vec![
                block("Code", json!({"language": "rust", "code": "fn main() {}"})),
                Node::paragraph("after"),
            ]
        );
        assert_eq!(text_from_tree(&tree, &registry, &[]), text);
    }

    #[test]
    fn test_tree_only_block_is_not_imported_or_exported() {
        let registry = registry();
        let tree = tree_from_text("<Hidden/>", &registry, &[]);
        assert_eq!(tree.children, vec![Node::paragraph("<Hidden/>")]);

        let tree = DocumentTree {
            children: vec![
                Node::paragraph("a"),
                block("Hidden", json!({})),
                block("Unknown", json!({})),
                Node::paragraph("b"),
            ],
        };
        assert_eq!(text_from_tree(&tree, &registry, &[]), "a\n\nb");
    }

    #[test]
    fn test_heading_without_transformers_is_paragraph() {
        let registry = registry();
        let tree = tree_from_text("# Title", &registry, &[]);
        assert_eq!(tree.children, vec![Node::paragraph("# Title")]);
    }

    #[test]
    fn test_nested_conversion_through_contexts() {
        let registry = registry();
        let transformers = default_transformers();
        let converter = Converter::new(&registry, &transformers);
        let text = "<Frame>\n  # Inner\n</Frame>";

        let tree = converter.tree_from_text(text);
        let frame = tree.blocks().next().unwrap();
        assert_eq!(
            frame.field("body"),
            Some(&json!({"children": [{"type": "heading", "level": 1, "text": "Inner"}]}))
        );
        assert_eq!(converter.text_from_tree(&tree), text);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let registry = registry();
        let snapshot = r#"{"children": [
            {"type": "block", "blockType": "Note", "fields": {"title": "Hi", "content": "Body"}},
            {"type": "paragraph", "text": "after"}
        ]}"#;

        assert_eq!(
            text_from_snapshot(snapshot, &registry, &[]),
            "<Note title=\"Hi\">\n  Body\n</Note>\n\nafter"
        );
    }

    #[test]
    fn test_invalid_snapshot() {
        let registry = registry();
        let converter = Converter::new(&registry, &[]);

        assert_eq!(converter.text_from_snapshot("{not json"), "");
        assert!(matches!(
            converter.try_text_from_snapshot("{not json"),
            Err(ConvertError::StateParse(_))
        ));
        assert_eq!(converter.text_from_snapshot_value(&json!([1, 2])), "");
    }

    #[test]
    fn test_empty_text() {
        let registry = registry();
        assert!(tree_from_text("", &registry, &[]).is_empty());
        assert_eq!(text_from_tree(&DocumentTree::new(), &registry, &[]), "");
    }

    #[test]
    fn test_concurrent_conversions_are_independent() {
        let registry = registry();
        let transformers = default_transformers();
        let converter = Converter::new(&registry, &transformers);
        let inputs: Vec<String> = (0..8)
            .map(|i| format!("<Note n=\"{i}\">\n  <Note>\n  body {i}\n  </Note>\n</Note>\n\ntext {i}"))
            .collect();

        let outputs: Vec<DocumentTree> = std::thread::scope(|scope| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|input| scope.spawn(move || converter.tree_from_text(input)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for (i, tree) in outputs.iter().enumerate() {
            assert_eq!(tree, &converter.tree_from_text(&inputs[i]));
            assert_eq!(tree.len(), 2);
            let note = tree.blocks().next().unwrap();
            assert_eq!(note.field_str("n"), Some(i.to_string().as_str()));
        }
    }
}
