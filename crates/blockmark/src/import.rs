//! Block import.
//!
//! Recognizes a block starting at a given line and builds its [`BlockNode`].
//! Two strategies:
//!
//! - **Tag syntax** (default): `<Slug attrs/>` or `<Slug attrs>` ... `</Slug>`,
//!   with same-name nesting balanced by [`scan_body`].
//! - **Custom delimiters**: the span from a line matching the start pattern to
//!   the next line matching the end pattern.
//!
//! A failed match consumes nothing: the caller falls through to the next
//! transformer or to default line handling.

use regex::Captures;

use crate::convert::Converter;
use crate::definition::{CustomDelimiters, EndTag, ImportContext};
use crate::pattern::find_tag_close;
use crate::props::PropsMap;
use crate::registry::RegisteredBlock;
use crate::scanner::{TextDocument, scan_body};
use crate::tree::BlockNode;

/// A recognized block.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ImportedBlock {
    pub node: BlockNode,
    /// Index of the first line after the block.
    pub next_line: usize,
}

/// Try to import the block registered as `entry` at `start_line`.
pub(crate) fn import_block(
    entry: &RegisteredBlock,
    doc: &TextDocument<'_>,
    start_line: usize,
    converter: Converter<'_>,
) -> Option<ImportedBlock> {
    match entry.definition.custom_delimiters() {
        Some(delimiters) => import_custom(entry, delimiters, doc, start_line, converter),
        None => import_tag(entry, doc, start_line, converter),
    }
}

/// A block span found in the text, before the definition is consulted.
struct MatchedSpan<'a> {
    content: String,
    props: PropsMap,
    end_line: usize,
    open_captures: Vec<Option<&'a str>>,
    close_captures: Option<Vec<Option<&'a str>>>,
}

fn import_tag(
    entry: &RegisteredBlock,
    doc: &TextDocument<'_>,
    start_line: usize,
    converter: Converter<'_>,
) -> Option<ImportedBlock> {
    let slug = entry.definition.slug();
    let line = doc.line(start_line)?;
    let open = entry.patterns.open_at_line_start(line)?;
    let after_name = &line[open.name_end..];

    let Some(close) = find_tag_close(after_name) else {
        tracing::debug!(slug, line = start_line, "Opening tag not closed on its line");
        return None;
    };

    let props_str = after_name[..close.props_end].trim();
    let open_captures = entry
        .patterns
        .start
        .captures(line)
        .map(|caps| captures_to_vec(&caps))
        .unwrap_or_default();

    let (content, end_line) = if close.self_closing || entry.definition.end_tag() == EndTag::Void
    {
        (String::new(), start_line)
    } else {
        match scan_body(doc, start_line, &after_name[close.after..], &entry.patterns) {
            Some(body) => (body.content, body.end_line),
            None if entry.definition.end_tag() == EndTag::Optional => (String::new(), start_line),
            None => {
                tracing::debug!(slug, line = start_line, "Unterminated block");
                return None;
            }
        }
    };

    build(
        entry,
        MatchedSpan {
            content,
            props: PropsMap::decode(props_str),
            end_line,
            open_captures,
            close_captures: None,
        },
        start_line,
        converter,
    )
}

fn import_custom(
    entry: &RegisteredBlock,
    delimiters: &CustomDelimiters,
    doc: &TextDocument<'_>,
    start_line: usize,
    converter: Converter<'_>,
) -> Option<ImportedBlock> {
    let slug = entry.definition.slug();
    let line = doc.line(start_line)?;
    let open = delimiters.start.captures(line)?;
    let open_captures = captures_to_vec(&open);
    let props_str = open.get(1).map_or("", |m| m.as_str().trim());

    let end_tag = entry.definition.end_tag();
    let close = (end_tag != EndTag::Void)
        .then(|| find_custom_close(delimiters, doc, start_line))
        .flatten();

    let span = match close {
        Some((end_line, close_captures)) => MatchedSpan {
            content: doc.lines(start_line + 1, end_line).join("\n").trim().to_owned(),
            props: PropsMap::decode(props_str),
            end_line,
            open_captures,
            close_captures: Some(close_captures),
        },
        None if end_tag != EndTag::Required => MatchedSpan {
            content: String::new(),
            props: PropsMap::decode(props_str),
            end_line: start_line,
            open_captures,
            close_captures: None,
        },
        None => {
            tracing::debug!(slug, line = start_line, "Unterminated custom block");
            return None;
        }
    };

    build(entry, span, start_line, converter)
}

/// First line after `start_line` matching the end pattern, with its captures.
fn find_custom_close<'a>(
    delimiters: &CustomDelimiters,
    doc: &TextDocument<'a>,
    start_line: usize,
) -> Option<(usize, Vec<Option<&'a str>>)> {
    (start_line + 1..doc.len()).find_map(|index| {
        let close_line = doc.line(index)?;
        delimiters
            .end
            .captures(close_line)
            .map(|caps| (index, captures_to_vec(&caps)))
    })
}

/// Ask the definition for fields and build the node.
fn build(
    entry: &RegisteredBlock,
    span: MatchedSpan<'_>,
    start_line: usize,
    converter: Converter<'_>,
) -> Option<ImportedBlock> {
    let definition = entry.definition.as_ref();
    let ctx = ImportContext {
        line: start_line,
        open_captures: span.open_captures,
        close_captures: span.close_captures,
        converter,
    };

    let Some(fields) = definition.import(&span.content, span.props, &ctx) else {
        tracing::debug!(slug = definition.slug(), line = start_line, "Block import rejected");
        return None;
    };

    Some(ImportedBlock {
        node: BlockNode::new(definition.slug(), fields),
        next_line: span.end_line + 1,
    })
}

fn captures_to_vec<'a>(caps: &Captures<'a>) -> Vec<Option<&'a str>> {
    caps.iter().map(|m| m.map(|m| m.as_str())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declarative::DeclarativeBlock;
    use crate::definition::{BlockDefinition, BlockExport, ExportContext};
    use crate::registry::BlockRegistry;
    use crate::tree::Fields;
    use regex::Regex;
    use serde_json::Value;

    /// Records what it was given; rejects when `reject` is set.
    struct Recorder {
        reject: bool,
    }

    impl BlockDefinition for Recorder {
        fn slug(&self) -> &str {
            "Sample"
        }

        fn export(&self, _fields: &Fields, _ctx: &ExportContext<'_>) -> BlockExport {
            BlockExport::Reject
        }

        fn import(
            &self,
            content: &str,
            props: PropsMap,
            ctx: &ImportContext<'_>,
        ) -> Option<Fields> {
            if self.reject {
                return None;
            }
            let mut fields = Fields::new();
            fields.insert("content".to_owned(), Value::from(content));
            fields.insert("props".to_owned(), Value::from(props.encode()));
            fields.insert("line".to_owned(), Value::from(ctx.line));
            Some(fields)
        }
    }

    /// Custom-delimited block recording its open and close captures.
    struct Fence {
        delimiters: CustomDelimiters,
        end_tag: EndTag,
    }

    impl Fence {
        fn new(end_tag: EndTag) -> Self {
            Self {
                delimiters: CustomDelimiters {
                    start: Regex::new(r"^<<<\s*(\w*)").unwrap(),
                    end: Regex::new(r"^>>>\s*(\w*)$").unwrap(),
                },
                end_tag,
            }
        }
    }

    impl BlockDefinition for Fence {
        fn slug(&self) -> &str {
            "Fence"
        }

        fn end_tag(&self) -> EndTag {
            self.end_tag
        }

        fn custom_delimiters(&self) -> Option<&CustomDelimiters> {
            Some(&self.delimiters)
        }

        fn export(&self, _fields: &Fields, _ctx: &ExportContext<'_>) -> BlockExport {
            BlockExport::Reject
        }

        fn import(
            &self,
            content: &str,
            _props: PropsMap,
            ctx: &ImportContext<'_>,
        ) -> Option<Fields> {
            let close = ctx
                .close_captures
                .as_ref()
                .and_then(|caps| caps.get(1).copied().flatten());
            let mut fields = Fields::new();
            fields.insert("content".to_owned(), Value::from(content));
            fields.insert("open".to_owned(), Value::from(ctx.capture(1)));
            fields.insert("close".to_owned(), Value::from(close));
            Some(fields)
        }
    }

    fn fence_registry(end_tag: EndTag) -> BlockRegistry {
        BlockRegistry::new().with_block(Fence::new(end_tag)).unwrap()
    }

    fn run(registry: &BlockRegistry, text: &str, start: usize) -> Option<ImportedBlock> {
        let doc = TextDocument::new(text);
        let entry = registry.textual().next().unwrap();
        import_block(entry, &doc, start, Converter::new(registry, &[]))
    }

    fn recorder_registry() -> BlockRegistry {
        BlockRegistry::new()
            .with_block(Recorder { reject: false })
            .unwrap()
    }

    #[test]
    fn test_self_closing_consumes_one_line() {
        let registry = recorder_registry();
        let imported = run(&registry, "<Sample a=\"1\"/>\nnext", 0).unwrap();
        assert_eq!(imported.next_line, 1);
        assert_eq!(imported.node.field_str("content"), Some(""));
        assert_eq!(imported.node.field_str("props"), Some(r#"a="1""#));
    }

    #[test]
    fn test_paired_block() {
        let registry = recorder_registry();
        let imported = run(&registry, "x\n<Sample b=\"2\">\n  body\n</Sample>\ny", 1).unwrap();
        assert_eq!(imported.next_line, 4);
        assert_eq!(imported.node.type_slug, "Sample");
        assert_eq!(imported.node.field_str("content"), Some("body"));
        assert_eq!(imported.node.field("line"), Some(&Value::from(1)));
    }

    #[test]
    fn test_lowercase_tag_uses_registered_slug() {
        let registry = recorder_registry();
        let imported = run(&registry, "<sample/>", 0).unwrap();
        assert_eq!(imported.node.type_slug, "Sample");
    }

    #[test]
    fn test_required_end_missing() {
        let registry = recorder_registry();
        assert!(run(&registry, "<Sample>\ntext", 0).is_none());
    }

    #[test]
    fn test_optional_end_missing() {
        let registry = BlockRegistry::new()
            .with_block(
                DeclarativeBlock::new("Greeting")
                    .with_content_field("content")
                    .with_end_tag(EndTag::Optional),
            )
            .unwrap();
        let imported = run(&registry, "<Greeting attr=\"x\">\nhello", 0).unwrap();
        assert_eq!(imported.next_line, 1);
        assert_eq!(imported.node.field_str("attr"), Some("x"));
        assert_eq!(imported.node.field("content"), None);
    }

    #[test]
    fn test_void_block_never_scans() {
        let registry = BlockRegistry::new()
            .with_block(DeclarativeBlock::new("Break").with_end_tag(EndTag::Void))
            .unwrap();
        let imported = run(&registry, "<Break>\n</Break>", 0).unwrap();
        assert_eq!(imported.next_line, 1);
    }

    #[test]
    fn test_rejected_import() {
        let registry = BlockRegistry::new()
            .with_block(Recorder { reject: true })
            .unwrap();
        assert!(run(&registry, "<Sample/>", 0).is_none());
    }

    #[test]
    fn test_tag_must_start_line() {
        let registry = recorder_registry();
        assert!(run(&registry, "see <Sample/>", 0).is_none());
        assert!(run(&registry, "  <Sample/>", 0).is_some());
    }

    #[test]
    fn test_opening_tag_without_bracket() {
        let registry = recorder_registry();
        assert!(run(&registry, "<Sample a=\"1\"\n/>", 0).is_none());
    }

    #[test]
    fn test_custom_delimiters() {
        let block = DeclarativeBlock::new("Code")
            .with_content_field("code")
            .with_custom_delimiters(CustomDelimiters {
                start: Regex::new(r"^```(\w*)").unwrap(),
                end: Regex::new(r"^```\s*$").unwrap(),
            })
            .with_capture_field("language");
        let registry = BlockRegistry::new().with_block(block).unwrap();

        let imported = run(&registry, "```rust\nfn main() {}\n\n```\nafter", 0).unwrap();
        assert_eq!(imported.next_line, 4);
        assert_eq!(imported.node.field_str("language"), Some("rust"));
        assert_eq!(imported.node.field_str("code"), Some("fn main() {}"));
    }

    #[test]
    fn test_custom_delimiters_unterminated() {
        let block = DeclarativeBlock::new("Code").with_custom_delimiters(CustomDelimiters {
            start: Regex::new(r"^```(\w*)").unwrap(),
            end: Regex::new(r"^```\s*$").unwrap(),
        });
        let registry = BlockRegistry::new().with_block(block).unwrap();
        assert!(run(&registry, "```rust\nfn main() {}", 0).is_none());
    }

    #[test]
    fn test_custom_close_captures() {
        let registry = fence_registry(EndTag::Required);
        let imported = run(&registry, "<<< alpha\nbody\n>>> omega\nafter", 0).unwrap();
        assert_eq!(imported.next_line, 3);
        assert_eq!(imported.node.field_str("content"), Some("body"));
        assert_eq!(imported.node.field_str("open"), Some("alpha"));
        assert_eq!(imported.node.field_str("close"), Some("omega"));
    }

    #[test]
    fn test_custom_optional_unterminated() {
        let registry = fence_registry(EndTag::Optional);
        let imported = run(&registry, "<<< alpha\nbody", 0).unwrap();
        assert_eq!(imported.next_line, 1);
        assert_eq!(imported.node.field_str("content"), Some(""));
        assert_eq!(imported.node.field_str("open"), Some("alpha"));
        assert_eq!(imported.node.field("close"), Some(&Value::Null));
    }

    #[test]
    fn test_custom_void_resolves_on_open_line() {
        let registry = fence_registry(EndTag::Void);
        let imported = run(&registry, "<<< alpha\nbody\n>>> omega", 0).unwrap();
        assert_eq!(imported.next_line, 1);
        assert_eq!(imported.node.field_str("content"), Some(""));
        assert_eq!(imported.node.field("close"), Some(&Value::Null));
    }
}
