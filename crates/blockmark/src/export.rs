//! Block export.
//!
//! Renders a [`BlockNode`] through its registered definition:
//!
//! - self-closing: `<Slug attrs/>`
//! - with body: `<Slug attrs>\n  body\n</Slug>`

use crate::definition::{BlockExport, ExportContext};
use crate::props::PropsMap;
use crate::registry::RegisteredBlock;
use crate::tree::BlockNode;

/// Render a block node with the definition registered for its slug.
///
/// Returns `None` if `entry` is not this node's type or its definition
/// rejects the node, so the next transformer can be tried.
pub(crate) fn export_block(
    entry: &RegisteredBlock,
    node: &BlockNode,
    ctx: &ExportContext<'_>,
) -> Option<String> {
    if !entry.matches_slug(&node.type_slug) {
        return None;
    }

    match entry.definition.export(&node.fields, ctx) {
        BlockExport::Reject => {
            tracing::debug!(slug = %node.type_slug, "Block export rejected");
            None
        }
        BlockExport::Literal(text) => Some(text),
        BlockExport::Tag {
            attributes,
            inner_text,
        } => Some(render_tag(&node.type_slug, &attributes, inner_text.as_deref())),
    }
}

/// Render a block tag.
///
/// An empty body renders the self-closing form.
#[must_use]
pub fn render_tag(slug: &str, attributes: &PropsMap, inner_text: Option<&str>) -> String {
    let attrs = attributes.encode();
    let open = if attrs.is_empty() {
        format!("<{slug}")
    } else {
        format!("<{slug} {attrs}")
    };

    match inner_text {
        Some(inner) if !inner.is_empty() => format!("{open}>\n  {inner}\n</{slug}>"),
        _ => format!("{open}/>"),
    }
}
