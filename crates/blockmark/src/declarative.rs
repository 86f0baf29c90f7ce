//! Declarative block definitions.
//!
//! A [`DeclarativeBlock`] maps string fields to tag attributes and one
//! optional field to the tag body, so its import and export are inverses for
//! blocks whose fields are strings.

use serde_json::Value;

use crate::definition::{
    BlockDefinition, BlockExport, CustomDelimiters, EndTag, ExportContext, ImportContext,
};
use crate::props::{PropsMap, is_attribute_name};
use crate::tree::Fields;

/// Block definition driven by configuration rather than code.
///
/// # Example
///
/// ```
/// use blockmark::{BlockRegistry, DeclarativeBlock, tree_from_text};
///
/// let registry = BlockRegistry::new()
///     .with_block(DeclarativeBlock::new("Note").with_content_field("body"))
///     .unwrap();
///
/// let tree = tree_from_text("<Note kind=\"tip\">\n  Hello\n</Note>", &registry, &[]);
/// let note = tree.blocks().next().unwrap();
/// assert_eq!(note.field_str("kind"), Some("tip"));
/// assert_eq!(note.field_str("body"), Some("Hello"));
/// ```
#[derive(Debug, Clone)]
pub struct DeclarativeBlock {
    slug: String,
    content_field: Option<String>,
    capture_field: Option<String>,
    end_tag: EndTag,
    text_form: bool,
    custom: Option<CustomDelimiters>,
    fence: Option<(String, String)>,
}

impl DeclarativeBlock {
    /// Create a block with tag syntax and no body field.
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            content_field: None,
            capture_field: None,
            end_tag: EndTag::Required,
            text_form: true,
            custom: None,
            fence: None,
        }
    }

    /// Store the tag body in `field`.
    #[must_use]
    pub fn with_content_field(mut self, field: impl Into<String>) -> Self {
        self.content_field = Some(field.into());
        self
    }

    /// Set the closing tag rule.
    #[must_use]
    pub fn with_end_tag(mut self, end_tag: EndTag) -> Self {
        self.end_tag = end_tag;
        self
    }

    /// Mark as tree-only (no textual form).
    #[must_use]
    pub fn tree_only(mut self) -> Self {
        self.text_form = false;
        self
    }

    /// Use custom delimiters instead of the tag syntax.
    #[must_use]
    pub fn with_custom_delimiters(mut self, delimiters: CustomDelimiters) -> Self {
        self.custom = Some(delimiters);
        self
    }

    /// Store capture group 1 of the custom open line in `field`.
    #[must_use]
    pub fn with_capture_field(mut self, field: impl Into<String>) -> Self {
        self.capture_field = Some(field.into());
        self
    }

    /// Literal open and close lines used when exporting a custom-delimited
    /// block, e.g. ```` ``` ```` and ```` ``` ````.
    ///
    /// The capture field value is appended to the open line.
    #[must_use]
    pub fn with_fence(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.fence = Some((open.into(), close.into()));
        self
    }

    fn is_attribute(&self, name: &str) -> bool {
        self.content_field.as_deref() != Some(name) && self.capture_field.as_deref() != Some(name)
    }

    fn export_fenced(&self, fields: &Fields, open: &str, close: &str) -> String {
        let capture = field_text(fields, self.capture_field.as_deref()).unwrap_or_default();
        let body = field_text(fields, self.content_field.as_deref()).unwrap_or_default();
        format!("{open}{capture}\n{body}\n{close}")
    }
}

impl BlockDefinition for DeclarativeBlock {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn has_text_form(&self) -> bool {
        self.text_form
    }

    fn end_tag(&self) -> EndTag {
        self.end_tag
    }

    fn custom_delimiters(&self) -> Option<&CustomDelimiters> {
        self.custom.as_ref()
    }

    fn export(&self, fields: &Fields, _ctx: &ExportContext<'_>) -> BlockExport {
        if self.custom.is_some() {
            return match &self.fence {
                Some((open, close)) => {
                    BlockExport::literal(self.export_fenced(fields, open, close))
                }
                None => BlockExport::Reject,
            };
        }

        let mut attributes = PropsMap::new();
        for (name, value) in fields.iter().filter(|(name, _)| self.is_attribute(name)) {
            if !is_attribute_name(name) {
                tracing::debug!(
                    slug = %self.slug,
                    field = %name,
                    "Field name is not a valid attribute name"
                );
                continue;
            }
            match value {
                Value::String(s) => attributes.insert(name.as_str(), s.as_str()),
                Value::Number(n) => attributes.insert(name.as_str(), n.to_string()),
                Value::Bool(b) => attributes.insert(name.as_str(), b.to_string()),
                Value::Null | Value::Array(_) | Value::Object(_) => {
                    tracing::debug!(
                        slug = %self.slug,
                        field = %name,
                        "Field has no attribute form"
                    );
                }
            }
        }

        match field_text(fields, self.content_field.as_deref()) {
            Some(body) if self.end_tag != EndTag::Void => BlockExport::with_body(attributes, body),
            _ => BlockExport::self_closing(attributes),
        }
    }

    fn import(&self, content: &str, props: PropsMap, ctx: &ImportContext<'_>) -> Option<Fields> {
        let mut fields = Fields::new();

        for (name, value) in props {
            if self.is_attribute(&name) {
                fields.insert(name, Value::String(value));
            }
        }

        if let Some(field) = &self.capture_field
            && let Some(capture) = ctx.capture(1).map(str::trim).filter(|c| !c.is_empty())
        {
            fields.insert(field.clone(), Value::from(capture));
        }

        if let Some(field) = &self.content_field
            && !content.is_empty()
        {
            fields.insert(field.clone(), Value::from(content));
        }

        Some(fields)
    }
}

fn field_text<'a>(fields: &'a Fields, name: Option<&str>) -> Option<&'a str> {
    name.and_then(|n| fields.get(n)).and_then(Value::as_str)
}
