//! Block registry.
//!
//! Holds the block definitions participating in conversion, in registration
//! order, each with its compiled tag patterns.

use crate::definition::BlockDefinition;
use crate::error::RegistryError;
use crate::pattern::TagPatterns;

/// A registered definition with its compiled patterns.
pub(crate) struct RegisteredBlock {
    pub(crate) definition: Box<dyn BlockDefinition>,
    pub(crate) patterns: TagPatterns,
    /// Lowercased slug for case-insensitive dispatch.
    key: String,
}

impl RegisteredBlock {
    /// Whether a node's type slug selects this block.
    pub(crate) fn matches_slug(&self, slug: &str) -> bool {
        slug.to_lowercase() == self.key
    }
}

/// Ordered registry of block definitions.
///
/// Built once and then shared read-only by all conversions.
///
/// # Example
///
/// ```
/// use blockmark::{BlockRegistry, DeclarativeBlock};
///
/// let mut registry = BlockRegistry::new();
/// registry.register(DeclarativeBlock::new("Note").with_content_field("content")).unwrap();
///
/// assert!(registry.has("note"));
/// assert!(registry.register(DeclarativeBlock::new("NOTE")).is_err());
/// ```
#[derive(Default)]
pub struct BlockRegistry {
    blocks: Vec<RegisteredBlock>,
}

impl BlockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block definition.
    ///
    /// Slugs must be non-empty and unique (case-insensitive).
    pub fn register<D: BlockDefinition + 'static>(
        &mut self,
        definition: D,
    ) -> Result<(), RegistryError> {
        self.register_boxed(Box::new(definition))
    }

    /// Register a boxed block definition.
    pub fn register_boxed(
        &mut self,
        definition: Box<dyn BlockDefinition>,
    ) -> Result<(), RegistryError> {
        let slug = definition.slug();
        if slug.is_empty() {
            return Err(RegistryError::EmptySlug);
        }
        if self.has(slug) {
            return Err(RegistryError::DuplicateSlug(slug.to_owned()));
        }

        let patterns = TagPatterns::for_tag(slug);
        let key = slug.to_lowercase();
        self.blocks.push(RegisteredBlock {
            definition,
            patterns,
            key,
        });
        Ok(())
    }

    /// Register a block definition, builder style.
    pub fn with_block<D: BlockDefinition + 'static>(
        mut self,
        definition: D,
    ) -> Result<Self, RegistryError> {
        self.register(definition)?;
        Ok(self)
    }

    /// Get a definition by slug (case-insensitive).
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<&dyn BlockDefinition> {
        self.find(slug).map(|entry| entry.definition.as_ref())
    }

    /// Check if a slug is registered (case-insensitive).
    #[must_use]
    pub fn has(&self, slug: &str) -> bool {
        self.find(slug).is_some()
    }

    /// Registered slugs in registration order.
    #[must_use]
    pub fn slugs(&self) -> Vec<&str> {
        self.blocks.iter().map(|b| b.definition.slug()).collect()
    }

    /// Number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub(crate) fn find(&self, slug: &str) -> Option<&RegisteredBlock> {
        self.blocks.iter().find(|b| b.matches_slug(slug))
    }

    /// Definitions with a textual form, in registration order.
    pub(crate) fn textual(&self) -> impl Iterator<Item = &RegisteredBlock> {
        self.blocks.iter().filter(|b| b.definition.has_text_form())
    }
}
