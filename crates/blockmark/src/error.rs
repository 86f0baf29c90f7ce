//! Error types.
//!
//! Unterminated blocks and rejected imports are not errors: the scanner
//! reports them as "not handled" and the line falls through to default
//! handling.

/// Error building a [`BlockRegistry`](crate::BlockRegistry).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A block definition has an empty slug.
    #[error("Block slug cannot be empty")]
    EmptySlug,
    /// Two definitions share a slug (compared case-insensitively).
    #[error("Duplicate block slug: {0}")]
    DuplicateSlug(String),
}

/// Error converting between text and tree.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A stored tree snapshot could not be read.
    #[error("Failed to read document snapshot: {0}")]
    StateParse(#[from] serde_json::Error),
}
