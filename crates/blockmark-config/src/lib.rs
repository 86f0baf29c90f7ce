//! Block type configuration for blockmark.
//!
//! Parses `blockmark.toml` files with serde and builds the [`BlockRegistry`]
//! of declarative block definitions they describe. Config files are
//! auto-discovered in the current directory and its parents.
//!
//! ```toml
//! [[blocks]]
//! slug = "Note"
//! content_field = "content"
//!
//! [[blocks]]
//! slug = "Code"
//! content_field = "code"
//! start_pattern = '^```(\w*)'
//! end_pattern = '^```\s*$'
//! capture_field = "language"
//! fence_open = "```"
//! fence_close = "```"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use blockmark::{BlockRegistry, CustomDelimiters, DeclarativeBlock, EndTag, RegistryError};
use regex::Regex;
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "blockmark.toml";

/// Block configuration file contents.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Block types in registration order.
    pub blocks: Vec<BlockConfig>,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// One `[[blocks]]` entry.
#[derive(Debug, Deserialize)]
pub struct BlockConfig {
    /// Block type slug, unique case-insensitively.
    pub slug: String,
    /// Field receiving the inner text.
    #[serde(default)]
    pub content_field: Option<String>,
    /// Closing tag rule.
    #[serde(default)]
    pub end: EndRule,
    /// Whether the block has a textual form (`false` = tree-only).
    #[serde(default = "default_text")]
    pub text: bool,
    /// Custom start line pattern.
    #[serde(default)]
    pub start_pattern: Option<String>,
    /// Custom end line pattern.
    #[serde(default)]
    pub end_pattern: Option<String>,
    /// Field receiving capture group 1 of the custom start line.
    #[serde(default)]
    pub capture_field: Option<String>,
    /// Literal start delimiter for exporting custom blocks.
    #[serde(default)]
    pub fence_open: Option<String>,
    /// Literal end delimiter for exporting custom blocks.
    #[serde(default)]
    pub fence_close: Option<String>,
}

fn default_text() -> bool {
    true
}

/// Closing tag rule as written in the config file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndRule {
    /// A missing close tag leaves the block unhandled.
    #[default]
    Required,
    /// A missing close tag yields an empty body.
    Optional,
    /// Never has a body.
    Void,
}

impl From<EndRule> for EndTag {
    fn from(rule: EndRule) -> Self {
        match rule {
            EndRule::Required => Self::Required,
            EndRule::Optional => Self::Optional,
            EndRule::Void => Self::Void,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// A custom delimiter pattern failed to compile.
    #[error("Invalid pattern in {field}: {source}")]
    Pattern {
        /// Config field path (e.g., "`blocks[1].start_pattern`").
        field: String,
        /// Regex compile error.
        #[source]
        source: regex::Error,
    },
    /// The registry rejected a definition.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require two optional fields to be set together.
fn require_pair<T>(a: Option<&T>, b: Option<&T>, what: &str) -> Result<(), ConfigError> {
    if a.is_some() != b.is_some() {
        return Err(ConfigError::Validation(format!("{what} must be set together")));
    }
    Ok(())
}

fn compile(pattern: &str, field: String) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern { field, source })
}

impl BlockConfig {
    fn is_custom(&self) -> bool {
        self.start_pattern.is_some()
    }

    /// Validate this entry; `index` is its position in the file.
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let prefix = format!("blocks[{index}]");

        require_non_empty(&self.slug, &format!("{prefix}.slug"))?;
        require_pair(
            self.start_pattern.as_ref(),
            self.end_pattern.as_ref(),
            &format!("{prefix}.start_pattern and {prefix}.end_pattern"),
        )?;
        require_pair(
            self.fence_open.as_ref(),
            self.fence_close.as_ref(),
            &format!("{prefix}.fence_open and {prefix}.fence_close"),
        )?;

        if !self.is_custom() {
            if self.capture_field.is_some() {
                return Err(ConfigError::Validation(format!(
                    "{prefix}.capture_field requires custom patterns"
                )));
            }
            if self.fence_open.is_some() {
                return Err(ConfigError::Validation(format!(
                    "{prefix}.fence_open requires custom patterns"
                )));
            }
        }

        self.delimiters(index)?;
        Ok(())
    }

    fn delimiters(&self, index: usize) -> Result<Option<CustomDelimiters>, ConfigError> {
        match (&self.start_pattern, &self.end_pattern) {
            (Some(start), Some(end)) => Ok(Some(CustomDelimiters {
                start: compile(start, format!("blocks[{index}].start_pattern"))?,
                end: compile(end, format!("blocks[{index}].end_pattern"))?,
            })),
            _ => Ok(None),
        }
    }

    /// Build the declarative definition for this entry.
    fn to_definition(&self, index: usize) -> Result<DeclarativeBlock, ConfigError> {
        let mut block = DeclarativeBlock::new(self.slug.trim()).with_end_tag(self.end.into());

        if let Some(field) = &self.content_field {
            block = block.with_content_field(field);
        }
        if !self.text {
            block = block.tree_only();
        }
        if let Some(delimiters) = self.delimiters(index)? {
            block = block.with_custom_delimiters(delimiters);
        }
        if let Some(field) = &self.capture_field {
            block = block.with_capture_field(field);
        }
        if let (Some(open), Some(close)) = (&self.fence_open, &self.fence_close) {
            block = block.with_fence(open, close);
        }

        Ok(block)
    }
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `blockmark.toml` in current directory and
    /// parents, falling back to an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, or if reading,
    /// parsing or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        let discovered = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd));
        match discovered {
            Some(path) => Self::load_from_file(&path),
            None => {
                tracing::debug!("No {CONFIG_FILENAME} found, using empty configuration");
                Ok(Self::default())
            }
        }
    }

    /// Search for the config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.validate()?;
        config.config_path = Some(path.to_path_buf());

        tracing::info!(
            path = %path.display(),
            blocks = config.blocks.len(),
            "Loaded block configuration"
        );

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` or `ConfigError::Pattern` if any
    /// entry is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();

        for (index, block) in self.blocks.iter().enumerate() {
            block.validate(index)?;
            if !seen.insert(block.slug.trim().to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "blocks[{index}].slug: duplicate block slug '{}'",
                    block.slug
                )));
            }
        }

        Ok(())
    }

    /// Build the block registry, preserving file order.
    ///
    /// # Errors
    ///
    /// Returns error if an entry is invalid or the registry rejects it.
    pub fn build_registry(&self) -> Result<BlockRegistry, ConfigError> {
        self.validate()?;

        let mut registry = BlockRegistry::new();
        for (index, block) in self.blocks.iter().enumerate() {
            registry.register(block.to_definition(index)?)?;
        }

        tracing::debug!(slugs = ?registry.slugs(), "Built block registry");
        Ok(registry)
    }
}
