//! Pipeline configuration and the persisted stage definition.
//!
//! A pipeline is described either directly by a [`PipelineConfig`] or by a
//! JSON [`PreTokenizerDefinition`], the `pre_tokenizer` section of a
//! `tokenizer.json`:
//!
//! ```json
//! {
//!   "type": "Sequence",
//!   "pretokenizers": [
//!     { "type": "CodeLexer", "languages": ["python", "py"] },
//!     { "type": "ByteLevel", "add_prefix_space": false, "trim_offsets": true, "use_regex": false }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::error::PipelineError;

/// Fence tags lexed when a definition does not list any.
pub const DEFAULT_LANGUAGES: [&str; 2] = ["python", "py"];

/// Errors while loading a pipeline definition.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Tokenizer definition has no pre_tokenizer")]
    MissingPreTokenizer,
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

/// Options shared read-only by every stage of one pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fence tags that get a language lexer. Matched case-insensitively.
    pub languages: Vec<String>,
    pub add_prefix_space: bool,
    pub trim_offsets: bool,
    pub use_regex: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            add_prefix_space: false,
            trim_offsets: true,
            use_regex: true,
        }
    }
}

impl PipelineConfig {
    pub fn new<I, S>(languages: I, add_prefix_space: bool, trim_offsets: bool, use_regex: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
            add_prefix_space,
            trim_offsets,
            use_regex,
        }
    }

    /// Reject configs no pipeline can be built from.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(PipelineError::InvalidOffsetConfig(
                "language identifiers must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Flatten a definition into one config.
    ///
    /// Languages are the union of every `CodeLexer` entry; byte-level flags
    /// come from the last `ByteLevel` entry. A definition without a
    /// `ByteLevel` entry keeps the defaults of [`PipelineConfig::default`].
    pub fn from_definition(definition: &PreTokenizerDefinition) -> Self {
        let mut config = Self {
            languages: Vec::new(),
            ..Self::default()
        };
        config.absorb(definition);
        config
    }

    fn absorb(&mut self, definition: &PreTokenizerDefinition) {
        match definition {
            PreTokenizerDefinition::CodeLexer { languages } => {
                for language in languages {
                    if !self.languages.contains(language) {
                        self.languages.push(language.clone());
                    }
                }
            }
            PreTokenizerDefinition::ByteLevel {
                add_prefix_space,
                trim_offsets,
                use_regex,
            } => {
                self.add_prefix_space = *add_prefix_space;
                self.trim_offsets = *trim_offsets;
                self.use_regex = *use_regex;
            }
            PreTokenizerDefinition::Sequence { pretokenizers } => {
                for inner in pretokenizers {
                    self.absorb(inner);
                }
            }
        }
    }

    /// The default two-stage definition for this config.
    pub fn to_definition(&self) -> PreTokenizerDefinition {
        PreTokenizerDefinition::Sequence {
            pretokenizers: vec![
                PreTokenizerDefinition::CodeLexer {
                    languages: self.languages.clone(),
                },
                PreTokenizerDefinition::ByteLevel {
                    add_prefix_space: self.add_prefix_space,
                    trim_offsets: self.trim_offsets,
                    use_regex: self.use_regex,
                },
            ],
        }
    }
}

/// Persisted stage sequence. Field defaults follow the `tokenizers` JSON
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PreTokenizerDefinition {
    CodeLexer {
        #[serde(default = "default_languages")]
        languages: Vec<String>,
    },
    ByteLevel {
        #[serde(default = "default_true")]
        add_prefix_space: bool,
        #[serde(default = "default_true")]
        trim_offsets: bool,
        #[serde(default = "default_true")]
        use_regex: bool,
    },
    Sequence {
        pretokenizers: Vec<PreTokenizerDefinition>,
    },
}

impl PreTokenizerDefinition {
    /// Parse a definition, or a whole `tokenizer.json` carrying one under
    /// `pre_tokenizer`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn from_value(mut value: Value) -> Result<Self, ConfigError> {
        if value.get("type").is_none() {
            if let Some(section) = value.get_mut("pre_tokenizer") {
                if section.is_null() {
                    return Err(ConfigError::MissingPreTokenizer);
                }
                return Ok(serde_json::from_value(section.take())?);
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn default_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}
