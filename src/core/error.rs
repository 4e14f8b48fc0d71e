use thiserror::Error;

use super::span::TilingFault;

/// Errors that abort a pipeline pass or construction.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Stage '{stage}' did not tile its input ({fault}); expected offset {expected}, found {found}")]
    TilingViolation {
        stage: &'static str,
        expected: usize,
        found: usize,
        fault: TilingFault,
    },
    #[error("Invalid offset configuration: {0}")]
    InvalidOffsetConfig(String),
    #[error("Regex compilation error: {0}")]
    Regex(#[from] Box<fancy_regex::Error>),
    #[error("Fence matcher build error: {0}")]
    FenceMatcher(#[from] aho_corasick::BuildError),
}

impl PipelineError {
    pub(crate) fn tiling(stage: &'static str, fault: TilingFault) -> Self {
        let (expected, found) = fault.positions();
        PipelineError::TilingViolation {
            stage,
            expected,
            found,
            fault,
        }
    }
}

impl From<fancy_regex::Error> for PipelineError {
    fn from(err: fancy_regex::Error) -> Self {
        PipelineError::Regex(Box::new(err))
    }
}

/// Recoverable conditions. These are logged where they occur and resolved
/// with a fixed default; they never reach the caller of `run`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    #[error("no lexer for language '{language}', splitting block at {offset} as text")]
    UnrecognizedLanguage { language: String, offset: usize },
    #[error("fence at {offset} is never closed, treating it as text")]
    UnterminatedFence { offset: usize },
    #[error("language '{0}' is configured but has no lexer implementation")]
    UnimplementedLanguage(String),
}
