//! Core pre-tokenization engine for fencelex.
//!
//! # Architecture
//!
//! Leaves first:
//!
//! - [`span`]: byte-offset [`Span`]s, [`translate`] and the tiling check
//! - [`fence`]: [`BlockDetector`], which splits text into prose and fenced code
//! - [`lexer`]: the [`LanguageLexer`] trait, its shared longest-match driver
//!   and the Python and Rust variants
//! - [`splitter`]: [`ByteLevelSplitter`] for prose and unlexed code
//! - [`pipeline`]: [`PreTokenizerPipeline`], an immutable fold over stages
//! - [`config`]: [`PipelineConfig`] and the JSON stage definition
//! - [`encoder`] and [`vocab`]: the boundary to a vocabulary model
//! - [`byte_level`]: the GPT-2 byte to printable character table

pub mod byte_level;
pub mod config;
pub mod encoder;
pub mod error;
pub mod fence;
pub mod lexer;
pub mod pipeline;
pub mod span;
pub mod splitter;
pub mod vocab;

pub use byte_level::{byte_level_decode, byte_level_encode};
pub use config::{ConfigError, PipelineConfig, PreTokenizerDefinition, DEFAULT_LANGUAGES};
pub use encoder::{EncodeError, Encoder, TokenizationResult};
pub use error::{Fallback, PipelineError};
pub use fence::{BlockDetector, FencedBlock, Segment, FENCE_MARKERS, UNKNOWN_LANGUAGE};
pub use lexer::{lex_with, Candidate, LanguageLexer, LexerRegistry, PythonLexer, RustLexer};
pub use pipeline::{ByteLevelStage, CodeFenceStage, PreTokenizer, PreTokenizerPipeline};
pub use span::{check_tiling, translate, Span, SpanKind, SyntaxClass, TilingFault};
pub use splitter::{ByteLevelSplitter, GPT2_PATTERN};
pub use vocab::{
    build_decoder, load_tiktoken_bpe, load_tiktoken_bpe_file, ByteVocabulary, TableVocabulary,
    VocabError, Vocabulary,
};
