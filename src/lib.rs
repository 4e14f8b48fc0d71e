//! fencelex: an offset-preserving pre-tokenizer for text that mixes prose
//! and fenced source code.
//!
//! ```ignore
//! use fencelex::{PipelineConfig, PreTokenizerPipeline};
//!
//! let pipeline = PreTokenizerPipeline::new(PipelineConfig::default())?;
//! let spans = pipeline.run("Code:\n```python\ndef f(x):\n    return x\n```")?;
//! ```

pub mod core;
#[cfg(feature = "python")]
mod python;

pub use core::{
    ByteVocabulary, ConfigError, EncodeError, Encoder, PipelineConfig, PipelineError,
    PreTokenizer, PreTokenizerDefinition, PreTokenizerPipeline, Span, SpanKind, SyntaxClass,
    TableVocabulary, TokenizationResult, Vocabulary,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// fencelex - code-aware pre-tokenizer with Python bindings
#[cfg(feature = "python")]
#[pymodule]
fn fencelex(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyPreTokenizer>()?;
    m.add("GPT2_PATTERN", core::GPT2_PATTERN)?;
    Ok(())
}
