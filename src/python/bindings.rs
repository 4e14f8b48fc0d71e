//! Python bindings for the fencelex pipeline.
//!
//! # Thread Safety
//!
//! The pipeline is immutable after construction and can be shared across
//! Python threads. Batch calls use Rayon across texts.
//!
//! # Example
//!
//! ```python
//! from fencelex import PreTokenizer
//!
//! pre = PreTokenizer(languages=["python", "py"], add_prefix_space=False,
//!                    trim_offsets=True, use_regex=False)
//! for piece, (start, end) in pre.pre_tokenize_str(text):
//!     print(repr(piece), start, end)
//! ```

use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;
use rayon::prelude::*;

use crate::core::{
    ConfigError, PipelineConfig, PreTokenizerPipeline, SpanKind, DEFAULT_LANGUAGES,
};

fn config_err(err: ConfigError) -> PyErr {
    match err {
        ConfigError::Io(e) => PyIOError::new_err(e.to_string()),
        other => PyValueError::new_err(other.to_string()),
    }
}

fn kind_name(kind: SpanKind) -> &'static str {
    match kind {
        SpanKind::Code => "code",
        SpanKind::Text => "text",
        SpanKind::Whitespace => "whitespace",
        SpanKind::Token => "token",
    }
}

/// Python wrapper for [`PreTokenizerPipeline`].
#[pyclass(name = "PreTokenizer")]
pub struct PyPreTokenizer {
    inner: PreTokenizerPipeline,
}

#[pymethods]
impl PyPreTokenizer {
    /// Create the default code-fence + byte-level pipeline.
    ///
    /// Args:
    ///     languages: Fence tags to lex (default ["python", "py"])
    ///     add_prefix_space: Prepend a synthetic space to each text piece
    ///     trim_offsets: Emit the synthetic space as its own zero-width piece
    ///         instead of joining it to the first piece
    ///     use_regex: Split prose with the GPT-2 pattern instead of class runs
    ///
    /// Raises:
    ///     ValueError: If a language identifier is empty
    #[new]
    #[pyo3(signature = (languages=None, add_prefix_space=false, trim_offsets=true, use_regex=true))]
    fn new(
        languages: Option<Vec<String>>,
        add_prefix_space: bool,
        trim_offsets: bool,
        use_regex: bool,
    ) -> PyResult<Self> {
        let languages = languages
            .unwrap_or_else(|| DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect());
        let config = PipelineConfig::new(languages, add_prefix_space, trim_offsets, use_regex);
        let inner =
            PreTokenizerPipeline::new(config).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Build from a pre-tokenizer definition or a whole tokenizer.json string.
    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        let inner = PreTokenizerPipeline::from_json(json).map_err(config_err)?;
        Ok(Self { inner })
    }

    /// Build from a definition file on disk.
    #[staticmethod]
    fn from_file(path: &str) -> PyResult<Self> {
        let inner = PreTokenizerPipeline::from_file(path).map_err(config_err)?;
        Ok(Self { inner })
    }

    /// Split text into (piece, (start, end)) pairs.
    ///
    /// Pieces are rendered byte-level (space as "Ġ", newline as "Ċ");
    /// offsets are byte offsets into the UTF-8 input.
    ///
    /// Raises:
    ///     ValueError: If a stage fails to tile its input
    fn pre_tokenize_str(&self, text: &str) -> PyResult<Vec<(String, (usize, usize))>> {
        self.inner
            .pieces(text)
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// [`pre_tokenize_str`] over many texts in parallel.
    fn pre_tokenize_batch(&self, texts: Vec<String>) -> PyResult<Vec<Vec<(String, (usize, usize))>>> {
        texts
            .par_iter()
            .map(|text| self.inner.pieces(text))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Split text into (start, end, kind, language) tuples.
    fn spans(&self, text: &str) -> PyResult<Vec<(usize, usize, &'static str, Option<String>)>> {
        let spans = self
            .inner
            .run(text)
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(spans
            .into_iter()
            .map(|s| {
                (
                    s.start,
                    s.end,
                    kind_name(s.kind),
                    s.language.as_deref().map(str::to_string),
                )
            })
            .collect())
    }

    /// The pipeline definition as JSON.
    fn to_json(&self) -> PyResult<String> {
        self.inner
            .config()
            .to_definition()
            .to_json()
            .map_err(config_err)
    }

    #[getter]
    fn languages(&self) -> Vec<String> {
        self.inner.config().languages.clone()
    }

    #[getter]
    fn stages(&self) -> Vec<&'static str> {
        self.inner.stage_names()
    }

    fn __repr__(&self) -> String {
        let config = self.inner.config();
        format!(
            "PreTokenizer(languages={:?}, add_prefix_space={}, trim_offsets={}, use_regex={})",
            config.languages, config.add_prefix_space, config.trim_offsets, config.use_regex
        )
    }
}
