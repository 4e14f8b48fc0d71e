//! Stage composition.
//!
//! A [`PreTokenizerPipeline`] owns an immutable list of stages and folds the
//! input through them. Every pass starts from one [`SpanKind::Text`] span
//! covering the whole input. A stage looks at each span in turn and either
//! passes it through or replaces it with a finer sequence computed on the
//! span's own slice; those local spans are shifted into global offsets with
//! [`translate`].
//!
//! Each replacement must tile exactly the span it replaced, and the final
//! sequence must tile `[0, len)`. Either failure aborts the pass with
//! [`PipelineError::TilingViolation`].

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, instrument};

use super::byte_level::byte_level_encode;
use super::config::{ConfigError, PipelineConfig, PreTokenizerDefinition};
use super::error::{Fallback, PipelineError};
use super::fence::{BlockDetector, UNKNOWN_LANGUAGE};
use super::lexer::LexerRegistry;
use super::span::{check_tiling, translate, Span, SpanKind};
use super::splitter::ByteLevelSplitter;

/// One refinement step of a pipeline.
pub trait PreTokenizer: Send + Sync + fmt::Debug {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Whether this stage refines `span`. Spans it does not refine pass
    /// through unchanged.
    fn refines(&self, span: &Span) -> bool;

    /// Split `slice`, the text of `span`, into spans tiling
    /// `[0, slice.len())`.
    fn split(&self, span: &Span, slice: &str) -> Result<Vec<Span>, PipelineError>;
}

/// Finds fenced blocks in text spans and lexes the recognized ones.
///
/// Block bodies an earlier stage left as language-tagged text are lexed
/// whole when this stage knows their language, so several stages in one
/// sequence each contribute their languages.
#[derive(Debug)]
pub struct CodeFenceStage {
    detector: BlockDetector,
    lexers: LexerRegistry,
}

impl CodeFenceStage {
    pub fn new<I, S>(languages: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_registry(LexerRegistry::for_languages(languages))
    }

    pub fn with_registry(lexers: LexerRegistry) -> Result<Self, PipelineError> {
        Ok(Self {
            detector: BlockDetector::new()?,
            lexers,
        })
    }

    pub fn lexers(&self) -> &LexerRegistry {
        &self.lexers
    }
}

impl PreTokenizer for CodeFenceStage {
    fn name(&self) -> &'static str {
        "code_fence"
    }

    fn refines(&self, span: &Span) -> bool {
        span.kind == SpanKind::Text
            && match &span.language {
                None => true,
                Some(language) => self.lexers.is_recognized(language),
            }
    }

    fn split(&self, span: &Span, slice: &str) -> Result<Vec<Span>, PipelineError> {
        if let Some(language) = &span.language {
            return Ok(match self.lexers.get(language) {
                Some(lexer) => lexer.lex(slice),
                None => vec![Span::new(0, slice.len(), SpanKind::Text)],
            });
        }

        let mut spans = Vec::new();

        for segment in self.detector.detect(slice) {
            let language = match (&segment.language, segment.is_code) {
                (Some(language), true) => language,
                _ => {
                    spans.push(Span::new(segment.range.start, segment.range.end, SpanKind::Text));
                    continue;
                }
            };

            match self.lexers.get(language) {
                Some(lexer) => {
                    let body = &slice[segment.range.clone()];
                    spans.extend(lexer.lex(body).into_iter().map(|local| {
                        translate(local, segment.range.start).with_language(Some(language.clone()))
                    }));
                }
                None => {
                    if &**language != UNKNOWN_LANGUAGE {
                        debug!(
                            "{}",
                            Fallback::UnrecognizedLanguage {
                                language: language.to_string(),
                                offset: span.start + segment.range.start,
                            }
                        );
                    }
                    spans.push(
                        Span::new(segment.range.start, segment.range.end, SpanKind::Text)
                            .with_language(Some(language.clone())),
                    );
                }
            }
        }

        Ok(spans)
    }
}

/// Byte-level splitting of every remaining text span.
#[derive(Debug)]
pub struct ByteLevelStage {
    splitter: ByteLevelSplitter,
}

impl ByteLevelStage {
    pub fn new(add_prefix_space: bool, trim_offsets: bool, use_regex: bool) -> Result<Self, PipelineError> {
        Ok(Self {
            splitter: ByteLevelSplitter::new(add_prefix_space, trim_offsets, use_regex)?,
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Self::new(config.add_prefix_space, config.trim_offsets, config.use_regex)
    }

    pub fn splitter(&self) -> &ByteLevelSplitter {
        &self.splitter
    }
}

impl PreTokenizer for ByteLevelStage {
    fn name(&self) -> &'static str {
        "byte_level"
    }

    fn refines(&self, span: &Span) -> bool {
        span.kind == SpanKind::Text
    }

    fn split(&self, _span: &Span, slice: &str) -> Result<Vec<Span>, PipelineError> {
        self.splitter.split(slice)
    }
}

/// An immutable sequence of stages applied to every input.
///
/// The pipeline is `Send + Sync`; one instance can serve many threads.
#[derive(Debug)]
pub struct PreTokenizerPipeline {
    config: Arc<PipelineConfig>,
    stages: Vec<Box<dyn PreTokenizer>>,
}

impl PreTokenizerPipeline {
    /// The default pipeline: fenced-code lexing, then byte-level splitting.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let stages: Vec<Box<dyn PreTokenizer>> = vec![
            Box::new(CodeFenceStage::new(&config.languages)?),
            Box::new(ByteLevelStage::from_config(&config)?),
        ];
        Ok(Self {
            config: Arc::new(config),
            stages,
        })
    }

    /// A pipeline running `stages` in order. `config` is validated and kept
    /// for reporting only.
    pub fn from_stages(
        config: PipelineConfig,
        stages: Vec<Box<dyn PreTokenizer>>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            stages,
        })
    }

    /// Build the stages a definition lists, in its order.
    pub fn from_definition(definition: &PreTokenizerDefinition) -> Result<Self, ConfigError> {
        let config = PipelineConfig::from_definition(definition);
        let mut stages = Vec::new();
        push_stages(definition, &mut stages)?;
        Ok(Self::from_stages(config, stages)?)
    }

    /// Build from JSON: a definition or a whole `tokenizer.json`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_definition(&PreTokenizerDefinition::from_json(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_definition(&PreTokenizerDefinition::from_file(path)?)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Shared handle to the config.
    pub fn shared_config(&self) -> Arc<PipelineConfig> {
        Arc::clone(&self.config)
    }

    /// Stage names in application order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage over `text`.
    ///
    /// Returns spans tiling `[0, text.len())` in global byte offsets, or an
    /// error and no spans at all.
    #[instrument(level = "debug", skip_all, fields(len = text.len()))]
    pub fn run(&self, text: &str) -> Result<Vec<Span>, PipelineError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut spans = vec![Span::new(0, text.len(), SpanKind::Text)];
        for stage in &self.stages {
            spans = apply_stage(stage.as_ref(), spans, text)?;
            debug!(stage = stage.name(), spans = spans.len(), "stage applied");
        }

        check_tiling(&spans, 0..text.len()).map_err(|f| PipelineError::tiling("pipeline", f))?;
        Ok(spans)
    }

    /// [`run`](Self::run) over many inputs in parallel.
    pub fn run_batch(&self, texts: &[String]) -> Result<Vec<Vec<Span>>, PipelineError> {
        texts.par_iter().map(|text| self.run(text)).collect()
    }

    /// Spans as `(token_text, (start, end))` pairs, token text rendered
    /// byte-level with any synthetic space included.
    pub fn pieces(&self, text: &str) -> Result<Vec<(String, (usize, usize))>, PipelineError> {
        Ok(self
            .run(text)?
            .iter()
            .map(|span| {
                (
                    byte_level_encode(&span.token_bytes(text)),
                    (span.start, span.end),
                )
            })
            .collect())
    }
}

fn push_stages(
    definition: &PreTokenizerDefinition,
    stages: &mut Vec<Box<dyn PreTokenizer>>,
) -> Result<(), PipelineError> {
    match definition {
        PreTokenizerDefinition::CodeLexer { languages } => {
            stages.push(Box::new(CodeFenceStage::new(languages)?));
        }
        PreTokenizerDefinition::ByteLevel {
            add_prefix_space,
            trim_offsets,
            use_regex,
        } => {
            stages.push(Box::new(ByteLevelStage::new(
                *add_prefix_space,
                *trim_offsets,
                *use_regex,
            )?));
        }
        PreTokenizerDefinition::Sequence { pretokenizers } => {
            for inner in pretokenizers {
                push_stages(inner, stages)?;
            }
        }
    }
    Ok(())
}

/// Replace every span `stage` refines with its translated refinement.
fn apply_stage(
    stage: &dyn PreTokenizer,
    spans: Vec<Span>,
    text: &str,
) -> Result<Vec<Span>, PipelineError> {
    let mut out = Vec::with_capacity(spans.len());

    for span in spans {
        if !stage.refines(&span) || span.is_empty() {
            out.push(span);
            continue;
        }

        let refined: Vec<Span> = stage
            .split(&span, span.text(text))?
            .into_iter()
            .map(|local| {
                let mut global = translate(local, span.start);
                if global.language.is_none() {
                    global.language = span.language.clone();
                }
                global.prefix_space |= span.prefix_space && global.start == span.start;
                global
            })
            .collect();

        check_tiling(&refined, span.range()).map_err(|f| PipelineError::tiling(stage.name(), f))?;
        out.extend(refined);
    }

    Ok(out)
}
