//! Byte-level splitting of prose and unlexed code.
//!
//! Two modes:
//!
//! - **Regex**: the GPT-2 word-boundary pattern ([`GPT2_PATTERN`]). Letters,
//!   numbers and punctuation runs take one optional leading space; trailing
//!   whitespace before a word is left for that word.
//! - **Raw**: one span per maximal run of the same character class (letter,
//!   number, whitespace, other).
//!
//! With `add_prefix_space`, a text that does not start with whitespace gets
//! a synthetic leading space. The space is never part of the offsets; where
//! it goes depends on `trim_offsets`:
//!
//! - trimmed: the space is its own zero-width span at offset 0, flagged with
//!   [`Span::prefix_space`], and the text splits as if no space were added.
//! - untrimmed: the text splits as if the space preceded it, and the first
//!   piece (`" Hello"`) carries the flag over the bytes of `Hello`.
//!
//! The prefix applies per call, so inside a pipeline every text piece the
//! byte-level stage sees gets its own marker.

use fancy_regex::Regex;

use super::error::PipelineError;
use super::span::{Span, SpanKind};

/// GPT-2 pre-tokenization pattern. The `\s+(?!\S)` look-ahead is why this
/// needs a backtracking engine.
pub const GPT2_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Letter,
    Number,
    Whitespace,
    Other,
}

impl CharClass {
    fn of(c: char) -> Self {
        if c.is_whitespace() {
            CharClass::Whitespace
        } else if c.is_alphabetic() {
            CharClass::Letter
        } else if c.is_numeric() {
            CharClass::Number
        } else {
            CharClass::Other
        }
    }
}

/// Splits text into byte-level pieces.
#[derive(Debug, Clone)]
pub struct ByteLevelSplitter {
    regex: Option<Regex>,
    add_prefix_space: bool,
    trim_offsets: bool,
}

impl ByteLevelSplitter {
    pub fn new(
        add_prefix_space: bool,
        trim_offsets: bool,
        use_regex: bool,
    ) -> Result<Self, PipelineError> {
        let regex = if use_regex {
            Some(Regex::new(GPT2_PATTERN)?)
        } else {
            None
        };
        Ok(Self {
            regex,
            add_prefix_space,
            trim_offsets,
        })
    }

    pub fn uses_regex(&self) -> bool {
        self.regex.is_some()
    }

    pub fn add_prefix_space(&self) -> bool {
        self.add_prefix_space
    }

    pub fn trim_offsets(&self) -> bool {
        self.trim_offsets
    }

    /// Split `text` into spans tiling `[0, text.len())`, offsets local to
    /// `text`.
    pub fn split(&self, text: &str) -> Result<Vec<Span>, PipelineError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let prefixed = self.add_prefix_space && !text.starts_with(char::is_whitespace);
        if prefixed && self.trim_offsets {
            let mut spans = vec![Span::new(0, 0, SpanKind::Token).with_prefix_space(true)];
            spans.extend(self.split_plain(text)?);
            return Ok(spans);
        }

        match &self.regex {
            Some(regex) if prefixed => {
                // The first match always holds the space and the first char.
                let shifted = format!(" {}", text);
                regex
                    .find_iter(&shifted)
                    .map(|m| {
                        let m = m?;
                        let (start, end) = (m.start().saturating_sub(1), m.end() - 1);
                        Ok::<_, PipelineError>(
                            Span::new(start, end, piece_kind(&text[start..end]))
                                .with_prefix_space(m.start() == 0),
                        )
                    })
                    .collect()
            }
            None if prefixed => {
                let mut spans = class_runs(text);
                if let Some(first) = spans.first_mut() {
                    first.prefix_space = true;
                }
                Ok(spans)
            }
            _ => self.split_plain(text),
        }
    }

    fn split_plain(&self, text: &str) -> Result<Vec<Span>, PipelineError> {
        match &self.regex {
            Some(regex) => regex
                .find_iter(text)
                .map(|m| {
                    let m = m?;
                    Ok::<_, PipelineError>(Span::new(m.start(), m.end(), piece_kind(m.as_str())))
                })
                .collect(),
            None => Ok(class_runs(text)),
        }
    }
}

/// Maximal runs of one character class.
fn class_runs(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut chars = text.char_indices();
    let Some((_, first)) = chars.next() else {
        return spans;
    };

    let mut run_start = 0;
    let mut run_class = CharClass::of(first);
    for (i, c) in chars {
        let class = CharClass::of(c);
        if class != run_class {
            spans.push(Span::new(run_start, i, run_kind(run_class)));
            run_start = i;
            run_class = class;
        }
    }
    spans.push(Span::new(run_start, text.len(), run_kind(run_class)));
    spans
}

fn run_kind(class: CharClass) -> SpanKind {
    match class {
        CharClass::Whitespace => SpanKind::Whitespace,
        _ => SpanKind::Token,
    }
}

/// Whitespace-only pieces are [`SpanKind::Whitespace`], everything else is a
/// token.
fn piece_kind(piece: &str) -> SpanKind {
    if !piece.is_empty() && piece.chars().all(char::is_whitespace) {
        SpanKind::Whitespace
    } else {
        SpanKind::Token
    }
}
