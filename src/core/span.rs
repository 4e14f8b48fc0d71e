//! Byte-offset spans and the tiling check every stage is held to.
//!
//! A [`Span`] never owns its text. It points into the input that produced it,
//! so the only way to get at the characters is [`Span::text`] with that same
//! input. This keeps spans cheap to clone and makes it impossible for a stage to
//! "fix up" text without the offsets noticing.
//!
//! # Tiling
//!
//! A sequence of spans *tiles* a byte range when it is sorted by start,
//! contiguous, and non-overlapping across the whole range. Zero-width spans
//! are only legal when they carry the synthetic prefix-space marker, since
//! that marker corresponds to no input byte.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// What produced a span, and therefore which later stages may refine it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Lexed source code. Final: no later stage splits it again.
    Code,
    /// Prose, fence lines, or code in a language with no lexer.
    Text,
    /// A whitespace run, from either the lexer or the splitter.
    Whitespace,
    /// A byte-level word piece.
    Token,
}

/// Fine-grained syntax category attached to lexer output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxClass {
    Keyword,
    Identifier,
    Operator,
    Delimiter,
    Number,
    String,
    Comment,
    Whitespace,
    Newline,
    /// Leading whitespace of a line in an indentation-significant language.
    Indent,
    /// A character no rule accepted; kept so malformed code still tiles.
    Unknown,
}

impl SyntaxClass {
    /// Span kind a lexer emits for this class.
    pub fn span_kind(self) -> SpanKind {
        match self {
            SyntaxClass::Whitespace | SyntaxClass::Newline | SyntaxClass::Indent => {
                SpanKind::Whitespace
            }
            _ => SpanKind::Code,
        }
    }
}

/// An immutable `[start, end)` byte range over some input, with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
    /// Source language of the fenced block this span came from, if any.
    pub language: Option<Arc<str>>,
    /// Syntax class, set only on lexer output.
    pub class: Option<SyntaxClass>,
    /// True when a synthetic space precedes this span's text.
    pub prefix_space: bool,
}

impl Span {
    pub fn new(start: usize, end: usize, kind: SpanKind) -> Self {
        debug_assert!(start <= end, "span start {} past end {}", start, end);
        Self {
            start,
            end,
            kind,
            language: None,
            class: None,
            prefix_space: false,
        }
    }

    /// Span produced by a language lexer.
    pub fn lexed(start: usize, end: usize, class: SyntaxClass) -> Self {
        Self {
            class: Some(class),
            ..Self::new(start, end, class.span_kind())
        }
    }

    pub fn with_language(mut self, language: Option<Arc<str>>) -> Self {
        self.language = language;
        self
    }

    pub fn with_prefix_space(mut self, prefix_space: bool) -> Self {
        self.prefix_space = prefix_space;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The slice of `input` this span covers.
    ///
    /// `input` must be the text the span was produced from (for global spans,
    /// the full input of the pass).
    #[inline]
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }

    /// The span's text as the vocabulary sees it, synthetic space included.
    pub fn token_bytes(&self, input: &str) -> Vec<u8> {
        let slice = self.text(input).as_bytes();
        let mut bytes = Vec::with_capacity(slice.len() + 1);
        if self.prefix_space {
            bytes.push(b' ');
        }
        bytes.extend_from_slice(slice);
        bytes
    }
}

/// Shift a span produced against a local slice into the coordinates of the
/// enclosing text, where that slice begins at `offset`.
///
/// This is the only place local-to-global offset arithmetic happens.
#[inline]
pub fn translate(local: Span, offset: usize) -> Span {
    Span {
        start: local.start + offset,
        end: local.end + offset,
        ..local
    }
}

/// Ways a span sequence can fail to tile its range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilingFault {
    /// Bytes in `[expected, found)` are covered by no span.
    Gap { expected: usize, found: usize },
    /// A span starts at `found` although the previous one ended at `expected`.
    Overlap { expected: usize, found: usize },
    /// A zero-width span at `at` that is not a synthetic marker.
    EmptySpan { at: usize },
    /// The last span ends at `found` instead of the range end `expected`.
    ShortCoverage { expected: usize, found: usize },
}

impl TilingFault {
    /// Offset the sequence should have reached, and where it actually was.
    pub fn positions(&self) -> (usize, usize) {
        match *self {
            TilingFault::Gap { expected, found }
            | TilingFault::Overlap { expected, found }
            | TilingFault::ShortCoverage { expected, found } => (expected, found),
            TilingFault::EmptySpan { at } => (at, at),
        }
    }
}

impl fmt::Display for TilingFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TilingFault::Gap { expected, found } => {
                write!(f, "gap: bytes {}..{} are not covered", expected, found)
            }
            TilingFault::Overlap { expected, found } => write!(
                f,
                "overlap: span starts at {} but previous span ended at {}",
                found, expected
            ),
            TilingFault::EmptySpan { at } => write!(f, "zero-width span at {}", at),
            TilingFault::ShortCoverage { expected, found } => {
                write!(f, "coverage ends at {} instead of {}", found, expected)
            }
        }
    }
}

/// Check that `spans` tile `range` exactly.
pub fn check_tiling(spans: &[Span], range: Range<usize>) -> Result<(), TilingFault> {
    let mut cursor = range.start;

    for span in spans {
        if span.start > cursor {
            return Err(TilingFault::Gap {
                expected: cursor,
                found: span.start,
            });
        }
        if span.start < cursor || span.end < span.start {
            return Err(TilingFault::Overlap {
                expected: cursor,
                found: span.start,
            });
        }
        if span.is_empty() && !span.prefix_space {
            return Err(TilingFault::EmptySpan { at: span.start });
        }
        cursor = span.end;
    }

    if cursor != range.end {
        return Err(TilingFault::ShortCoverage {
            expected: range.end,
            found: cursor,
        });
    }

    Ok(())
}
