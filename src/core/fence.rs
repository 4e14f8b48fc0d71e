//! Fenced code block detection.
//!
//! Splits raw text into alternating prose and code segments. A block opens
//! with a fence (a run of at least three backticks or three tildes) at the
//! start of a line, optionally followed by a language tag, and closes at the
//! first later line holding only a run of the same character at least as long
//! as the opening one.
//!
//! ```text
//! Here is code:\n          text
//! ```python\n              text (opening fence line)
//! x = 1\n                  code, language "python"
//! ```\nMore text.          text
//! ```
//!
//! An opening fence that is never closed is not a block: its bytes stay in
//! the surrounding text segment and nothing after it is treated as code.

use std::ops::Range;
use std::sync::Arc;

use aho_corasick::{AhoCorasick, Input};

use super::error::{Fallback, PipelineError};

/// Shortest fence runs recognized at the start of a line.
pub const FENCE_MARKERS: [&str; 2] = ["```", "~~~"];

/// Language reported for a fence with no tag.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// A well-formed fenced block. All offsets are byte offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Start of the opening marker.
    pub open_fence: usize,
    /// Tag as written after the opening marker, if any.
    pub language: Option<String>,
    /// First byte after the opening fence line.
    pub body_start: usize,
    /// End of the body; always equal to `close_fence`.
    pub body_end: usize,
    /// Start of the closing marker.
    pub close_fence: usize,
}

impl FencedBlock {
    /// Lower-cased tag, or [`UNKNOWN_LANGUAGE`] when the fence has none.
    pub fn language_id(&self) -> String {
        match &self.language {
            Some(tag) => tag.to_ascii_lowercase(),
            None => UNKNOWN_LANGUAGE.to_string(),
        }
    }

    pub fn body(&self) -> Range<usize> {
        self.body_start..self.body_end
    }
}

/// One item of [`BlockDetector::detect`] output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub range: Range<usize>,
    pub is_code: bool,
    /// Normalized language id; set only on code segments.
    pub language: Option<Arc<str>>,
}

impl Segment {
    fn text(range: Range<usize>) -> Self {
        Self {
            range,
            is_code: false,
            language: None,
        }
    }
}

/// Scans text for fenced code blocks.
#[derive(Debug, Clone)]
pub struct BlockDetector {
    markers: AhoCorasick,
}

impl BlockDetector {
    pub fn new() -> Result<Self, PipelineError> {
        Ok(Self {
            markers: AhoCorasick::new(FENCE_MARKERS)?,
        })
    }

    /// Split `text` into segments covering `[0, text.len())` exactly once.
    pub fn detect(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for block in self.blocks(text) {
            if block.open_fence > cursor {
                segments.push(Segment::text(cursor..block.open_fence));
            }
            segments.push(Segment::text(block.open_fence..block.body_start));
            if block.body_end > block.body_start {
                segments.push(Segment {
                    range: block.body(),
                    is_code: true,
                    language: Some(Arc::from(block.language_id())),
                });
            }
            cursor = block.body_end;
        }

        if cursor < text.len() {
            segments.push(Segment::text(cursor..text.len()));
        }

        segments
    }

    /// All well-formed blocks in `text`, in order.
    pub fn blocks(&self, text: &str) -> Vec<FencedBlock> {
        let bytes = text.as_bytes();
        let mut blocks = Vec::new();
        let mut pos = 0;

        while pos < text.len() {
            let Some(m) = self.markers.find(Input::new(text).range(pos..)) else {
                break;
            };
            let open = m.start();
            let fence = FENCE_MARKERS[m.pattern().as_usize()].as_bytes()[0];

            if open > 0 && bytes[open - 1] != b'\n' {
                pos = m.end();
                continue;
            }

            let run = run_len(bytes, open, fence);
            let info_end = line_end(text, open + run);
            let info = &text[open + run..info_end];
            // Backtick fences cannot carry backticks in their info string;
            // such a line is inline code, not a fence.
            if fence == b'`' && info.contains('`') {
                pos = info_end;
                continue;
            }
            if info_end == text.len() {
                tracing::debug!("{}", Fallback::UnterminatedFence { offset: open });
                break;
            }

            let body_start = info_end + 1;
            match find_close(text, body_start, fence, run) {
                Some(close) => {
                    blocks.push(FencedBlock {
                        open_fence: open,
                        language: parse_tag(info),
                        body_start,
                        body_end: close,
                        close_fence: close,
                    });
                    pos = line_end(text, close);
                }
                None => {
                    tracing::debug!("{}", Fallback::UnterminatedFence { offset: open });
                    break;
                }
            }
        }

        blocks
    }
}

/// Offset of the next `\n` at or after `from`, or the end of `text`.
fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map(|i| from + i)
        .unwrap_or(text.len())
}

/// Length of the run of `fence` bytes starting at `from`.
fn run_len(bytes: &[u8], from: usize, fence: u8) -> usize {
    bytes[from..].iter().take_while(|&&b| b == fence).count()
}

/// Start of the first line at or after `from` holding only a run of at
/// least `min_run` `fence` bytes.
fn find_close(text: &str, from: usize, fence: u8, min_run: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut line_start = from;
    while line_start < text.len() {
        let end = line_end(text, line_start);
        let run = run_len(&bytes[..end], line_start, fence);
        if run >= min_run && text[line_start + run..end].trim().is_empty() {
            return Some(line_start);
        }
        line_start = end + 1;
    }
    None
}

/// The language tag at the start of a fence info string.
fn parse_tag(info: &str) -> Option<String> {
    let tag: String = info
        .trim_start()
        .chars()
        .take_while(|&c| c.is_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'))
        .collect();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}
