//! Language-aware lexing of fenced code bodies.
//!
//! Every language implements [`LanguageLexer`] by supplying five capabilities
//! (comments, literals, identifiers, operators, whitespace). Each capability
//! looks at the remaining input and proposes at most one [`Candidate`]. The
//! shared driver in [`lex_with`] then resolves them the same way for every
//! language:
//!
//! 1. The longest candidate wins.
//! 2. On equal length, the capability declared first in [`PRECEDENCE`] wins.
//! 3. If nothing matches, one character is emitted as [`SyntaxClass::Unknown`].
//!
//! Rule 3 is what keeps malformed code (unbalanced quotes, stray bytes, a
//! snippet in the wrong language) tiled: the lexer never gives up on a body.
//!
//! Whitespace is never merged into a neighbouring token. Newlines are their
//! own spans, and for indentation-significant languages the whitespace that
//! opens a line is classed [`SyntaxClass::Indent`].

mod python;
mod rust;

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::error::Fallback;
use super::span::{Span, SyntaxClass};

pub use python::PythonLexer;
pub use rust::RustLexer;

/// A token proposal: its byte length from the current position and its class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub len: usize,
    pub class: SyntaxClass,
}

impl Candidate {
    #[inline]
    pub fn new(len: usize, class: SyntaxClass) -> Option<Self> {
        (len > 0).then_some(Self { len, class })
    }
}

/// Capability names in tie-break order.
pub const PRECEDENCE: [&str; 5] = ["comment", "literal", "identifier", "operator", "whitespace"];

/// Lexing rules for one source language.
///
/// Implementors only describe what a token looks like at the start of `rest`;
/// position tracking, tie-breaking and tiling are handled by [`lex_with`].
pub trait LanguageLexer: Send + Sync + fmt::Debug {
    /// Canonical lower-case language id, e.g. `"python"`.
    fn name(&self) -> &'static str;

    /// Other fence tags this lexer answers to.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Whether leading whitespace of a line is significant.
    fn indentation_significant(&self) -> bool {
        false
    }

    fn comment(&self, rest: &str) -> Option<Candidate>;

    /// String, character and numeric literals.
    fn literal(&self, rest: &str) -> Option<Candidate>;

    /// Identifiers and keywords.
    fn identifier(&self, rest: &str) -> Option<Candidate>;

    /// Operators and delimiters.
    fn operator(&self, rest: &str) -> Option<Candidate>;

    fn whitespace(&self, rest: &str) -> Option<Candidate> {
        newline(rest).or_else(|| horizontal_whitespace(rest))
    }

    /// Split `code` into spans tiling `[0, code.len())`.
    fn lex(&self, code: &str) -> Vec<Span> {
        lex_with(self, code)
    }
}

/// The shared longest-match driver.
pub fn lex_with<L: LanguageLexer + ?Sized>(lexer: &L, code: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut pos = 0;
    let mut line_start = true;

    while pos < code.len() {
        let rest = &code[pos..];
        let proposals = [
            lexer.comment(rest),
            lexer.literal(rest),
            lexer.identifier(rest),
            lexer.operator(rest),
            lexer.whitespace(rest),
        ];

        let mut best: Option<Candidate> = None;
        for candidate in proposals.into_iter().flatten() {
            if candidate.len > rest.len() || !rest.is_char_boundary(candidate.len) {
                continue;
            }
            match best {
                Some(b) if b.len >= candidate.len => {}
                _ => best = Some(candidate),
            }
        }

        let Candidate { len, mut class } = best.unwrap_or_else(|| Candidate {
            len: rest.chars().next().map_or(1, char::len_utf8),
            class: SyntaxClass::Unknown,
        });

        if class == SyntaxClass::Whitespace && line_start && lexer.indentation_significant() {
            class = SyntaxClass::Indent;
        }

        spans.push(Span::lexed(pos, pos + len, class));
        line_start = class == SyntaxClass::Newline;
        pos += len;
    }

    spans
}

/// Lexers selected for one pipeline, keyed by lower-case language id.
#[derive(Debug, Clone, Default)]
pub struct LexerRegistry {
    lexers: FxHashMap<String, Arc<dyn LanguageLexer>>,
}

impl LexerRegistry {
    /// An empty registry; every fenced block falls back to the splitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lexers shipped with the crate.
    pub fn builtin() -> Vec<Arc<dyn LanguageLexer>> {
        let python: Arc<dyn LanguageLexer> = Arc::new(PythonLexer);
        let rust: Arc<dyn LanguageLexer> = Arc::new(RustLexer);
        vec![python, rust]
    }

    /// Registry holding exactly the configured ids that have a lexer.
    ///
    /// Only the ids listed are recognized: configuring `["python"]` does not
    /// make a `py` fence lex. Ids with no implementation are logged and left
    /// out, so their blocks fall back to byte-level splitting.
    pub fn for_languages<I, S>(languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let builtin = Self::builtin();
        let mut registry = Self::new();

        for language in languages {
            let id = language.as_ref().to_ascii_lowercase();
            let found = builtin
                .iter()
                .find(|lexer| lexer.name() == id || lexer.aliases().contains(&id.as_str()));
            match found {
                Some(lexer) => registry.register(&id, Arc::clone(lexer)),
                None => tracing::warn!("{}", Fallback::UnimplementedLanguage(id)),
            }
        }

        registry
    }

    pub fn register(&mut self, id: &str, lexer: Arc<dyn LanguageLexer>) {
        self.lexers.insert(id.to_ascii_lowercase(), lexer);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn LanguageLexer>> {
        self.lexers.get(id)
    }

    pub fn is_recognized(&self, id: &str) -> bool {
        self.lexers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lexers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexers.is_empty()
    }

    /// Registered ids, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.lexers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

// ---------------------------------------------------------------------------
// Scanning helpers shared by the language variants
// ---------------------------------------------------------------------------

/// `\r\n`, `\n` or `\r`.
pub(crate) fn newline(rest: &str) -> Option<Candidate> {
    let len = if rest.starts_with("\r\n") {
        2
    } else if rest.starts_with('\n') || rest.starts_with('\r') {
        1
    } else {
        0
    };
    Candidate::new(len, SyntaxClass::Newline)
}

/// A run of non-newline whitespace.
pub(crate) fn horizontal_whitespace(rest: &str) -> Option<Candidate> {
    let len = prefix_len(rest, |c| c.is_whitespace() && c != '\n' && c != '\r');
    Candidate::new(len, SyntaxClass::Whitespace)
}

/// Byte length of the longest prefix whose chars all satisfy `pred`.
pub(crate) fn prefix_len(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(s.len(), |(i, _)| i)
}

/// Byte length of an identifier at the start of `s`, or 0.
pub(crate) fn ident_len(s: &str) -> usize {
    match s.chars().next() {
        Some(c) if c.is_alphabetic() || c == '_' => {
            c.len_utf8() + prefix_len(&s[c.len_utf8()..], |c| c.is_alphanumeric() || c == '_')
        }
        _ => 0,
    }
}

/// Everything up to (not including) the next line break.
pub(crate) fn rest_of_line(s: &str) -> usize {
    s.find(['\n', '\r']).unwrap_or(s.len())
}

/// Longest entry of `table` that prefixes `rest`.
pub(crate) fn longest_symbol(rest: &str, table: &[&str]) -> usize {
    table
        .iter()
        .filter(|sym| rest.starts_with(*sym))
        .map(|sym| sym.len())
        .max()
        .unwrap_or(0)
}

/// Length of a quoted body starting right after the opening `quote`.
///
/// Backslash skips the next character. For single-line literals an
/// unescaped line break ends the literal (unterminated, break excluded);
/// multi-line literals run to the end of input if never closed. The returned
/// length includes the closing quote when present.
pub(crate) fn quoted_body(s: &str, quote: &str, multiline: bool) -> usize {
    let mut chars = s.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if s[i..].starts_with(quote) {
            return i + quote.len();
        }
        if !multiline && (c == '\n' || c == '\r') {
            return i;
        }
    }
    s.len()
}

/// Digits of the given radix interleaved with `_`.
pub(crate) fn digits_len(s: &str, radix: u32) -> usize {
    prefix_len(s, |c| c == '_' || c.is_digit(radix))
}

/// `e`/`E`, optional sign, at least one digit. Zero if not a full exponent.
pub(crate) fn exponent_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let sign = usize::from(matches!(bytes.get(1), Some(b'+' | b'-')));
    let digits = digits_len(&s[1 + sign..], 10);
    if digits == 0 || !bytes[1 + sign].is_ascii_digit() {
        0
    } else {
        1 + sign + digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::span::check_tiling;

    /// Minimal language: words, `+`, `#` comments.
    #[derive(Debug)]
    struct Toy;

    impl LanguageLexer for Toy {
        fn name(&self) -> &'static str {
            "toy"
        }
        fn comment(&self, rest: &str) -> Option<Candidate> {
            rest.starts_with('#')
                .then(|| Candidate::new(rest_of_line(rest), SyntaxClass::Comment))
                .flatten()
        }
        fn literal(&self, rest: &str) -> Option<Candidate> {
            Candidate::new(digits_len(rest, 10), SyntaxClass::Number)
        }
        fn identifier(&self, rest: &str) -> Option<Candidate> {
            Candidate::new(ident_len(rest), SyntaxClass::Identifier)
        }
        fn operator(&self, rest: &str) -> Option<Candidate> {
            Candidate::new(longest_symbol(rest, &["+", "++"]), SyntaxClass::Operator)
        }
    }

    fn classes(code: &str) -> Vec<(&str, SyntaxClass)> {
        Toy.lex(code)
            .iter()
            .map(|s| (s.text(code), s.class.unwrap()))
            .collect()
    }

    #[test]
    fn test_driver_tiles_and_classifies() {
        let code = "a ++ 12 # done\nb";
        let spans = Toy.lex(code);
        check_tiling(&spans, 0..code.len()).unwrap();
        assert_eq!(
            classes(code),
            vec![
                ("a", SyntaxClass::Identifier),
                (" ", SyntaxClass::Whitespace),
                ("++", SyntaxClass::Operator),
                (" ", SyntaxClass::Whitespace),
                ("12", SyntaxClass::Number),
                (" ", SyntaxClass::Whitespace),
                ("# done", SyntaxClass::Comment),
                ("\n", SyntaxClass::Newline),
                ("b", SyntaxClass::Identifier),
            ]
        );
    }

    #[test]
    fn test_unknown_characters_are_single_spans() {
        let code = "a$€b";
        assert_eq!(
            classes(code),
            vec![
                ("a", SyntaxClass::Identifier),
                ("$", SyntaxClass::Unknown),
                ("€", SyntaxClass::Unknown),
                ("b", SyntaxClass::Identifier),
            ]
        );
    }

    #[test]
    fn test_tie_goes_to_earlier_capability() {
        // Literal and identifier propose the same length here.
        #[derive(Debug)]
        struct Tie;
        impl LanguageLexer for Tie {
            fn name(&self) -> &'static str {
                "tie"
            }
            fn comment(&self, _: &str) -> Option<Candidate> {
                None
            }
            fn literal(&self, rest: &str) -> Option<Candidate> {
                Candidate::new(ident_len(rest), SyntaxClass::String)
            }
            fn identifier(&self, rest: &str) -> Option<Candidate> {
                Candidate::new(ident_len(rest), SyntaxClass::Identifier)
            }
            fn operator(&self, _: &str) -> Option<Candidate> {
                None
            }
        }
        let spans = Tie.lex("abc");
        assert_eq!(spans[0].class, Some(SyntaxClass::String));
    }

    #[test]
    fn test_crlf_is_one_newline() {
        assert_eq!(
            classes("a\r\nb"),
            vec![
                ("a", SyntaxClass::Identifier),
                ("\r\n", SyntaxClass::Newline),
                ("b", SyntaxClass::Identifier),
            ]
        );
    }

    #[test]
    fn test_quoted_body() {
        assert_eq!(quoted_body("abc\" rest", "\"", false), 4);
        assert_eq!(quoted_body("a\\\"b\"", "\"", false), 5);
        assert_eq!(quoted_body("abc\nrest", "\"", false), 3);
        assert_eq!(quoted_body("abc\nrest", "\"", true), 8);
        assert_eq!(quoted_body("a\"\"\"", "\"\"\"", true), 4);
    }

    #[test]
    fn test_exponent() {
        assert_eq!(exponent_len("e10"), 3);
        assert_eq!(exponent_len("E-3x"), 3);
        assert_eq!(exponent_len("e"), 0);
        assert_eq!(exponent_len("e+"), 0);
        assert_eq!(exponent_len("else"), 0);
    }

    #[test]
    fn test_registry_only_holds_configured_ids() {
        let registry = LexerRegistry::for_languages(["Python", "cobol"]);
        assert!(registry.is_recognized("python"));
        assert!(!registry.is_recognized("py"));
        assert!(!registry.is_recognized("cobol"));
        assert_eq!(registry.languages(), vec!["python"]);
    }

    #[test]
    fn test_registry_resolves_aliases() {
        let registry = LexerRegistry::for_languages(["py", "rs"]);
        assert_eq!(registry.get("py").unwrap().name(), "python");
        assert_eq!(registry.get("rs").unwrap().name(), "rust");
    }
}
