//! Python lexing rules.

use std::sync::LazyLock;

use rustc_hash::FxHashSet;

use super::{
    digits_len, exponent_len, horizontal_whitespace, ident_len, longest_symbol, newline,
    quoted_body, rest_of_line, Candidate, LanguageLexer,
};
use crate::core::span::SyntaxClass;

static KEYWORDS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield",
        // soft
        "match", "case", "type",
    ]
    .into_iter()
    .collect()
});

const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", "<<", ">>", "<=", ">=", "==",
    "!=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@",
    "&", "|", "^", "~", "<", ">", "=", ".", ":", "!",
];

const DELIMITERS: &[&str] = &["(", ")", "[", "]", "{", "}", ",", ";"];

/// String prefixes, longest first so `rb` is tried before `r`.
const STRING_PREFIXES: &[&str] = &["rb", "br", "rf", "fr", "r", "b", "u", "f"];

/// Lexer for Python 3 source.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonLexer;

impl PythonLexer {
    fn string(rest: &str) -> usize {
        let bytes = rest.as_bytes();
        let prefix = STRING_PREFIXES
            .iter()
            .find(|p| {
                bytes.len() > p.len()
                    && bytes[..p.len()].eq_ignore_ascii_case(p.as_bytes())
                    && matches!(bytes[p.len()], b'\'' | b'"')
            })
            .map_or(0, |p| p.len());

        let body = &rest[prefix..];
        for quote in ["\"\"\"", "'''", "\"", "'"] {
            if let Some(inner) = body.strip_prefix(quote) {
                let multiline = quote.len() == 3;
                return prefix + quote.len() + quoted_body(inner, quote, multiline);
            }
        }
        0
    }

    fn number(rest: &str) -> usize {
        let lower = rest.get(..2).map(str::to_ascii_lowercase);
        for (marker, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
            if lower.as_deref() == Some(marker) {
                let digits = digits_len(&rest[2..], radix);
                return if digits > 0 { 2 + digits } else { 0 };
            }
        }

        let bytes = rest.as_bytes();
        let mut len = if bytes.first().is_some_and(u8::is_ascii_digit) {
            digits_len(rest, 10)
        } else {
            0
        };

        if rest[len..].starts_with('.') {
            let fraction = digits_len(&rest[len + 1..], 10);
            let starts_with_digit = bytes.get(len + 1).is_some_and(u8::is_ascii_digit);
            if len > 0 || (fraction > 0 && starts_with_digit) {
                len += 1 + fraction;
            }
        }
        if len == 0 {
            return 0;
        }

        len += exponent_len(&rest[len..]);
        if rest[len..].starts_with(['j', 'J']) {
            len += 1;
        }
        len
    }
}

impl LanguageLexer for PythonLexer {
    fn name(&self) -> &'static str {
        "python"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["py", "python3"]
    }

    fn indentation_significant(&self) -> bool {
        true
    }

    fn comment(&self, rest: &str) -> Option<Candidate> {
        if rest.starts_with('#') {
            Candidate::new(rest_of_line(rest), SyntaxClass::Comment)
        } else {
            None
        }
    }

    fn literal(&self, rest: &str) -> Option<Candidate> {
        Candidate::new(Self::string(rest), SyntaxClass::String)
            .or_else(|| Candidate::new(Self::number(rest), SyntaxClass::Number))
    }

    fn identifier(&self, rest: &str) -> Option<Candidate> {
        let len = ident_len(rest);
        let class = if KEYWORDS.contains(&rest[..len]) {
            SyntaxClass::Keyword
        } else {
            SyntaxClass::Identifier
        };
        Candidate::new(len, class)
    }

    fn operator(&self, rest: &str) -> Option<Candidate> {
        Candidate::new(longest_symbol(rest, DELIMITERS), SyntaxClass::Delimiter)
            .or_else(|| Candidate::new(longest_symbol(rest, OPERATORS), SyntaxClass::Operator))
    }

    fn whitespace(&self, rest: &str) -> Option<Candidate> {
        // Explicit line joining: the backslash and the break are one span.
        if let Some(after) = rest.strip_prefix('\\') {
            if let Some(nl) = newline(after) {
                return Candidate::new(1 + nl.len, SyntaxClass::Whitespace);
            }
        }
        newline(rest).or_else(|| horizontal_whitespace(rest))
    }
}
