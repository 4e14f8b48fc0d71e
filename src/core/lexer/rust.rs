//! Rust lexing rules.

use std::sync::LazyLock;

use rustc_hash::FxHashSet;

use super::{
    digits_len, exponent_len, ident_len, longest_symbol, quoted_body, rest_of_line, Candidate,
    LanguageLexer,
};
use crate::core::span::SyntaxClass;

static KEYWORDS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
    [
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait",
        "true", "type", "unsafe", "use", "where", "while", "yield",
    ]
    .into_iter()
    .collect()
});

const OPERATORS: &[&str] = &[
    "<<=", ">>=", "...", "..=", "::", "->", "=>", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=",
    "*=", "/=", "%=", "^=", "&=", "|=", "<<", ">>", "..", "+", "-", "*", "/", "%", "^", "!",
    "&", "|", "=", "<", ">", "@", ".", ":", "#", "$", "?", "~",
];

const DELIMITERS: &[&str] = &["(", ")", "[", "]", "{", "}", ",", ";"];

/// Lexer for Rust source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustLexer;

impl RustLexer {
    /// Nested `/* */` comment; runs to end of input if unbalanced.
    fn block_comment(rest: &str) -> usize {
        let mut depth = 0usize;
        let mut i = 0;
        while i < rest.len() {
            let tail = &rest[i..];
            if tail.starts_with("/*") {
                depth += 1;
                i += 2;
            } else if tail.starts_with("*/") {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return i;
                }
            } else {
                i += tail.chars().next().map_or(1, char::len_utf8);
            }
        }
        rest.len()
    }

    /// `r"..."`, `r#"..."#` and friends, after the `r`.
    fn raw_string(s: &str) -> usize {
        let hashes = s.bytes().take_while(|&b| b == b'#').count();
        let Some(body) = s[hashes..].strip_prefix('"') else {
            return 0;
        };
        let closing = format!("\"{}", "#".repeat(hashes));
        let end = body.find(&closing).map_or(body.len(), |i| i + closing.len());
        hashes + 1 + end
    }

    /// `'x'`, `'\n'`, `'\u{1F980}'`; zero if the quote does not close a char.
    fn char_literal(s: &str) -> usize {
        let Some(inner) = s.strip_prefix('\'') else {
            return 0;
        };
        let body = if let Some(escaped) = inner.strip_prefix('\\') {
            if escaped.starts_with("u{") {
                escaped.find('}').map_or(0, |i| 1 + i + 1)
            } else if escaped.starts_with('x') {
                1 + escaped.get(..3).map_or(0, |_| 3)
            } else {
                1 + escaped.chars().next().map_or(0, char::len_utf8)
            }
        } else {
            match inner.chars().next() {
                Some('\'') | Some('\n') | None => 0,
                Some(c) => c.len_utf8(),
            }
        };
        if body == 0 || !inner.is_char_boundary(body) || !inner[body..].starts_with('\'') {
            return 0;
        }
        1 + body + 1
    }

    fn string(rest: &str) -> usize {
        let (prefix, tail) = match rest.as_bytes() {
            [b'b' | b'c', b'r', ..] => (2, &rest[2..]),
            [b'b' | b'c', ..] => (1, &rest[1..]),
            _ => (0, rest),
        };

        if rest.starts_with('r') || (prefix == 2) {
            let skip = usize::from(prefix == 0);
            let raw = Self::raw_string(&tail[skip..]);
            return if raw > 0 { prefix + skip + raw } else { 0 };
        }
        if let Some(body) = tail.strip_prefix('"') {
            return prefix + 1 + quoted_body(body, "\"", true);
        }
        if prefix == 1 && rest.starts_with('b') {
            let ch = Self::char_literal(tail);
            return if ch > 0 { 1 + ch } else { 0 };
        }
        Self::char_literal(rest)
    }

    fn number(rest: &str) -> usize {
        if !rest.as_bytes().first().is_some_and(u8::is_ascii_digit) {
            return 0;
        }

        let mut len = match rest.get(..2) {
            Some("0x") => 2 + digits_len(&rest[2..], 16),
            Some("0o") => 2 + digits_len(&rest[2..], 8),
            Some("0b") => 2 + digits_len(&rest[2..], 2),
            _ => {
                let mut len = digits_len(rest, 10);
                let after = &rest.as_bytes()[len..];
                // `1.5` is a float; `1..2` and `x.0.method()` are not.
                if after.first() == Some(&b'.') && after.get(1).is_some_and(u8::is_ascii_digit) {
                    len += 1 + digits_len(&rest[len + 1..], 10);
                }
                len + exponent_len(&rest[len..])
            }
        };

        // Type suffix such as `u8`, `usize`, `f64`.
        len += ident_len(&rest[len..]);
        len
    }
}

impl LanguageLexer for RustLexer {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn aliases(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn comment(&self, rest: &str) -> Option<Candidate> {
        let len = if rest.starts_with("//") {
            rest_of_line(rest)
        } else if rest.starts_with("/*") {
            Self::block_comment(rest)
        } else {
            0
        };
        Candidate::new(len, SyntaxClass::Comment)
    }

    fn literal(&self, rest: &str) -> Option<Candidate> {
        Candidate::new(Self::string(rest), SyntaxClass::String)
            .or_else(|| Candidate::new(Self::number(rest), SyntaxClass::Number))
    }

    fn identifier(&self, rest: &str) -> Option<Candidate> {
        if let Some(raw) = rest.strip_prefix("r#") {
            let n = ident_len(raw);
            return Candidate::new(if n > 0 { 2 + n } else { 0 }, SyntaxClass::Identifier);
        }
        if let Some(name) = rest.strip_prefix('\'') {
            // Lifetime or label. A closed char literal is longer and wins.
            let n = ident_len(name);
            return Candidate::new(if n > 0 { 1 + n } else { 0 }, SyntaxClass::Identifier);
        }

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
}
