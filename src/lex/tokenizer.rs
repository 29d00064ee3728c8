//! Lazy C/C++ tokenizer
//!
//! Three scan states drive the loop: whitespace (skipped), textual runs
//! (letters, digits, underscore) and punctuation runs. Punctuation is
//! matched against [`SYMBOLS`] by longest terminal prefix, so `>>=` is a
//! single token while `..` falls back to `.`.
//!
//! Some symbol tokens switch the scanner into a sub-mode right after they
//! are recognized: quotes consume a literal (re-tagged as
//! [`TokenKind::Literal`]), `//` and `/*` consume a comment that is never
//! emitted.
//!
//! @module lex/tokenizer

use super::token::{Keyword, Punct, Token, TokenKind, SYMBOLS};

// =============================================================================
// DIAGNOSTICS
// =============================================================================

/// Recoverable lexing problems; the token stream is still produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexDiagnosticKind {
    /// Quote not closed before the end of its line; the literal stops there
    UnterminatedLiteral,
    /// Raw string not closed before end of input; the literal runs to the end
    UnterminatedRawString,
    /// `/*` without `*/`; the comment runs to the end
    UnterminatedComment,
}

impl LexDiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnterminatedLiteral => "unterminated literal",
            Self::UnterminatedRawString => "unterminated raw string literal",
            Self::UnterminatedComment => "unterminated block comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexDiagnostic {
    pub kind: LexDiagnosticKind,
    /// Line where the construct started
    pub line: u32,
}

// =============================================================================
// TOKENIZER
// =============================================================================

/// Single-pass, non-restartable token iterator over a byte buffer
pub struct Tokenizer<'a> {
    source: &'a [u8],
    pos: usize,
    line: u32,
    line_start: usize,
    /// Span of the previous token when it was a textual run (raw string prefixes)
    prev_textual: Option<(usize, usize)>,
    diagnostics: Vec<LexDiagnostic>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            line_start: 0,
            prev_textual: None,
            diagnostics: Vec::new(),
        }
    }

    /// Diagnostics collected so far
    pub fn diagnostics(&self) -> &[LexDiagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<LexDiagnostic> {
        self.diagnostics
    }

    #[inline]
    fn peek(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    /// Move to `end`, keeping the line counter in sync
    fn advance_to(&mut self, end: usize) {
        let end = end.min(self.source.len());
        for i in self.pos..end {
            if self.source[i] == b'\n' {
                self.line += 1;
                self.line_start = i + 1;
            }
        }
        self.pos = end;
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek(0) {
            match b {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = self.pos;
                }
                b' ' | b'\t' | b'\r' | b'\x0b' | b'\x0c' => self.pos += 1,
                _ => break,
            }
        }
    }

    fn make(&self, kind: TokenKind, start: usize, line: u32, column: u32) -> Token {
        Token {
            kind,
            start: start as u32,
            end: self.pos as u32,
            line,
            column,
        }
    }

    fn textual(&mut self) {
        let numeric = self.source[self.pos].is_ascii_digit();
        while let Some(b) = self.peek(0) {
            if is_textual(b) {
                self.pos += 1;
            } else if numeric && b == b'\'' && self.peek(1).is_some_and(|n| n.is_ascii_alphanumeric()) {
                // digit separator: 1'000'000
                self.pos += 2;
            } else {
                break;
            }
        }
    }

    fn undefined(&mut self) {
        self.pos += 1;
        // keep a multi-byte UTF-8 character in one token
        while self.peek(0).is_some_and(|b| (0x80..0xC0).contains(&b)) {
            self.pos += 1;
        }
    }

    /// Consume a literal whose opening quote has just been read
    fn literal(&mut self, quote: u8, quote_start: usize, line: u32) {
        if quote == b'"' && self.raw_prefix(quote_start) {
            self.raw_string(line);
            return;
        }
        while let Some(b) = self.peek(0) {
            match b {
                b'\\' => {
                    let escaped_end = (self.pos + 2).min(self.source.len());
                    self.advance_to(escaped_end);
                }
                b'\n' => {
                    self.diagnostics.push(LexDiagnostic {
                        kind: LexDiagnosticKind::UnterminatedLiteral,
                        line,
                    });
                    return;
                }
                _ if b == quote => {
                    self.pos += 1;
                    return;
                }
                _ => self.pos += 1,
            }
        }
        self.diagnostics.push(LexDiagnostic {
            kind: LexDiagnosticKind::UnterminatedLiteral,
            line,
        });
    }

    /// True when the quote is glued to an `R`, `u8R`, `uR`, `UR` or `LR` prefix
    fn raw_prefix(&self, quote_start: usize) -> bool {
        match self.prev_textual {
            Some((start, end)) if end == quote_start => {
                matches!(&self.source[start..end], b"R" | b"u8R" | b"uR" | b"UR" | b"LR")
            }
            _ => false,
        }
    }

    /// `R"delim( ... )delim"`, the opening quote already consumed
    fn raw_string(&mut self, line: u32) {
        let rest = &self.source[self.pos..];
        let delimiter_len = rest.iter().take(17).position(|&b| b == b'(');
        let Some(delimiter_len) = delimiter_len else {
            // not a well-formed raw string, lex as an ordinary literal
            self.prev_textual = None;
            self.literal(b'"', self.pos, line);
            return;
        };

        let mut closing = Vec::with_capacity(delimiter_len + 2);
        closing.push(b')');
        closing.extend_from_slice(&rest[..delimiter_len]);
        closing.push(b'"');

        let body_start = self.pos + delimiter_len + 1;
        let found = self.source[body_start..]
            .windows(closing.len())
            .position(|w| w == closing.as_slice());
        match found {
            Some(offset) => self.advance_to(body_start + offset + closing.len()),
            None => {
                self.diagnostics.push(LexDiagnostic {
                    kind: LexDiagnosticKind::UnterminatedRawString,
                    line,
                });
                self.advance_to(self.source.len());
            }
        }
    }

    /// `//` comment up to the end of line; a trailing backslash continues it
    fn line_comment(&mut self) {
        loop {
            let Some(offset) = self.source[self.pos..].iter().position(|&b| b == b'\n') else {
                self.pos = self.source.len();
                return;
            };
            let newline = self.pos + offset;
            let mut before = newline;
            if before > self.pos && self.source[before - 1] == b'\r' {
                before -= 1;
            }
            if before > self.pos && self.source[before - 1] == b'\\' {
                self.advance_to(newline + 1);
                continue;
            }
            self.pos = newline;
            return;
        }
    }

    fn block_comment(&mut self, line: u32) {
        let found = self.source[self.pos..]
            .windows(2)
            .position(|w| w == b"*/");
        match found {
            Some(offset) => self.advance_to(self.pos + offset + 2),
            None => {
                self.diagnostics.push(LexDiagnostic {
                    kind: LexDiagnosticKind::UnterminatedComment,
                    line,
                });
                self.advance_to(self.source.len());
            }
        }
    }
}

#[inline]
fn is_textual(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            self.skip_whitespace();
            let b = self.peek(0)?;
            let start = self.pos;
            let line = self.line;
            let column = (start - self.line_start + 1) as u32;

            if is_textual(b) {
                self.textual();
                self.prev_textual = Some((start, self.pos));
                let word = std::str::from_utf8(&self.source[start..self.pos]).unwrap_or("");
                let kind = match Keyword::lookup(word) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Identifier,
                };
                return Some(self.make(kind, start, line, column));
            }

            let symbol = if Punct::starts_symbol(b) {
                SYMBOLS.longest_prefix(&self.source[start..])
            } else {
                None
            };

            let Some((len, &punct)) = symbol else {
                self.undefined();
                self.prev_textual = None;
                return Some(self.make(TokenKind::Undefined, start, line, column));
            };

            self.pos += len;
            let kind = match punct {
                Punct::Quote | Punct::DoubleQuote => {
                    self.literal(b, start, line);
                    TokenKind::Literal
                }
                Punct::LineComment => {
                    self.line_comment();
                    continue;
                }
                Punct::BlockComment => {
                    self.block_comment(line);
                    continue;
                }
                _ => TokenKind::Symbol(punct),
            };
            self.prev_textual = None;
            return Some(self.make(kind, start, line, column));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<(TokenKind, String)> {
        Tokenizer::new(src.as_bytes())
            .map(|t| (t.kind, t.text(src.as_bytes()).to_string()))
            .collect()
    }

    fn texts(src: &str) -> Vec<String> {
        lex(src).into_iter().map(|(_, t)| t).collect()
    }

    #[test]
    fn test_longest_match_shift_assign() {
        let tokens = lex(">>=");
        assert_eq!(tokens, vec![(TokenKind::Symbol(Punct::ShrEq), ">>=".to_string())]);
    }

    #[test]
    fn test_longest_match_backs_off() {
        assert_eq!(texts("a..b"), vec!["a", ".", ".", "b"]);
        assert_eq!(texts("x->*y"), vec!["x", "->*", "y"]);
        assert_eq!(texts("a>>b>c"), vec!["a", ">>", "b", ">", "c"]);
        assert_eq!(texts("f(...)"), vec!["f", "(", "...", ")"]);
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = lex("namespace ns { class Foo; }");
        assert_eq!(tokens[0].0, TokenKind::Keyword(Keyword::Namespace));
        assert_eq!(tokens[1].0, TokenKind::Identifier);
        assert_eq!(tokens[3].0, TokenKind::Keyword(Keyword::Class));
    }

    #[test]
    fn test_comments_are_dropped() {
        let src = "a // line \\\n still comment\nb /* block\n */ c";
        assert_eq!(texts(src), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_literals() {
        let tokens = lex(r#"x = "a \" b"; c = '\'';"#);
        assert_eq!(tokens[2], (TokenKind::Literal, r#""a \" b""#.to_string()));
        assert_eq!(tokens[6], (TokenKind::Literal, r"'\''".to_string()));
    }

    #[test]
    fn test_raw_string_spans_lines() {
        let src = "auto s = R\"x(line \" )\"\nnext)x\"; y";
        let tokens = texts(src);
        assert_eq!(tokens[3], "R");
        assert_eq!(tokens[4], "\"x(line \" )\"\nnext)x\"");
        assert_eq!(tokens[5], ";");
        assert_eq!(tokens[6], "y");
    }

    #[test]
    fn test_digit_separator() {
        assert_eq!(texts("n = 1'000'000;"), vec!["n", "=", "1'000'000", ";"]);
    }

    #[test]
    fn test_line_and_column() {
        let src = "a\n  b\n\n c";
        let tokens: Vec<Token> = Tokenizer::new(src.as_bytes()).collect();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
        assert_eq!((tokens[2].line, tokens[2].column), (4, 2));
    }

    #[test]
    fn test_unterminated_comment_reads_to_end() {
        let mut tokenizer = Tokenizer::new(b"a /* never closed\n b c");
        let tokens: Vec<Token> = tokenizer.by_ref().collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(
            tokenizer.diagnostics(),
            &[LexDiagnostic {
                kind: LexDiagnosticKind::UnterminatedComment,
                line: 1
            }]
        );
    }

    #[test]
    fn test_unterminated_literal_stops_at_line_end() {
        let src = "#error don't\nclass A;";
        let mut tokenizer = Tokenizer::new(src.as_bytes());
        let tokens: Vec<String> = tokenizer
            .by_ref()
            .map(|t| t.text(src.as_bytes()).to_string())
            .collect();
        assert_eq!(tokens, vec!["#", "error", "don", "'t", "class", "A", ";"]);
        assert_eq!(
            tokenizer.diagnostics()[0].kind,
            LexDiagnosticKind::UnterminatedLiteral
        );
    }

    #[test]
    fn test_backslash_and_undefined() {
        let tokens = lex("#define X 1 \\\n @");
        assert_eq!(tokens[4].0, TokenKind::Symbol(Punct::Backslash));
        assert_eq!(tokens[5].0, TokenKind::Undefined);
    }
}
