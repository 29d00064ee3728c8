//! C/C++ lexer
//!
//! [`Tokenizer`] is the lazy token iterator; [`tokenize`] drains it into a
//! [`Lexed`] buffer for the scanner, which needs random access to look
//! backwards from a `(` or `{`.
//!
//! @module lex

pub mod token;
pub mod tokenizer;

pub use token::{Keyword, Punct, Token, TokenKind, SYMBOLS};
pub use tokenizer::{LexDiagnostic, LexDiagnosticKind, Tokenizer};

/// All tokens of one buffer plus the diagnostics raised while producing them
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<LexDiagnostic>,
}

/// Tokenize a whole buffer
pub fn tokenize(source: &[u8]) -> Lexed {
    let mut tokenizer = Tokenizer::new(source);
    let tokens: Vec<Token> = tokenizer.by_ref().collect();
    Lexed {
        tokens,
        diagnostics: tokenizer.into_diagnostics(),
    }
}
