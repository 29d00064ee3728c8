//! Token types for the C/C++ lexer
//!
//! Tokens are small `Copy` records pointing back into the source buffer by
//! byte span; the text is recovered with [`Token::text`].
//!
//! @module lex/token

use once_cell::sync::Lazy;

use crate::core::trie::Trie;

// =============================================================================
// KEYWORDS
// =============================================================================

/// Words the scanner reacts to. Everything else textual is an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Class,
    Struct,
    Union,
    Enum,
    Namespace,
    Using,
    Extern,
    Template,
    Typename,
    Include,
    Operator,
    Public,
    Protected,
    Private,
    Virtual,
    Friend,
    Final,
    Typedef,
    New,
    Delete,
}

impl Keyword {
    /// Fixed keyword table
    pub fn lookup(word: &str) -> Option<Self> {
        Some(match word {
            "class" => Self::Class,
            "struct" => Self::Struct,
            "union" => Self::Union,
            "enum" => Self::Enum,
            "namespace" => Self::Namespace,
            "using" => Self::Using,
            "extern" => Self::Extern,
            "template" => Self::Template,
            "typename" => Self::Typename,
            "include" => Self::Include,
            "operator" => Self::Operator,
            "public" => Self::Public,
            "protected" => Self::Protected,
            "private" => Self::Private,
            "virtual" => Self::Virtual,
            "friend" => Self::Friend,
            "final" => Self::Final,
            "typedef" => Self::Typedef,
            "new" => Self::New,
            "delete" => Self::Delete,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::Namespace => "namespace",
            Self::Using => "using",
            Self::Extern => "extern",
            Self::Template => "template",
            Self::Typename => "typename",
            Self::Include => "include",
            Self::Operator => "operator",
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
            Self::Virtual => "virtual",
            Self::Friend => "friend",
            Self::Final => "final",
            Self::Typedef => "typedef",
            Self::New => "new",
            Self::Delete => "delete",
        }
    }

    /// `public`, `protected`, `private` (and `virtual`, which may sit in the same slot of a base list)
    pub fn is_access_specifier(&self) -> bool {
        matches!(
            self,
            Self::Public | Self::Protected | Self::Private | Self::Virtual
        )
    }

    pub fn is_class_key(&self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Union)
    }
}

// =============================================================================
// PUNCTUATION
// =============================================================================

/// Operators and punctuation, including the comment openers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Semi,
    Comma,
    Colon,
    ColonColon,
    Dot,
    DotStar,
    Ellipsis,
    Question,
    Tilde,
    Bang,
    Plus,
    PlusPlus,
    PlusEq,
    Minus,
    MinusMinus,
    MinusEq,
    Arrow,
    ArrowStar,
    Star,
    StarEq,
    Slash,
    SlashEq,
    Percent,
    PercentEq,
    Caret,
    CaretEq,
    Amp,
    AmpAmp,
    AmpEq,
    Pipe,
    PipePipe,
    PipeEq,
    Eq,
    EqEq,
    BangEq,
    Lt,
    Le,
    Shl,
    ShlEq,
    Spaceship,
    Gt,
    Ge,
    Shr,
    ShrEq,
    Hash,
    HashHash,
    Backslash,
    Quote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

/// Spelling of every punctuation token
const PUNCTUATION: &[(&str, Punct)] = &[
    ("(", Punct::LParen),
    (")", Punct::RParen),
    ("[", Punct::LBracket),
    ("]", Punct::RBracket),
    ("{", Punct::LBrace),
    ("}", Punct::RBrace),
    (";", Punct::Semi),
    (",", Punct::Comma),
    (":", Punct::Colon),
    ("::", Punct::ColonColon),
    (".", Punct::Dot),
    (".*", Punct::DotStar),
    ("...", Punct::Ellipsis),
    ("?", Punct::Question),
    ("~", Punct::Tilde),
    ("!", Punct::Bang),
    ("+", Punct::Plus),
    ("++", Punct::PlusPlus),
    ("+=", Punct::PlusEq),
    ("-", Punct::Minus),
    ("--", Punct::MinusMinus),
    ("-=", Punct::MinusEq),
    ("->", Punct::Arrow),
    ("->*", Punct::ArrowStar),
    ("*", Punct::Star),
    ("*=", Punct::StarEq),
    ("/", Punct::Slash),
    ("/=", Punct::SlashEq),
    ("%", Punct::Percent),
    ("%=", Punct::PercentEq),
    ("^", Punct::Caret),
    ("^=", Punct::CaretEq),
    ("&", Punct::Amp),
    ("&&", Punct::AmpAmp),
    ("&=", Punct::AmpEq),
    ("|", Punct::Pipe),
    ("||", Punct::PipePipe),
    ("|=", Punct::PipeEq),
    ("=", Punct::Eq),
    ("==", Punct::EqEq),
    ("!=", Punct::BangEq),
    ("<", Punct::Lt),
    ("<=", Punct::Le),
    ("<<", Punct::Shl),
    ("<<=", Punct::ShlEq),
    ("<=>", Punct::Spaceship),
    (">", Punct::Gt),
    (">=", Punct::Ge),
    (">>", Punct::Shr),
    (">>=", Punct::ShrEq),
    ("#", Punct::Hash),
    ("##", Punct::HashHash),
    ("\\", Punct::Backslash),
    ("'", Punct::Quote),
    ("\"", Punct::DoubleQuote),
    ("//", Punct::LineComment),
    ("/*", Punct::BlockComment),
];

/// Byte trie over [`PUNCTUATION`] for longest-match recognition
pub static SYMBOLS: Lazy<Trie<u8, Punct>> = Lazy::new(|| {
    let mut trie = Trie::new();
    for (spelling, punct) in PUNCTUATION {
        trie.insert(spelling.bytes(), *punct);
    }
    trie
});

impl Punct {
    pub fn as_str(&self) -> &'static str {
        PUNCTUATION
            .iter()
            .find(|(_, p)| p == self)
            .map(|(s, _)| *s)
            .unwrap_or("")
    }

    /// Bytes that can start a punctuation run
    pub fn starts_symbol(byte: u8) -> bool {
        byte.is_ascii_punctuation()
    }
}

// =============================================================================
// TOKEN
// =============================================================================

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword(Keyword),
    Symbol(Punct),
    /// String or character literal, quotes included
    Literal,
    /// Bytes no other class accepts (non-ASCII, `@`, `$`, backtick)
    Undefined,
}

/// A lexeme with its byte span and 1-based source position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub column: u32,
}

impl Token {
    #[inline]
    pub fn text<'a>(&self, source: &'a [u8]) -> &'a str {
        std::str::from_utf8(&source[self.start as usize..self.end as usize]).unwrap_or("")
    }

    #[inline]
    pub fn is(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Symbol(punct)
    }

    #[inline]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    #[inline]
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn punct(&self) -> Option<Punct> {
        match self.kind {
            TokenKind::Symbol(p) => Some(p),
            _ => None,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            TokenKind::Keyword(k) => Some(k),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table() {
        assert_eq!(Keyword::lookup("namespace"), Some(Keyword::Namespace));
        assert_eq!(Keyword::lookup("Namespace"), None);
        assert_eq!(Keyword::lookup("foo"), None);
        assert!(Keyword::Private.is_access_specifier());
        assert!(Keyword::Union.is_class_key());
        assert!(!Keyword::Enum.is_class_key());
    }

    #[test]
    fn test_symbol_trie_spellings() {
        for (spelling, punct) in PUNCTUATION {
            assert_eq!(SYMBOLS.get(spelling.as_bytes()), Some(punct));
            assert_eq!(punct.as_str(), *spelling);
        }
        assert_eq!(SYMBOLS.get(b".."), None);
    }
}
