//! Overloadable operator names
//!
//! The scanner meets an operator overload from the right: it stands on the
//! token before `(` and has to find out whether the tokens to its left spell
//! `operator <op>`. The table is therefore a trie over the *reversed* token
//! sequence of every overloadable operator.
//!
//! @module scan/operators

use once_cell::sync::Lazy;

use crate::core::trie::Trie;
use crate::lex::{Keyword, Punct, Token, TokenKind};

/// One element of an operator spelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpPart {
    Punct(Punct),
    New,
    Delete,
}

impl OpPart {
    pub fn of(token: &Token) -> Option<Self> {
        match token.kind {
            TokenKind::Symbol(p) => Some(Self::Punct(p)),
            TokenKind::Keyword(Keyword::New) => Some(Self::New),
            TokenKind::Keyword(Keyword::Delete) => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Longest operator spelling in tokens (`delete [ ]`)
pub const MAX_OPERATOR_TOKENS: usize = 3;

const OVERLOADABLE: &[&[OpPart]] = {
    use OpPart::{Delete, New, Punct as P};
    use Punct::*;
    &[
        &[P(Plus)],
        &[P(Minus)],
        &[P(Star)],
        &[P(Slash)],
        &[P(Percent)],
        &[P(Caret)],
        &[P(Amp)],
        &[P(Pipe)],
        &[P(Tilde)],
        &[P(Bang)],
        &[P(Eq)],
        &[P(Lt)],
        &[P(Gt)],
        &[P(PlusEq)],
        &[P(MinusEq)],
        &[P(StarEq)],
        &[P(SlashEq)],
        &[P(PercentEq)],
        &[P(CaretEq)],
        &[P(AmpEq)],
        &[P(PipeEq)],
        &[P(Shl)],
        &[P(Shr)],
        &[P(ShlEq)],
        &[P(ShrEq)],
        &[P(EqEq)],
        &[P(BangEq)],
        &[P(Le)],
        &[P(Ge)],
        &[P(Spaceship)],
        &[P(AmpAmp)],
        &[P(PipePipe)],
        &[P(PlusPlus)],
        &[P(MinusMinus)],
        &[P(Comma)],
        &[P(ArrowStar)],
        &[P(Arrow)],
        &[P(LParen), P(RParen)],
        &[P(LBracket), P(RBracket)],
        &[New],
        &[Delete],
        &[New, P(LBracket), P(RBracket)],
        &[Delete, P(LBracket), P(RBracket)],
    ]
};

/// Reversed operator spellings
pub static REVERSED_OPERATORS: Lazy<Trie<OpPart, ()>> = Lazy::new(|| {
    let mut trie = Trie::new();
    for spelling in OVERLOADABLE {
        trie.insert(spelling.iter().rev().copied(), ());
    }
    trie
});

/// If `tokens[..=end]` ends with `operator <op>`, return the index of the
/// `operator` keyword.
pub fn operator_name_start(tokens: &[Token], end: usize) -> Option<usize> {
    let reversed: Vec<OpPart> = tokens[..=end]
        .iter()
        .rev()
        .take(MAX_OPERATOR_TOKENS)
        .map_while(OpPart::of)
        .collect();
    let (len, _) = REVERSED_OPERATORS.longest_prefix(&reversed)?;
    let keyword = end.checked_sub(len)?;
    tokens[keyword]
        .is_keyword(Keyword::Operator)
        .then_some(keyword)
}
