//! Declaration / implementation scanner
//!
//! A single forward pass over one file's tokens with an explicit cursor.
//! Nesting is tracked with counters instead of recursion:
//!
//! - open parenthesis depth
//! - brace depth
//! - a stack of namespace scopes (brace depth + pushed segments)
//! - a stack of `extern "C"` blocks
//!
//! A construct is at *top level* when the brace depth equals the number of
//! open namespace and extern blocks. Declarations are only recognised at
//! top level; class bodies and function bodies are skipped over.
//!
//! @module scan/scanner

use std::path::Path;

use tracing::{debug, warn};

use super::name::QualifiedName;
use super::operators::operator_name_start;
use super::record::{FileRecord, IncludeDirective, IncludeKind};
use crate::core::error::{Error, Result};
use crate::lex::{Keyword, Punct, Token, TokenKind};

/// Single-word names that look like a call target but never name a function
const NOT_FUNCTION_NAMES: &[&str] = &[
    "void",
    "int",
    "char",
    "bool",
    "short",
    "long",
    "float",
    "double",
    "unsigned",
    "signed",
    "auto",
    "decltype",
    "sizeof",
    "alignof",
    "alignas",
    "static_assert",
    "noexcept",
    "requires",
    "__attribute__",
    "__declspec",
];

/// Words followed by `(` that may appear between a parameter list and its body
const TRAILING_CALL_WORDS: &[&str] = &[
    "noexcept",
    "decltype",
    "throw",
    "requires",
    "__attribute__",
    "__declspec",
    "alignas",
];

/// Words followed by a parenthesised group that may decorate a class head
const CLASS_ATTRIBUTE_WORDS: &[&str] = &["alignas", "__declspec", "__attribute__"];

#[derive(Debug, Clone, Copy)]
struct NamespaceScope {
    /// Brace depth right after the namespace's `{`
    depth: i32,
    /// Number of segments the namespace added to the current scope
    segments: usize,
}

/// What a `(` at top level turned out to start
enum Signature {
    /// `name(...) {`
    Implementation(QualifiedName),
    /// `name(...);`
    Declaration(QualifiedName),
}

/// Scanner state for one file
pub struct Scanner<'a> {
    path: &'a Path,
    source: &'a [u8],
    tokens: &'a [Token],
    pos: usize,
    parens: u32,
    braces: i32,
    namespaces: Vec<NamespaceScope>,
    externs: Vec<i32>,
    scope: QualifiedName,
    record: FileRecord,
}

/// Scan one file's tokens into a [`FileRecord`].
///
/// Fails only on brace underflow; the caller discards the partial facts.
pub fn scan(path: &Path, source: &[u8], tokens: &[Token]) -> Result<FileRecord> {
    Scanner::new(path, source, tokens).run()
}

impl<'a> Scanner<'a> {
    pub fn new(path: &'a Path, source: &'a [u8], tokens: &'a [Token]) -> Self {
        Self {
            path,
            source,
            tokens,
            pos: 0,
            parens: 0,
            braces: 0,
            namespaces: Vec::new(),
            externs: Vec::new(),
            scope: QualifiedName::new(),
            record: FileRecord::default(),
        }
    }

    pub fn run(mut self) -> Result<FileRecord> {
        while self.pos < self.tokens.len() {
            let token = self.tokens[self.pos];
            match token.kind {
                TokenKind::Symbol(Punct::Hash) => self.directive(),
                TokenKind::Symbol(Punct::LParen) => self.open_paren(),
                TokenKind::Symbol(Punct::RParen) => {
                    self.parens = self.parens.saturating_sub(1);
                    self.pos += 1;
                }
                TokenKind::Symbol(Punct::LBrace) => self.open_brace(),
                TokenKind::Symbol(Punct::RBrace) => self.close_brace()?,
                TokenKind::Keyword(Keyword::Using) => self.using(),
                TokenKind::Keyword(Keyword::Namespace) if self.at_top_level() => self.namespace(),
                TokenKind::Keyword(Keyword::Extern) if self.at_top_level() => self.extern_block(),
                TokenKind::Keyword(Keyword::Template) if self.at_top_level() => {
                    self.template_parameters()
                }
                _ => self.pos += 1,
            }
        }
        Ok(self.record)
    }

    #[inline]
    fn at_top_level(&self) -> bool {
        self.braces == (self.namespaces.len() + self.externs.len()) as i32
    }

    #[inline]
    fn text(&self, index: usize) -> &'a str {
        self.tokens[index].text(self.source)
    }

    #[inline]
    fn is(&self, index: usize, punct: Punct) -> bool {
        self.tokens.get(index).is_some_and(|t| t.is(punct))
    }

    // -------------------------------------------------------------------------
    // Braces and scopes
    // -------------------------------------------------------------------------

    fn open_brace(&mut self) {
        if self.at_top_level() && self.parens == 0 {
            self.class_head(self.pos);
        }
        self.braces += 1;
        self.pos += 1;
    }

    fn close_brace(&mut self) -> Result<()> {
        if let Some(ns) = self.namespaces.last().copied() {
            if ns.depth == self.braces {
                self.namespaces.pop();
                let keep = self.scope.len().saturating_sub(ns.segments);
                self.scope.truncate(keep);
            }
        }
        if self.externs.last() == Some(&self.braces) {
            self.externs.pop();
        }

        self.braces -= 1;
        if self.braces < 0 {
            return Err(Error::Parse {
                path: self.path.to_path_buf(),
                line: self.tokens[self.pos].line,
                message: "unmatched '}'".to_string(),
            });
        }
        self.pos += 1;
        Ok(())
    }

    /// `namespace a::b {`, `namespace {`, `namespace alias = x::y;`
    fn namespace(&mut self) {
        let mut segments = QualifiedName::new();
        let mut i = self.pos + 1;
        while let Some(token) = self.tokens.get(i) {
            match token.kind {
                TokenKind::Identifier => {
                    // C++20 `namespace a::inline b`
                    if self.text(i) != "inline" {
                        segments.push(self.text(i));
                    }
                }
                TokenKind::Symbol(Punct::ColonColon) => {}
                TokenKind::Symbol(Punct::LBrace) => {
                    self.braces += 1;
                    self.namespaces.push(NamespaceScope {
                        depth: self.braces,
                        segments: segments.len(),
                    });
                    self.scope.extend_from(&segments);
                    self.pos = i + 1;
                    return;
                }
                _ => break,
            }
            i += 1;
        }
        // alias or something unexpected: let the main loop continue after the keyword
        self.pos += 1;
    }

    /// `extern "C" {`; other uses of `extern` are ordinary tokens
    fn extern_block(&mut self) {
        let literal = self
            .tokens
            .get(self.pos + 1)
            .is_some_and(|t| t.kind == TokenKind::Literal);
        if literal && self.is(self.pos + 2, Punct::LBrace) {
            self.braces += 1;
            self.externs.push(self.braces);
            self.pos += 3;
        } else {
            self.pos += 1;
        }
    }

    /// Skip `template <...>` so parameter lists never look like declarations
    fn template_parameters(&mut self) {
        let open = self.pos + 1;
        if !self.is(open, Punct::Lt) {
            self.pos += 1;
            return;
        }
        self.pos = self.skip_angles(open, self.tokens.len());
    }

    /// `using namespace a::b;` anywhere in the file
    fn using(&mut self) {
        let next = self.pos + 1;
        let is_directive = self
            .tokens
            .get(next)
            .is_some_and(|t| t.is_keyword(Keyword::Namespace));
        if !is_directive {
            self.pos += 1;
            return;
        }

        let mut name = QualifiedName::new();
        let mut i = next + 1;
        while let Some(token) = self.tokens.get(i) {
            match token.kind {
                TokenKind::Identifier => name.push(self.text(i)),
                TokenKind::Symbol(Punct::ColonColon) => {}
                _ => break,
            }
            i += 1;
        }
        if !name.is_empty() {
            self.record.using_namespaces.push(name);
        }
        self.pos = i;
    }

    // -------------------------------------------------------------------------
    // Preprocessor
    // -------------------------------------------------------------------------

    /// Index of the first token after the logical line containing `from`,
    /// following backslash continuations.
    fn end_of_line(&self, from: usize) -> usize {
        let Some(first) = self.tokens.get(from) else {
            return self.tokens.len();
        };
        let mut line = first.line;
        let mut i = from;
        while i < self.tokens.len() {
            let token = self.tokens[i];
            if token.line != line {
                let continued = i > from && self.tokens[i - 1].is(Punct::Backslash);
                if !continued {
                    break;
                }
                line = token.line;
            }
            i += 1;
        }
        i
    }

    /// True when `tokens[i]` is a `#` that starts its line
    fn is_directive_start(&self, i: usize) -> bool {
        self.is(i, Punct::Hash) && (i == 0 || self.tokens[i - 1].line < self.tokens[i].line)
    }

    /// Directive name following the `#` at `hash`, if on the same line
    fn directive_name(&self, hash: usize) -> Option<&'a str> {
        let next = self.tokens.get(hash + 1)?;
        (next.line == self.tokens[hash].line).then(|| next.text(self.source))
    }

    fn directive(&mut self) {
        let hash = self.pos;
        let line_end = self.end_of_line(hash);
        match self.directive_name(hash) {
            Some("include") => {
                self.include(hash + 2, line_end);
                self.pos = line_end;
            }
            Some("if") if self.is_constant_false(hash + 2, line_end) => {
                self.pos = self.skip_disabled_branch(line_end);
            }
            Some("else") | Some("elif") => {
                self.pos = self.skip_to_endif(line_end);
            }
            _ => self.pos = line_end,
        }
    }

    /// `#if 0` / `#if false`
    fn is_constant_false(&self, from: usize, line_end: usize) -> bool {
        from + 1 == line_end && matches!(self.text(from), "0" | "false")
    }

    /// Skip the body of `#if 0`; parsing resumes after the matching `#else`,
    /// `#elif` or `#endif` line.
    fn skip_disabled_branch(&self, from: usize) -> usize {
        self.skip_conditional(from, &["else", "elif", "endif"])
    }

    /// Skip an `#else` / `#elif` branch of a conditional whose first branch was parsed
    fn skip_to_endif(&self, from: usize) -> usize {
        self.skip_conditional(from, &["endif"])
    }

    fn skip_conditional(&self, from: usize, stop_at: &[&str]) -> usize {
        let mut depth = 0usize;
        let mut i = from;
        while i < self.tokens.len() {
            if !self.is_directive_start(i) {
                i += 1;
                continue;
            }
            let line_end = self.end_of_line(i);
            match self.directive_name(i) {
                Some("if") | Some("ifdef") | Some("ifndef") => depth += 1,
                Some("endif") if depth > 0 => depth -= 1,
                Some(name) if depth == 0 && stop_at.contains(&name) => return line_end,
                _ => {}
            }
            i = line_end;
        }
        self.tokens.len()
    }

    /// Parse the operand of `#include` spanning `tokens[from..line_end]`
    fn include(&mut self, from: usize, line_end: usize) {
        let line = self.tokens[from.saturating_sub(1)].line;
        let parsed = match self.tokens.get(from) {
            Some(token) if from < line_end && token.kind == TokenKind::Literal => {
                let text = token.text(self.source);
                text.strip_prefix('"')
                    .and_then(|s| s.strip_suffix('"'))
                    .filter(|s| !s.is_empty())
                    .map(|s| IncludeDirective::new(s, IncludeKind::Quoted, line))
            }
            Some(token) if from < line_end && token.is(Punct::Lt) => (from + 1..line_end)
                .find(|&i| self.tokens[i].is(Punct::Gt))
                .and_then(|close| {
                    let start = self.tokens[from].end as usize;
                    let end = self.tokens[close].start as usize;
                    let inner = std::str::from_utf8(&self.source[start..end]).ok()?.trim();
                    (!inner.is_empty())
                        .then(|| IncludeDirective::new(inner, IncludeKind::Angled, line))
                }),
            Some(token) if from < line_end && token.is_identifier() => {
                debug!(path = %self.path.display(), line, "Skipping computed #include");
                return;
            }
            _ => None,
        };

        match parsed {
            Some(directive) => self.record.includes.push(directive),
            None => warn!(
                path = %self.path.display(),
                line,
                "Malformed #include directive dropped"
            ),
        }
    }

    // -------------------------------------------------------------------------
    // Functions
    // -------------------------------------------------------------------------

    fn open_paren(&mut self) {
        let open = self.pos;
        if self.at_top_level() && self.parens == 0 && open > 0 {
            // the `()` of `operator()` is part of the name
            if self.tokens[open - 1].is_keyword(Keyword::Operator) && self.is(open + 1, Punct::RParen)
            {
                self.pos += 2;
                return;
            }
            if let Some((signature, terminator)) = self.signature(open) {
                match signature {
                    Signature::Implementation(name) => {
                        self.record.implements.insert(name);
                    }
                    Signature::Declaration(name) => {
                        self.record.functions.insert(name);
                    }
                }
                self.pos = terminator;
                return;
            }
        }
        self.parens += 1;
        self.pos += 1;
    }

    /// Classify the `(` at `open` and return the index of the `{` or `;` that
    /// ends the signature.
    fn signature(&self, open: usize) -> Option<(Signature, usize)> {
        let start = self.name_start(open - 1, true)?;
        if !self.may_precede_name(start) {
            return None;
        }

        let (name, global) = self.parse_name(start, open);
        if name.is_empty() || (name.len() == 1 && NOT_FUNCTION_NAMES.contains(&name.segments()[0].as_str())) {
            return None;
        }

        let close = self.matching_paren(open)?;
        let terminator = self.signature_end(close + 1)?;
        let qualified = name.len() > 1;
        let name = if global { name } else { name.prepended(&self.scope) };

        if self.is(terminator, Punct::LBrace) {
            return Some((Signature::Implementation(name), terminator));
        }
        // `Foo::Foo() = default;` defines the member; `f() = delete;` declares nothing
        match (self.is_defaulted_or_deleted(terminator), qualified) {
            (true, true) => Some((Signature::Implementation(name), terminator)),
            (false, false) => Some((Signature::Declaration(name), terminator)),
            _ => None,
        }
    }

    /// True when the `;` at `semi` follows `= default` or `= delete`
    fn is_defaulted_or_deleted(&self, semi: usize) -> bool {
        let Some(word) = semi.checked_sub(1) else {
            return false;
        };
        let token = self.tokens[word];
        let is_word = token.is_keyword(Keyword::Delete)
            || (token.is_identifier() && self.text(word) == "default");
        is_word && word >= 1 && self.is(word - 1, Punct::Eq)
    }

    /// Tokens that may sit right before a declared name: start of file, a
    /// type word, pointer/reference declarators, the end of a template
    /// argument list or of a previous statement.
    fn may_precede_name(&self, start: usize) -> bool {
        if start == 0 {
            return true;
        }
        let token = self.tokens[start - 1];
        match token.kind {
            TokenKind::Identifier | TokenKind::Keyword(_) => true,
            TokenKind::Symbol(p) => matches!(
                p,
                Punct::Star
                    | Punct::Amp
                    | Punct::AmpAmp
                    | Punct::Gt
                    | Punct::Shr
                    | Punct::Semi
                    | Punct::LBrace
                    | Punct::RBrace
                    | Punct::RBracket
                    | Punct::RParen
            ),
            _ => false,
        }
    }

    fn matching_paren(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in open..self.tokens.len() {
            match self.tokens[i].kind {
                TokenKind::Symbol(Punct::LParen) => depth += 1,
                TokenKind::Symbol(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Symbol(Punct::LBrace | Punct::RBrace | Punct::Semi) => return None,
                _ => {}
            }
        }
        None
    }

    /// First `{` or `;` after a parameter list, outside nested parentheses.
    /// Gives up on anything that starts a new top-level construct, including
    /// another `type name(` signature (the first parenthesis was then an
    /// unterminated macro call such as `DECLARE_THING(x)`).
    fn signature_end(&self, from: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in from..self.tokens.len() {
            let token = self.tokens[i];
            if depth == 0 && self.starts_signature(i) {
                return None;
            }
            match token.kind {
                TokenKind::Symbol(Punct::LParen) => depth += 1,
                TokenKind::Symbol(Punct::RParen) => depth = depth.saturating_sub(1),
                TokenKind::Symbol(Punct::LBrace | Punct::Semi) if depth == 0 => return Some(i),
                TokenKind::Symbol(Punct::RBrace | Punct::Hash) => return None,
                TokenKind::Keyword(
                    Keyword::Namespace
                    | Keyword::Class
                    | Keyword::Struct
                    | Keyword::Union
                    | Keyword::Extern
                    | Keyword::Template
                    | Keyword::Using,
                ) => return None,
                _ => {}
            }
        }
        None
    }

    /// `type name(` at `i`: an identifier followed by `(` and preceded by a
    /// type word. Exception specifications, trailing return types and
    /// initializer lists never match.
    fn starts_signature(&self, i: usize) -> bool {
        let token = self.tokens[i];
        if !token.is_identifier() || !self.is(i + 1, Punct::LParen) || i == 0 {
            return false;
        }
        if TRAILING_CALL_WORDS.contains(&self.text(i)) {
            return false;
        }
        matches!(
            self.tokens[i - 1].kind,
            TokenKind::Identifier | TokenKind::Keyword(_)
        )
    }

    // -------------------------------------------------------------------------
    // Classes
    // -------------------------------------------------------------------------

    /// Inspect the tokens before a top-level `{` for `class Name [final] [: bases]`
    fn class_head(&mut self, brace: usize) {
        let mut bases: Vec<QualifiedName> = Vec::new();
        let mut end = match brace.checked_sub(1) {
            Some(end) => end,
            None => return,
        };

        loop {
            if self.tokens[end].is_keyword(Keyword::Final) {
                end = match end.checked_sub(1) {
                    Some(end) => end,
                    None => return,
                };
            }
            let Some(start) = self.name_start(end, false) else {
                return;
            };
            let Some(before) = start.checked_sub(1) else {
                return;
            };
            let (name, _) = self.parse_name(start, end + 1);
            if name.is_empty() {
                return;
            }

            let token = self.tokens[before];
            match token.kind {
                TokenKind::Keyword(k) if k.is_access_specifier() => {}
                TokenKind::Symbol(Punct::Colon | Punct::Comma) => {}
                _ => {
                    let Some(key) = self.decorated_class_key(before) else {
                        return;
                    };
                    let is_enum = key > 0 && self.tokens[key - 1].is_keyword(Keyword::Enum);
                    if !is_enum {
                        self.record.classes.insert(name.prepended(&self.scope));
                        self.record.inherits.extend(bases);
                    }
                    return;
                }
            }

            // `name` is a base class: step over specifiers to the separator
            bases.push(name);
            let mut sep = before;
            while self.tokens[sep].keyword().is_some_and(|k| k.is_access_specifier()) {
                sep = match sep.checked_sub(1) {
                    Some(sep) => sep,
                    None => return,
                };
            }
            if !(self.tokens[sep].is(Punct::Colon) || self.tokens[sep].is(Punct::Comma)) {
                return;
            }
            end = match sep.checked_sub(1) {
                Some(end) => end,
                None => return,
            };
        }
    }

    /// Walk left from `i` over what may sit between a class key and the
    /// class name: export macros (`MYLIB_API`), `[[...]]` attributes and
    /// `alignas(...)`, `__declspec(...)`, `__attribute__((...))` groups.
    /// Returns the index of the class key.
    fn decorated_class_key(&self, mut i: usize) -> Option<usize> {
        loop {
            let token = self.tokens[i];
            match token.kind {
                TokenKind::Keyword(k) if k.is_class_key() => return Some(i),
                TokenKind::Identifier if is_macro_name(self.text(i)) => {}
                TokenKind::Symbol(Punct::RBracket) => i = self.attribute_open(i)?,
                TokenKind::Symbol(Punct::RParen) => {
                    let word = self.matching_open_paren(i)?.checked_sub(1)?;
                    if !CLASS_ATTRIBUTE_WORDS.contains(&self.text(word)) {
                        return None;
                    }
                    i = word;
                }
                _ => return None,
            }
            i = i.checked_sub(1)?;
        }
    }

    /// First `[` of the `[[...]]` group closing at `close`
    fn attribute_open(&self, close: usize) -> Option<usize> {
        if !self.is(close.checked_sub(1)?, Punct::RBracket) {
            return None;
        }
        let mut i = close.checked_sub(2)?;
        loop {
            match self.tokens[i].kind {
                TokenKind::Symbol(Punct::LBracket) if i >= 1 && self.is(i - 1, Punct::LBracket) => {
                    return Some(i - 1);
                }
                TokenKind::Symbol(Punct::Semi | Punct::LBrace | Punct::RBrace) => return None,
                _ => {}
            }
            i = i.checked_sub(1)?;
        }
    }

    /// Walk left from the `)` at `close` to its `(`
    fn matching_open_paren(&self, close: usize) -> Option<usize> {
        let mut depth = 0usize;
        for i in (0..=close).rev() {
            match self.tokens[i].kind {
                TokenKind::Symbol(Punct::RParen) => depth += 1,
                TokenKind::Symbol(Punct::LParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Symbol(Punct::Semi | Punct::LBrace | Punct::RBrace) => return None,
                _ => {}
            }
        }
        None
    }

    // -------------------------------------------------------------------------
    // Names
    // -------------------------------------------------------------------------

    /// Walk left from `end` over one qualified name and return its first index.
    /// With `operators`, the last segment may be an operator overload.
    fn name_start(&self, end: usize, operators: bool) -> Option<usize> {
        let mut segment_end = end;
        let mut allow_operator = operators;
        loop {
            let start = self.segment_start(segment_end, allow_operator)?;
            allow_operator = false;
            if start >= 1 && self.is(start - 1, Punct::ColonColon) {
                if start >= 2 && self.segment_start(start - 2, false).is_some() {
                    segment_end = start - 2;
                    continue;
                }
                // leading `::`
                return Some(start - 1);
            }
            return Some(start);
        }
    }

    /// First index of the name segment ending at `end`
    fn segment_start(&self, end: usize, operators: bool) -> Option<usize> {
        let token = self.tokens[end];
        match token.kind {
            TokenKind::Identifier => {
                if end >= 1 {
                    let prev = self.tokens[end - 1];
                    // `~Foo` and `operator bool`
                    if prev.is(Punct::Tilde) || prev.is_keyword(Keyword::Operator) {
                        return Some(end - 1);
                    }
                }
                Some(end)
            }
            TokenKind::Symbol(_) | TokenKind::Keyword(Keyword::New | Keyword::Delete) => {
                if operators {
                    if let Some(start) = operator_name_start(self.tokens, end) {
                        return Some(start);
                    }
                }
                if token.is(Punct::Gt) || token.is(Punct::Shr) {
                    let lt = self.matching_lt(end)?;
                    let template = lt.checked_sub(1)?;
                    if self.tokens[template].is_identifier() {
                        return self.segment_start(template, false);
                    }
                }
                None
            }
            _ => None,
        }
    }

    /// Walk left from a `>` / `>>` to the `<` that opens the argument list
    fn matching_lt(&self, close: usize) -> Option<usize> {
        let mut depth: i32 = 0;
        let mut parens = 0usize;
        for i in (0..=close).rev() {
            match self.tokens[i].kind {
                TokenKind::Symbol(Punct::RParen) => parens += 1,
                TokenKind::Symbol(Punct::LParen) => {
                    if parens == 0 {
                        return None;
                    }
                    parens -= 1;
                }
                TokenKind::Symbol(Punct::Gt) if parens == 0 => depth += 1,
                TokenKind::Symbol(Punct::Shr) if parens == 0 => depth += 2,
                TokenKind::Symbol(Punct::Lt) if parens == 0 => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Symbol(Punct::Semi | Punct::LBrace | Punct::RBrace) => return None,
                _ => {}
            }
        }
        None
    }

    /// Skip a template argument list opening at `open` (a `<`). Parentheses
    /// are balanced separately; a `)` that closes a paren opened before the
    /// `<`, or running out of tokens, means the `<` was a comparison and only
    /// the `<` itself is skipped.
    fn skip_angles(&self, open: usize, limit: usize) -> usize {
        let mut depth: i32 = 0;
        let mut parens = 0usize;
        for i in open..limit {
            match self.tokens[i].kind {
                TokenKind::Symbol(Punct::LParen) => parens += 1,
                TokenKind::Symbol(Punct::RParen) => {
                    if parens == 0 {
                        return open + 1;
                    }
                    parens -= 1;
                }
                TokenKind::Symbol(Punct::Lt) if parens == 0 => depth += 1,
                TokenKind::Symbol(Punct::Gt) if parens == 0 => depth -= 1,
                TokenKind::Symbol(Punct::Shr) if parens == 0 => depth -= 2,
                TokenKind::Symbol(Punct::Semi | Punct::LBrace | Punct::RBrace) => return open + 1,
                _ => {}
            }
            if depth <= 0 && i > open {
                return i + 1;
            }
        }
        open + 1
    }

    /// Parse `tokens[start..end]` as a qualified name. Returns the name and
    /// whether it was written with a leading `::`.
    fn parse_name(&self, start: usize, end: usize) -> (QualifiedName, bool) {
        let mut name = QualifiedName::new();
        let global = self.is(start, Punct::ColonColon);
        let mut i = start;
        while i < end {
            let token = self.tokens[i];
            match token.kind {
                TokenKind::Identifier => {
                    name.push(self.text(i));
                    i += 1;
                    if self.is(i, Punct::Lt) {
                        i = self.skip_angles(i, end);
                    }
                }
                TokenKind::Symbol(Punct::Tilde) if i + 1 < end => {
                    name.push(format!("~{}", self.text(i + 1)));
                    i += 2;
                }
                TokenKind::Keyword(Keyword::Operator) => {
                    name.push(self.operator_spelling(i + 1, end));
                    i = end;
                }
                TokenKind::Symbol(Punct::Lt) => i = self.skip_angles(i, end),
                _ => i += 1,
            }
        }
        (name, global)
    }

    /// `operator+`, `operator()`, `operator new[]`, `operator bool`
    fn operator_spelling(&self, from: usize, end: usize) -> String {
        let mut spelling = String::from("operator");
        for i in from..end {
            let token = self.tokens[i];
            if matches!(token.kind, TokenKind::Identifier | TokenKind::Keyword(_)) {
                spelling.push(' ');
            }
            spelling.push_str(self.text(i));
        }
        spelling
    }
}

/// `MYLIB_API`, `EXPORT2`: upper case, digits and underscores
fn is_macro_name(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_uppercase())
        && text
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}
