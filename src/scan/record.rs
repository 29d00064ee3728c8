//! Per-file facts produced by the scanner
//!
//! @module scan/record

use std::collections::BTreeSet;
use std::fmt;

use super::name::QualifiedName;

/// How an include names its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncludeKind {
    /// `#include "x.h"`: containing directory first
    Quoted,
    /// `#include <x.h>`: include directories first
    Angled,
}

/// One `#include` directive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IncludeDirective {
    pub filename: String,
    pub kind: IncludeKind,
    /// Source line, 0 when restored from a snapshot
    pub line: u32,
}

impl IncludeDirective {
    pub fn new(filename: impl Into<String>, kind: IncludeKind, line: u32) -> Self {
        Self {
            filename: filename.into(),
            kind,
            line,
        }
    }

    /// Path segments of the filename (`a/b.h` -> `a`, `b.h`)
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.filename
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
    }

    /// The filename with its delimiters, as written in the source and in snapshots
    pub fn spelling(&self) -> String {
        match self.kind {
            IncludeKind::Quoted => format!("\"{}\"", self.filename),
            IncludeKind::Angled => format!("<{}>", self.filename),
        }
    }

    /// Inverse of [`IncludeDirective::spelling`]; undelimited text is taken as quoted
    pub fn from_spelling(spelling: &str) -> Self {
        let spelling = spelling.trim();
        if let Some(inner) = spelling.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
            return Self::new(inner, IncludeKind::Angled, 0);
        }
        let inner = spelling
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(spelling);
        Self::new(inner, IncludeKind::Quoted, 0)
    }
}

impl fmt::Display for IncludeDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spelling())
    }
}

/// Facts discovered in one regular file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRecord {
    pub includes: Vec<IncludeDirective>,
    /// Functions and methods with a body in this file
    pub implements: BTreeSet<QualifiedName>,
    /// Base classes named in inheritance clauses
    pub inherits: BTreeSet<QualifiedName>,
    /// Classes, structs and unions defined at namespace level
    pub classes: BTreeSet<QualifiedName>,
    /// Free functions declared (without body) at namespace level
    pub functions: BTreeSet<QualifiedName>,
    /// `using namespace` targets, file-wide regardless of the enclosing braces
    pub using_namespaces: Vec<QualifiedName>,
}

impl FileRecord {
    pub fn is_empty(&self) -> bool {
        self.includes.is_empty()
            && self.implements.is_empty()
            && self.inherits.is_empty()
            && self.classes.is_empty()
            && self.functions.is_empty()
            && self.using_namespaces.is_empty()
    }

    /// True if the file implements the free function `main`
    pub fn implements_main(&self) -> bool {
        self.implements
            .iter()
            .any(|name| name.len() == 1 && name.last() == Some("main"))
    }
}
