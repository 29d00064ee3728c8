//! Qualified names (`ns::Class::method`)
//!
//! @module scan/name

use std::fmt;

use compact_str::CompactString;
use smallvec::SmallVec;

/// Scope separator used when joining and splitting names
pub const SEPARATOR: &str = "::";

/// Ordered name segments. Equality and ordering are segment-wise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    segments: SmallVec<[CompactString; 4]>,
}

impl QualifiedName {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a joined name (`a::b::c`). Empty segments are dropped, so a
    /// leading `::` yields the same name as without it.
    pub fn parse(joined: &str) -> Self {
        joined
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn segments(&self) -> &[CompactString] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn push(&mut self, segment: impl Into<CompactString>) {
        self.segments.push(segment.into());
    }

    /// Remove the last segment
    pub fn pop(&mut self) -> Option<CompactString> {
        self.segments.pop()
    }

    /// Drop segments until `len` remain
    pub fn truncate(&mut self, len: usize) {
        self.segments.truncate(len);
    }

    /// Append all segments of `other`
    pub fn extend_from(&mut self, other: &QualifiedName) {
        self.segments.extend(other.segments.iter().cloned());
    }

    /// `prefix::self`
    pub fn prepended(&self, prefix: &QualifiedName) -> QualifiedName {
        let mut out = prefix.clone();
        out.extend_from(self);
        out
    }

    /// All segments but the last (the enclosing scope)
    pub fn parent(&self) -> QualifiedName {
        let mut out = self.clone();
        out.pop();
        out
    }

    pub fn join(&self) -> String {
        self.segments.join(SEPARATOR)
    }
}

impl<S: Into<CompactString>> FromIterator<S> for QualifiedName {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            segments: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.join())
    }
}
