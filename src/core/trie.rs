//! Generic prefix tree
//!
//! Keys are sequences of `K` (bytes for punctuation, token identities for
//! operator names, name segments for declarations). Nodes live in a flat
//! arena and refer to their children by index, so the trie can be built
//! incrementally and queried without recursion.
//!
//! @module core/trie

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

const ROOT: usize = 0;

#[derive(Debug, Clone)]
struct TrieNode<K, V> {
    children: HashMap<K, usize>,
    /// Present when a key ends at this node
    value: Option<V>,
}

impl<K, V> Default for TrieNode<K, V> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            value: None,
        }
    }
}

/// Prefix tree mapping key sequences to values
#[derive(Debug, Clone)]
pub struct Trie<K, V> {
    nodes: Vec<TrieNode<K, V>>,
    len: usize,
}

impl<K: Eq + Hash, V> Default for Trie<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> Trie<K, V> {
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            len: 0,
        }
    }

    /// Number of keys with a value
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert `value` at `key`, replacing any previous value
    pub fn insert<I: IntoIterator<Item = K>>(&mut self, key: I, value: V) -> Option<V> {
        let node = self.descend_or_create(key);
        let previous = self.nodes[node].value.replace(value);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Get the value at `key`, creating it with `make` if absent
    pub fn entry_or_insert_with<I, F>(&mut self, key: I, make: F) -> &mut V
    where
        I: IntoIterator<Item = K>,
        F: FnOnce() -> V,
    {
        let node = self.descend_or_create(key);
        if self.nodes[node].value.is_none() {
            self.len += 1;
        }
        self.nodes[node].value.get_or_insert_with(make)
    }

    /// Exact lookup
    pub fn get<'q, Q, I>(&self, key: I) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized + 'q,
        I: IntoIterator<Item = &'q Q>,
    {
        let mut node = ROOT;
        for part in key {
            node = *self.nodes[node].children.get(part)?;
        }
        self.nodes[node].value.as_ref()
    }

    /// Longest prefix of `key` that ends on a value.
    ///
    /// Walks as deep as the trie allows and remembers the last node that
    /// carried a value, which is the "extend greedily then back off to the
    /// last terminal" rule used for punctuation.
    pub fn longest_prefix<'q, Q, I>(&self, key: I) -> Option<(usize, &V)>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized + 'q,
        I: IntoIterator<Item = &'q Q>,
    {
        let mut node = ROOT;
        let mut best = None;
        for (depth, part) in key.into_iter().enumerate() {
            match self.nodes[node].children.get(part) {
                Some(&next) => node = next,
                None => break,
            }
            if let Some(value) = &self.nodes[node].value {
                best = Some((depth + 1, value));
            }
        }
        best
    }

    fn descend_or_create<I: IntoIterator<Item = K>>(&mut self, key: I) -> usize {
        let mut node = ROOT;
        for part in key {
            node = match self.nodes[node].children.get(&part) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(part, next);
                    next
                }
            };
        }
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut trie: Trie<u8, &str> = Trie::new();
        trie.insert(b">>".iter().copied(), "shr");
        trie.insert(b">".iter().copied(), "gt");

        assert_eq!(trie.get(b">>"), Some(&"shr"));
        assert_eq!(trie.get(b">"), Some(&"gt"));
        assert_eq!(trie.get(b">>>"), None);
        assert_eq!(trie.len(), 2);
    }

    #[test]
    fn test_longest_prefix_backs_off_to_terminal() {
        let mut trie: Trie<u8, u32> = Trie::new();
        trie.insert(b".".iter().copied(), 1);
        trie.insert(b"...".iter().copied(), 3);

        // ".." is an interior node only, so the match backs off to "."
        assert_eq!(trie.longest_prefix(b"..x"), Some((1, &1)));
        assert_eq!(trie.longest_prefix(b"...."), Some((3, &3)));
        assert_eq!(trie.longest_prefix(b"x"), None);
    }

    #[test]
    fn test_entry_accumulates() {
        let mut trie: Trie<String, Vec<u32>> = Trie::new();
        let key = || ["ns".to_string(), "Foo".to_string()];
        trie.entry_or_insert_with(key(), Vec::new).push(1);
        trie.entry_or_insert_with(key(), Vec::new).push(2);

        assert_eq!(trie.get(["ns", "Foo"]), Some(&vec![1, 2]));
        assert_eq!(trie.get(["ns"]), None);
        assert_eq!(trie.len(), 1);
    }
}
