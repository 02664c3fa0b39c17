//! Reversed-label domain trie.
//!
//! `www.evilcorp.com` is stored along the path `com -> evilcorp -> www`.
//! A lookup walks the query's labels from the right and keeps the deepest
//! node holding a value, so one lookup per domain level finds the most
//! specific stored suffix.

use std::collections::HashMap;

#[derive(Debug, Clone)]
struct DomainNode<T> {
    children: HashMap<String, DomainNode<T>>,
    value: Option<T>,
}

impl<T> Default for DomainNode<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            value: None,
        }
    }
}

/// Domain suffix trie. Keys are expected to be lowercased.
#[derive(Debug, Clone)]
pub struct DomainTrie<T> {
    root: DomainNode<T>,
    len: usize,
}

impl<T> Default for DomainTrie<T> {
    fn default() -> Self {
        Self {
            root: DomainNode::default(),
            len: 0,
        }
    }
}

impl<T> DomainTrie<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `domain`, returning the previous value if any.
    pub fn insert(&mut self, domain: &str, value: T) -> Option<T> {
        let mut node = &mut self.root;
        for label in labels(domain) {
            node = node.children.entry(label.to_string()).or_default();
        }
        let old = node.value.replace(value);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Value stored under the longest suffix of `domain`.
    pub fn search(&self, domain: &str) -> Option<&T> {
        let mut node = &self.root;
        let mut best = node.value.as_ref();

        for label in labels(domain) {
            match node.children.get(label) {
                Some(child) => {
                    node = child;
                    if node.value.is_some() {
                        best = node.value.as_ref();
                    }
                }
                None => break,
            }
        }

        best
    }

    /// Value stored under exactly `domain`.
    pub fn get(&self, domain: &str) -> Option<&T> {
        let mut node = &self.root;
        for label in labels(domain) {
            node = node.children.get(label)?;
        }
        node.value.as_ref()
    }

    pub fn get_mut(&mut self, domain: &str) -> Option<&mut T> {
        let mut node = &mut self.root;
        for label in labels(domain) {
            node = node.children.get_mut(label)?;
        }
        node.value.as_mut()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Labels from the top-level domain down, skipping empty labels.
fn labels(domain: &str) -> impl Iterator<Item = &str> {
    domain.rsplit('.').filter(|l| !l.is_empty())
}
