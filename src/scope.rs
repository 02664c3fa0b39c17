//! Scope set.
//!
//! Owns declared target entries, indexes them by host and answers
//! whether a candidate value falls inside the declared scope.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{Result, ScopeError};
use crate::index::PrefixIndex;
use crate::parser::{
    match_special_type, parse_targets, read_targets_file, DefaultEntryFactory, EntryFactory,
};
use crate::types::{Entry, EntryKind, Host};

/// Tag carried by every entry declared through `add`.
pub const TARGET_TAG: &str = "target";

/// Number of entries shown by `Display`.
const DISPLAY_LIMIT: usize = 5;

/// Scope options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeOptions {
    /// Only exact host matches count; child subdomains are out of scope
    pub strict_scope: bool,
}

impl ScopeOptions {
    /// Create new scope options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict scope.
    pub fn with_strict_scope(mut self, strict: bool) -> Self {
        self.strict_scope = strict;
        self
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScopeError::Config(e.to_string()))
    }
}

/// Anything that can be added to a scope.
#[derive(Debug, Clone)]
pub enum ScopeItem<'a> {
    /// Raw target string, parsed by the entry factory
    Raw(&'a str),
    /// Already-built entry, added as-is
    Entry(Arc<Entry>),
    /// Another scope whose entries are merged
    Scope(&'a ScopeSet),
}

impl<'a> From<&'a str> for ScopeItem<'a> {
    fn from(raw: &'a str) -> Self {
        ScopeItem::Raw(raw)
    }
}

impl<'a> From<&'a String> for ScopeItem<'a> {
    fn from(raw: &'a String) -> Self {
        ScopeItem::Raw(raw.as_str())
    }
}

impl From<Entry> for ScopeItem<'_> {
    fn from(entry: Entry) -> Self {
        ScopeItem::Entry(Arc::new(entry))
    }
}

impl From<Arc<Entry>> for ScopeItem<'_> {
    fn from(entry: Arc<Entry>) -> Self {
        ScopeItem::Entry(entry)
    }
}

impl<'a> From<&'a ScopeSet> for ScopeItem<'a> {
    fn from(scope: &'a ScopeSet) -> Self {
        ScopeItem::Scope(scope)
    }
}

/// A set of declared targets with host-based membership lookup.
///
/// Domains match by suffix (unless `strict_scope` is set), IP addresses
/// and ranges match by longest-prefix containment. Ports and protocols
/// play no part in scope decisions.
///
/// Populate the set before sharing it: lookups take `&self`, hold no
/// lock and are safe from many threads, but `add` requires exclusive
/// access. The identity hash is computed once and is not recomputed
/// after later mutation.
pub struct ScopeSet {
    options: ScopeOptions,
    /// Insertion-ordered entries
    entries: Vec<Arc<Entry>>,
    seen: HashSet<Arc<Entry>>,
    /// Host -> entries sharing exactly that host, in insertion order
    index: PrefixIndex<Vec<Arc<Entry>>>,
    factory: Arc<dyn EntryFactory>,
    cached_hash: OnceCell<u64>,
}

impl ScopeSet {
    /// Create an empty scope.
    pub fn new(options: ScopeOptions) -> Self {
        Self {
            options,
            entries: Vec::new(),
            seen: HashSet::new(),
            index: PrefixIndex::new(),
            factory: Arc::new(DefaultEntryFactory),
            cached_hash: OnceCell::new(),
        }
    }

    /// Use a custom entry factory for parsing raw values.
    pub fn with_factory(mut self, factory: Arc<dyn EntryFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Create a scope from raw targets, entries or other scopes.
    pub fn from_targets<'a, I, T>(targets: I, options: ScopeOptions) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<ScopeItem<'a>>,
    {
        let items: Vec<ScopeItem<'a>> = targets.into_iter().map(Into::into).collect();
        if !items.is_empty() {
            debug!("Creating entries from {} targets", items.len());
        }
        let mut scope = Self::new(options);
        scope.add_all(items)?;
        Ok(scope)
    }

    /// Create a scope from target text, one target per line.
    pub fn from_text(text: &str, options: ScopeOptions) -> Result<Self> {
        let mut scope = Self::new(options);
        scope.add_text(text)?;
        Ok(scope)
    }

    /// Create a scope from a target list file.
    pub fn from_file(path: impl AsRef<Path>, options: ScopeOptions) -> Result<Self> {
        let path = path.as_ref();
        let text = read_targets_file(path)?;
        debug!(path = %path.display(), "Loading targets file");
        Self::from_text(&text, options)
    }

    /// Add a raw target with automatic type detection.
    pub fn add(&mut self, target: &str) -> Result<()> {
        self.add_item(target, None)
    }

    /// Add a raw target as a specific kind.
    pub fn add_with_kind(&mut self, target: &str, kind: EntryKind) -> Result<()> {
        self.add_item(target, Some(kind))
    }

    /// Add a raw target, entry or scope.
    ///
    /// Raw strings are checked against the special prefixes (`ORG:`,
    /// `ASN:`) before being handed to the entry factory. Parse failures
    /// of `#`-prefixed strings are dropped silently; any other failure is
    /// returned wrapped with the original input.
    pub fn add_item<'a>(
        &mut self,
        item: impl Into<ScopeItem<'a>>,
        kind: Option<EntryKind>,
    ) -> Result<()> {
        match item.into() {
            ScopeItem::Scope(other) => {
                self.merge(other);
                Ok(())
            }
            ScopeItem::Entry(entry) => {
                self.add_entry(entry);
                Ok(())
            }
            ScopeItem::Raw(raw) => {
                let (value, kind) = match match_special_type(raw) {
                    Some((special, rest)) => (rest, Some(special)),
                    None => (raw, kind),
                };
                match self.factory.make(value, kind, true, &[TARGET_TAG]) {
                    Ok(entry) => {
                        self.add_entry(entry);
                        Ok(())
                    }
                    Err(_) if raw.starts_with('#') => {
                        debug!(value = raw, "Skipping commented target");
                        Ok(())
                    }
                    Err(e) => Err(ScopeError::invalid_target(raw, e)),
                }
            }
        }
    }

    /// Add a sequence of items, stopping at the first error.
    pub fn add_all<'a, I, T>(&mut self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<ScopeItem<'a>>,
    {
        self.add_all_with_kind(items, None)
    }

    /// Add a sequence of items, parsing every raw string as `kind`.
    /// Entries and scopes keep their own kinds.
    pub fn add_all_with_kind<'a, I, T>(
        &mut self,
        items: I,
        kind: Option<EntryKind>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<ScopeItem<'a>>,
    {
        for item in items {
            self.add_item(item, kind)?;
        }
        Ok(())
    }

    /// Add targets from text, one per line.
    pub fn add_text(&mut self, text: &str) -> Result<()> {
        self.add_all(parse_targets(text))
    }

    /// Import every entry of `other`, keeping their kinds and tags.
    pub fn merge(&mut self, other: &ScopeSet) {
        for entry in &other.entries {
            self.add_entry(Arc::clone(entry));
        }
    }

    /// Add an entry directly. Duplicate entries are ignored.
    pub fn add_entry(&mut self, entry: impl Into<Arc<Entry>>) {
        let entry = entry.into();
        if self.seen.contains(&entry) {
            return;
        }
        if self.cached_hash.get().is_some() {
            warn!(entry = %entry, "Scope mutated after its identity hash was computed");
        }

        if let Some(host) = entry.host() {
            match self.index.get_mut(host) {
                Some(owners) => owners.push(Arc::clone(&entry)),
                None => {
                    self.index.insert(host, vec![Arc::clone(&entry)]);
                }
            }
        }
        trace!(entry = %entry, "Added scope entry");
        self.seen.insert(Arc::clone(&entry));
        self.entries.push(entry);
    }

    /// Resolve a raw candidate to the declared entry it falls under.
    ///
    /// Unparseable or host-less candidates are simply not found.
    pub fn get(&self, candidate: &str) -> Option<Arc<Entry>> {
        match self.factory.make(candidate, None, true, &[]) {
            Ok(entry) => entry.host().and_then(|host| self.lookup(host)),
            Err(_) => None,
        }
    }

    /// Resolve an entry to the declared entry it falls under.
    pub fn get_entry(&self, candidate: &Entry) -> Option<Arc<Entry>> {
        candidate.host().and_then(|host| self.lookup(host))
    }

    /// Lookup by host. When several entries share the matched key, the
    /// first one inserted is returned.
    fn lookup(&self, host: &Host) -> Option<Arc<Entry>> {
        let owners = self.index.search(host)?;
        let entry = owners.first()?;

        // Strict scope: domain matches must be exact
        if self.options.strict_scope {
            if let Some(found) = entry.host() {
                if found.is_domain() && found != host {
                    return None;
                }
            }
        }

        Some(Arc::clone(entry))
    }

    /// Check if a raw candidate is in scope.
    pub fn contains(&self, candidate: &str) -> bool {
        self.get(candidate).is_some()
    }

    /// Check if an entry is in scope.
    pub fn contains_entry(&self, candidate: &Entry) -> bool {
        self.get_entry(candidate).is_some()
    }

    /// Check if every entry of `other` is in this scope.
    ///
    /// This is not symmetric: a scope of `www.evilcorp.com` is inside a
    /// scope of `evilcorp.com`, but not the reverse.
    pub fn contains_scope(&self, other: &ScopeSet) -> bool {
        other.entries.iter().all(|entry| self.contains_entry(entry))
    }

    /// Number of addressable hosts: each entry counts once, except IP
    /// ranges, which count every address they cover.
    pub fn size(&self) -> u128 {
        self.entries
            .iter()
            .map(|entry| entry.host().map_or(1, Host::num_addresses))
            .fold(0, u128::saturating_add)
    }

    /// Number of declared entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[Arc<Entry>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Entry>> {
        self.entries.iter()
    }

    pub fn strict_scope(&self) -> bool {
        self.options.strict_scope
    }

    pub fn options(&self) -> ScopeOptions {
        self.options
    }

    /// Independent copy: new containers, shared entries.
    pub fn copy(&self) -> Self {
        Self {
            options: self.options,
            entries: self.entries.clone(),
            seen: self.seen.clone(),
            index: self.index.clone(),
            factory: Arc::clone(&self.factory),
            cached_hash: OnceCell::new(),
        }
    }

    /// Order-independent hash of the entry collection.
    ///
    /// Computed on first use and cached; entries added afterwards do not
    /// change it. Treat the scope as frozen once hashed or compared.
    pub fn identity_hash(&self) -> u64 {
        *self.cached_hash.get_or_init(|| {
            let mut hashes: Vec<u64> = self.entries.iter().map(|e| hash_one(&**e)).collect();
            hashes.sort_unstable();
            hash_one(&hashes)
        })
    }
}

fn hash_one<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

impl Default for ScopeSet {
    fn default() -> Self {
        Self::new(ScopeOptions::default())
    }
}

impl Clone for ScopeSet {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl PartialEq for ScopeSet {
    fn eq(&self, other: &Self) -> bool {
        self.identity_hash() == other.identity_hash()
    }
}

impl Eq for ScopeSet {}

impl Hash for ScopeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.identity_hash());
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown: Vec<&str> = self
            .entries
            .iter()
            .take(DISPLAY_LIMIT)
            .map(|e| e.data())
            .collect();
        f.write_str(&shown.join(","))
    }
}

impl fmt::Debug for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeSet")
            .field("options", &self.options)
            .field("entries", &self.entries)
            .field("keys", &self.index.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a ScopeSet {
    type Item = &'a Arc<Entry>;
    type IntoIter = std::slice::Iter<'a, Arc<Entry>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
