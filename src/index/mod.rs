//! Prefix index over heterogeneous host keys.
//!
//! Domains and IP values live in two independent tries behind one
//! `insert`/`search` interface that dispatches on the key's type:
//! - domains match by suffix (a query matches a key equal to it or a parent of it)
//! - IP addresses and networks match by longest-prefix containment
//!
//! ## Example
//!
//! ```
//! use target_scope::index::PrefixIndex;
//! use target_scope::Host;
//!
//! let mut index = PrefixIndex::new();
//! index.insert(&Host::Domain("evilcorp.com".into()), "corp");
//! index.insert(&Host::Network("1.2.3.0/24".parse().unwrap()), "range");
//!
//! assert_eq!(index.search(&Host::Domain("www.evilcorp.com".into())), Some(&"corp"));
//! assert_eq!(index.search(&Host::Ip("1.2.3.4".parse().unwrap())), Some(&"range"));
//! assert_eq!(index.search(&Host::Ip("4.3.2.1".parse().unwrap())), None);
//! ```

mod domain;
mod ip;

pub use domain::DomainTrie;
pub use ip::IpTrie;

use crate::types::Host;

/// Maps host keys to payloads and resolves queries to the most specific key.
#[derive(Debug, Clone)]
pub struct PrefixIndex<T> {
    domains: DomainTrie<T>,
    networks: IpTrie<T>,
}

impl<T> Default for PrefixIndex<T> {
    fn default() -> Self {
        Self {
            domains: DomainTrie::default(),
            networks: IpTrie::default(),
        }
    }
}

impl<T> PrefixIndex<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, returning the previous value if any.
    pub fn insert(&mut self, key: &Host, value: T) -> Option<T> {
        match key {
            Host::Domain(name) => self.domains.insert(name, value),
            Host::Ip(ip) => self.networks.insert_addr(*ip, value),
            Host::Network(net) => self.networks.insert(*net, value),
        }
    }

    /// Payload of the most specific stored key matching `key`.
    pub fn search(&self, key: &Host) -> Option<&T> {
        match key {
            Host::Domain(name) => self.domains.search(name),
            Host::Ip(ip) => self.networks.search_addr(*ip),
            Host::Network(net) => self.networks.search(*net),
        }
    }

    /// Payload stored under exactly `key`.
    pub fn get(&self, key: &Host) -> Option<&T> {
        match key {
            Host::Domain(name) => self.domains.get(name),
            Host::Ip(ip) => self.networks.get((*ip).into()),
            Host::Network(net) => self.networks.get(*net),
        }
    }

    pub fn get_mut(&mut self, key: &Host) -> Option<&mut T> {
        match key {
            Host::Domain(name) => self.domains.get_mut(name),
            Host::Ip(ip) => self.networks.get_mut((*ip).into()),
            Host::Network(net) => self.networks.get_mut(*net),
        }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.domains.len() + self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty() && self.networks.is_empty()
    }
}
