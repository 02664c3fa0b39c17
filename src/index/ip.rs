//! Binary prefix trie over IP networks.
//!
//! Each address family gets its own trie. A network is stored at the
//! node reached by following its first `prefix_len` bits; a lookup walks
//! the query's bits and keeps the deepest node holding a value, which is
//! the longest matching prefix.

use std::net::IpAddr;

use ipnet::IpNet;

#[derive(Debug, Clone)]
struct BitNode<T> {
    children: [Option<Box<BitNode<T>>>; 2],
    value: Option<T>,
}

impl<T> Default for BitNode<T> {
    fn default() -> Self {
        Self {
            children: [None, None],
            value: None,
        }
    }
}

/// Single-family trie keyed by the leading bits of a 128-bit word.
#[derive(Debug, Clone)]
struct BitTrie<T> {
    root: BitNode<T>,
}

impl<T> Default for BitTrie<T> {
    fn default() -> Self {
        Self {
            root: BitNode::default(),
        }
    }
}

impl<T> BitTrie<T> {
    fn insert(&mut self, bits: u128, prefix_len: u8, value: T) -> Option<T> {
        let mut node = &mut self.root;
        for i in 0..prefix_len {
            node = node.children[bit_at(bits, i)]
                .get_or_insert_with(Box::default)
                .as_mut();
        }
        node.value.replace(value)
    }

    fn search(&self, bits: u128, prefix_len: u8) -> Option<&T> {
        let mut node = &self.root;
        let mut best = node.value.as_ref();
        for i in 0..prefix_len {
            match node.children[bit_at(bits, i)].as_deref() {
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

    fn get_mut(&mut self, bits: u128, prefix_len: u8) -> Option<&mut T> {
        let mut node = &mut self.root;
        for i in 0..prefix_len {
            node = node.children[bit_at(bits, i)].as_deref_mut()?;
        }
        node.value.as_mut()
    }

    fn get(&self, bits: u128, prefix_len: u8) -> Option<&T> {
        let mut node = &self.root;
        for i in 0..prefix_len {
            node = node.children[bit_at(bits, i)].as_deref()?;
        }
        node.value.as_ref()
    }
}

/// Bit `i` counted from the most significant bit.
fn bit_at(bits: u128, i: u8) -> usize {
    ((bits >> (127 - u32::from(i))) & 1) as usize
}

/// Address left-aligned in a 128-bit word.
fn addr_bits(ip: IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u128::from(u32::from(v4)) << 96,
        IpAddr::V6(v6) => u128::from(v6),
    }
}

fn full_prefix(ip: &IpAddr) -> u8 {
    match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Longest-prefix network trie covering both address families.
#[derive(Debug, Clone)]
pub struct IpTrie<T> {
    v4: BitTrie<T>,
    v6: BitTrie<T>,
    len: usize,
}

impl<T> Default for IpTrie<T> {
    fn default() -> Self {
        Self {
            v4: BitTrie::default(),
            v6: BitTrie::default(),
            len: 0,
        }
    }
}

impl<T> IpTrie<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn family(&self, ip: &IpAddr) -> &BitTrie<T> {
        match ip {
            IpAddr::V4(_) => &self.v4,
            IpAddr::V6(_) => &self.v6,
        }
    }

    fn family_mut(&mut self, ip: &IpAddr) -> &mut BitTrie<T> {
        match ip {
            IpAddr::V4(_) => &mut self.v4,
            IpAddr::V6(_) => &mut self.v6,
        }
    }

    /// Store `value` under `net`; host bits are ignored.
    pub fn insert(&mut self, net: IpNet, value: T) -> Option<T> {
        let network = net.network();
        let old = self
            .family_mut(&network)
            .insert(addr_bits(network), net.prefix_len(), value);
        if old.is_none() {
            self.len += 1;
        }
        old
    }

    /// Store `value` under a single address (a full-length prefix).
    pub fn insert_addr(&mut self, ip: IpAddr, value: T) -> Option<T> {
        self.insert(IpNet::from(ip), value)
    }

    /// Value of the most specific stored network containing `ip`.
    pub fn search_addr(&self, ip: IpAddr) -> Option<&T> {
        self.family(&ip).search(addr_bits(ip), full_prefix(&ip))
    }

    /// Value of the most specific stored network containing all of `net`.
    pub fn search(&self, net: IpNet) -> Option<&T> {
        let network = net.network();
        self.family(&network)
            .search(addr_bits(network), net.prefix_len())
    }

    /// Value stored under exactly `net`.
    pub fn get(&self, net: IpNet) -> Option<&T> {
        let network = net.network();
        self.family(&network).get(addr_bits(network), net.prefix_len())
    }

    pub fn get_mut(&mut self, net: IpNet) -> Option<&mut T> {
        let network = net.network();
        self.family_mut(&network)
            .get_mut(addr_bits(network), net.prefix_len())
    }

    /// Number of stored networks
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
