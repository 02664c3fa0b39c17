use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::Serialize;

use crate::error::{Result, ScopeError};

/// Canonical identity used to match an entry against candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Host {
    /// Lowercase domain name, matched by suffix
    Domain(String),
    /// Single IP address
    Ip(IpAddr),
    /// IP network, matched by longest-prefix containment
    Network(IpNet),
}

impl Host {
    /// Returns true if this host is a domain name (not an IP value).
    pub fn is_domain(&self) -> bool {
        matches!(self, Host::Domain(_))
    }

    /// Number of addresses this host covers: the network size for
    /// networks, 1 otherwise. Saturates at `u128::MAX` for `::/0`.
    pub fn num_addresses(&self) -> u128 {
        match self {
            Host::Network(net) => {
                let host_bits = u32::from(net.max_prefix_len() - net.prefix_len());
                1u128.checked_shl(host_bits).unwrap_or(u128::MAX)
            }
            _ => 1,
        }
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Domain(d) => f.write_str(d),
            Host::Ip(ip) => write!(f, "{}", ip),
            Host::Network(net) => write!(f, "{}", net),
        }
    }
}

impl From<IpAddr> for Host {
    fn from(ip: IpAddr) -> Self {
        Host::Ip(ip)
    }
}

impl From<IpNet> for Host {
    fn from(net: IpNet) -> Self {
        Host::Network(net)
    }
}

/// Target type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    DnsName,
    IpAddress,
    IpRange,
    Url,
    Email,
    OpenTcpPort,
    OrgStub,
    Asn,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::DnsName => "DNS_NAME",
            EntryKind::IpAddress => "IP_ADDRESS",
            EntryKind::IpRange => "IP_RANGE",
            EntryKind::Url => "URL",
            EntryKind::Email => "EMAIL",
            EntryKind::OpenTcpPort => "OPEN_TCP_PORT",
            EntryKind::OrgStub => "ORG_STUB",
            EntryKind::Asn => "ASN",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.trim().to_ascii_uppercase().as_str() {
            "DNS_NAME" => EntryKind::DnsName,
            "IP_ADDRESS" => EntryKind::IpAddress,
            "IP_RANGE" => EntryKind::IpRange,
            "URL" => EntryKind::Url,
            "EMAIL" | "EMAIL_ADDRESS" => EntryKind::Email,
            "OPEN_TCP_PORT" => EntryKind::OpenTcpPort,
            "ORG_STUB" => EntryKind::OrgStub,
            "ASN" => EntryKind::Asn,
            _ => return Err(ScopeError::InvalidKind(s.to_string())),
        };
        Ok(kind)
    }
}

/// A normalized target declaration.
///
/// Entries are immutable once built; a scope shares them by `Arc`.
/// Equality and hashing cover every field, so the same host declared
/// twice with different tags yields two distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entry {
    raw_value: String,
    data: String,
    host: Option<Host>,
    kind: EntryKind,
    tags: BTreeSet<String>,
    dummy: bool,
}

impl Entry {
    /// Create a new entry with no tags.
    pub fn new(
        raw_value: impl Into<String>,
        data: impl Into<String>,
        host: Option<Host>,
        kind: EntryKind,
    ) -> Self {
        Self {
            raw_value: raw_value.into(),
            data: data.into(),
            host,
            kind,
            tags: BTreeSet::new(),
            dummy: false,
        }
    }

    /// Add tags
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Mark the entry as built for scope declaration/lookup only
    pub fn with_dummy(mut self, dummy: bool) -> Self {
        self.dummy = dummy;
        self
    }

    /// The input string this entry was built from.
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Canonical value (lowercased domain, truncated network, org name, ...).
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn host(&self) -> Option<&Host> {
        self.host.as_ref()
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_dummy(&self) -> bool {
        self.dummy
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(\"{}\")", self.kind, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_num_addresses() {
        let net: IpNet = "1.2.3.0/24".parse().unwrap();
        assert_eq!(Host::Network(net).num_addresses(), 256);

        let net: IpNet = "10.0.0.0/8".parse().unwrap();
        assert_eq!(Host::Network(net).num_addresses(), 1 << 24);

        let net: IpNet = "2001:db8::/64".parse().unwrap();
        assert_eq!(Host::Network(net).num_addresses(), 1u128 << 64);

        let net: IpNet = "::/0".parse().unwrap();
        assert_eq!(Host::Network(net).num_addresses(), u128::MAX);

        assert_eq!(Host::Domain("evilcorp.com".into()).num_addresses(), 1);
        assert_eq!(Host::Ip("1.2.3.4".parse().unwrap()).num_addresses(), 1);
    }

    #[test]
    fn test_entry_kind_round_trips_names() {
        for kind in [
            EntryKind::DnsName,
            EntryKind::IpAddress,
            EntryKind::IpRange,
            EntryKind::Url,
            EntryKind::Email,
            EntryKind::OpenTcpPort,
            EntryKind::OrgStub,
            EntryKind::Asn,
        ] {
            assert_eq!(kind.as_str().parse::<EntryKind>().unwrap(), kind);
        }
        assert_eq!("org_stub".parse::<EntryKind>().unwrap(), EntryKind::OrgStub);
        assert!("SOMETHING".parse::<EntryKind>().is_err());
    }

    #[test]
    fn test_entries_with_different_tags_are_distinct() {
        let host = Some(Host::Domain("evilcorp.com".into()));
        let a = Entry::new("evilcorp.com", "evilcorp.com", host.clone(), EntryKind::DnsName)
            .with_tags(["target"]);
        let b = Entry::new("evilcorp.com", "evilcorp.com", host, EntryKind::DnsName)
            .with_tags(["target", "seed"]);
        assert_ne!(a, b);
        assert_eq!(a.host(), b.host());
        assert!(b.has_tag("seed"));
    }

    #[test]
    fn test_entry_serializes_for_reporting() {
        let entry = Entry::new(
            "1.2.3.77/24",
            "1.2.3.0/24",
            Some(Host::Network("1.2.3.0/24".parse().unwrap())),
            EntryKind::IpRange,
        )
        .with_tags(["target"])
        .with_dummy(true);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["raw_value"], "1.2.3.77/24");
        assert_eq!(json["data"], "1.2.3.0/24");
        assert_eq!(json["host"]["Network"], "1.2.3.0/24");
        assert_eq!(json["kind"], "IP_RANGE");
        assert_eq!(json["tags"][0], "target");
        assert_eq!(json["dummy"], true);

        let org = Entry::new("Acme", "Acme", None, EntryKind::OrgStub);
        let json = serde_json::to_value(&org).unwrap();
        assert!(json["host"].is_null());
    }

    #[test]
    fn test_entry_kind_serializes_screaming_case() {
        let json = serde_json::to_string(&EntryKind::OrgStub).unwrap();
        assert_eq!(json, "\"ORG_STUB\"");
    }
}
