use std::fs;
use std::net::IpAddr;
use std::path::Path;

use ipnet::IpNet;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, ScopeError};
use crate::types::{Entry, EntryKind, Host};

/// Special target prefixes, evaluated top to bottom; first match wins.
/// Capture group 1 (up to the first line break) is the value handed to
/// the entry factory.
static SPECIAL_TYPES: Lazy<Vec<(Regex, EntryKind)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)^ORG:(.*)").expect("ORG pattern: hardcoded regex is invalid"),
            EntryKind::OrgStub,
        ),
        (
            Regex::new(r"(?i)^ASN:(.*)").expect("ASN pattern: hardcoded regex is invalid"),
            EntryKind::Asn,
        ),
    ]
});

/// Hostname: dot-separated labels of letters, digits, '-' and '_'.
static DNS_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9_](?:[a-z0-9_-]{0,61}[a-z0-9_])?\.)*[a-z0-9_](?:[a-z0-9_-]{0,61}[a-z0-9_])?$")
        .expect("DNS_NAME_PATTERN: hardcoded regex is invalid")
});

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@([^@\s]+)$")
        .expect("EMAIL_PATTERN: hardcoded regex is invalid")
});

static URL_SCHEME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[a-z][a-z0-9+.\-]*://").expect("URL_SCHEME_PATTERN: hardcoded regex is invalid")
});

/// Maximum length of a DNS name, excluding a trailing dot.
const MAX_DNS_NAME_LEN: usize = 253;

/// Match a raw target against the special-prefix table.
///
/// Returns the kind and the remainder of the value, e.g. `ORG:Acme`
/// yields `(EntryKind::OrgStub, "Acme")`.
pub fn match_special_type(raw: &str) -> Option<(EntryKind, &str)> {
    SPECIAL_TYPES.iter().find_map(|(pattern, kind)| {
        pattern
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| (*kind, m.as_str()))
    })
}

/// Normalizes raw values into typed entries.
pub trait EntryFactory: Send + Sync {
    /// Build an entry from `value`. With `kind == None` the type is
    /// detected from the value itself.
    fn make(
        &self,
        value: &str,
        kind: Option<EntryKind>,
        dummy: bool,
        tags: &[&str],
    ) -> Result<Entry>;
}

/// Entry factory recognizing domains, IPs, IP ranges, URLs, emails,
/// host:port pairs, organization stubs and ASNs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEntryFactory;

impl EntryFactory for DefaultEntryFactory {
    fn make(
        &self,
        value: &str,
        kind: Option<EntryKind>,
        dummy: bool,
        tags: &[&str],
    ) -> Result<Entry> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ScopeError::Validation("empty target".to_string()));
        }

        let (kind, data, host) = match kind {
            Some(kind) => parse_as(trimmed, kind)?,
            None => detect(trimmed)?,
        };

        Ok(Entry::new(value, data, host, kind)
            .with_tags(tags.iter().copied())
            .with_dummy(dummy))
    }
}

type Parsed = (EntryKind, String, Option<Host>);

/// Guess the kind of a value and parse it.
fn detect(value: &str) -> Result<Parsed> {
    if value.contains('/') && !value.contains("://") {
        if let Ok(parsed) = parse_ip_range(value) {
            return Ok(parsed);
        }
    }
    if let Some(ip) = parse_ip(value) {
        return Ok((EntryKind::IpAddress, ip.to_string(), Some(Host::Ip(ip))));
    }
    if URL_SCHEME_PATTERN.is_match(value) {
        return parse_url(value);
    }
    if value.contains('@') {
        return parse_email(value);
    }
    if let Ok(parsed) = parse_host_port(value) {
        return Ok(parsed);
    }
    parse_dns_name(value)
        .map_err(|_| ScopeError::Validation(format!("unrecognized target: {}", value)))
}

/// Parse a value as a specific kind.
fn parse_as(value: &str, kind: EntryKind) -> Result<Parsed> {
    match kind {
        EntryKind::DnsName => parse_dns_name(value),
        EntryKind::IpAddress => parse_ip(value)
            .map(|ip| (EntryKind::IpAddress, ip.to_string(), Some(Host::Ip(ip))))
            .ok_or_else(|| ScopeError::Validation(format!("invalid IP address: {}", value))),
        EntryKind::IpRange => {
            let net: IpNet = value
                .parse()
                .map_err(|_| ScopeError::Validation(format!("invalid IP range: {}", value)))?;
            let net = net.trunc();
            Ok((EntryKind::IpRange, net.to_string(), Some(Host::Network(net))))
        }
        EntryKind::Url => parse_url(value),
        EntryKind::Email => parse_email(value),
        EntryKind::OpenTcpPort => parse_host_port(value),
        EntryKind::OrgStub => Ok((EntryKind::OrgStub, value.to_string(), None)),
        EntryKind::Asn => parse_asn(value),
    }
}

/// `a.b.c.d/n` or `v6/n`. Host bits are dropped; a full-length prefix
/// is a single address.
fn parse_ip_range(value: &str) -> Result<Parsed> {
    let net: IpNet = value
        .parse()
        .map_err(|_| ScopeError::Validation(format!("invalid IP range: {}", value)))?;
    if net.prefix_len() == net.max_prefix_len() {
        let ip = net.addr();
        return Ok((EntryKind::IpAddress, ip.to_string(), Some(Host::Ip(ip))));
    }
    let net = net.trunc();
    Ok((EntryKind::IpRange, net.to_string(), Some(Host::Network(net))))
}

/// Bare or bracketed IP address.
fn parse_ip(value: &str) -> Option<IpAddr> {
    let value = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    value.parse().ok()
}

fn parse_dns_name(value: &str) -> Result<Parsed> {
    let name = value.strip_suffix('.').unwrap_or(value).to_lowercase();
    if name.is_empty() || name.len() > MAX_DNS_NAME_LEN || !DNS_NAME_PATTERN.is_match(&name) {
        return Err(ScopeError::Validation(format!("invalid DNS name: {}", value)));
    }
    Ok((EntryKind::DnsName, name.clone(), Some(Host::Domain(name))))
}

/// Host part of a URL; scheme, userinfo, port and path are not scope-relevant.
fn parse_url(value: &str) -> Result<Parsed> {
    let scheme_end = URL_SCHEME_PATTERN
        .find(value)
        .map(|m| m.end())
        .ok_or_else(|| ScopeError::Validation(format!("invalid URL: {}", value)))?;

    let rest = &value[scheme_end..];
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    let host = parse_authority_host(host_port)
        .map_err(|_| ScopeError::Validation(format!("invalid URL: {}", value)))?;
    Ok((EntryKind::Url, value.to_string(), Some(host)))
}

fn parse_email(value: &str) -> Result<Parsed> {
    let lower = value.to_lowercase();
    let domain = EMAIL_PATTERN
        .captures(&lower)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ScopeError::Validation(format!("invalid email: {}", value)))?;

    let host = match parse_ip(&domain) {
        Some(ip) => Host::Ip(ip),
        None => {
            let (_, name, _) = parse_dns_name(&domain)
                .map_err(|_| ScopeError::Validation(format!("invalid email: {}", value)))?;
            Host::Domain(name)
        }
    };
    Ok((EntryKind::Email, lower, Some(host)))
}

/// `host:port` or `[v6]:port`.
fn parse_host_port(value: &str) -> Result<Parsed> {
    let (host_str, port_str) = split_host_port(value)
        .ok_or_else(|| ScopeError::Validation(format!("invalid host:port: {}", value)))?;
    port_str
        .parse::<u16>()
        .map_err(|_| ScopeError::Validation(format!("invalid port: {}", value)))?;

    let host = parse_authority_host(host_str)?;
    let data = match &host {
        Host::Ip(IpAddr::V6(v6)) => format!("[{}]:{}", v6, port_str),
        other => format!("{}:{}", other, port_str),
    };
    Ok((EntryKind::OpenTcpPort, data, Some(host)))
}

fn split_host_port(value: &str) -> Option<(&str, &str)> {
    if let Some(rest) = value.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        let port = after.strip_prefix(':')?;
        return Some((host, port));
    }
    let (host, port) = value.rsplit_once(':')?;
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}

/// Host of a URL authority with the optional port removed.
fn parse_authority_host(authority: &str) -> Result<Host> {
    if authority.is_empty() {
        return Err(ScopeError::Validation("empty host".to_string()));
    }
    if let Some(ip) = parse_ip(authority) {
        return Ok(Host::Ip(ip));
    }
    let host = match split_host_port(authority) {
        Some((host, port)) => {
            port.parse::<u16>()
                .map_err(|_| ScopeError::Validation(format!("invalid port: {}", authority)))?;
            host
        }
        None => authority,
    };
    if let Some(ip) = parse_ip(host) {
        return Ok(Host::Ip(ip));
    }
    let (_, name, _) = parse_dns_name(host)?;
    Ok(Host::Domain(name))
}

/// `1234` or `AS1234`
fn parse_asn(value: &str) -> Result<Parsed> {
    let digits = match value.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("as") => &value[2..],
        _ => value,
    };
    digits
        .parse::<u32>()
        .map_err(|_| ScopeError::Validation(format!("invalid ASN: {}", value)))?;
    Ok((EntryKind::Asn, digits.to_string(), None))
}

/// Split target text into one target per line, dropping blank lines.
/// Comment lines are kept so the scope can apply its comment rule.
pub fn parse_targets(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Read a target list file.
pub fn read_targets_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| {
        ScopeError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read targets file '{}': {}", path.display(), e),
        ))
    })
}
