//! Target Scope - a scope-membership engine for reconnaissance targets
//!
//! This library answers, for any value discovered during a scan, whether it
//! falls inside a declared target scope and which declaration it belongs to:
//! - Domain matching by suffix (subdomains are in scope unless strict)
//! - IP and CIDR matching by longest-prefix containment
//! - URLs, emails and host:port pairs resolved to their host
//! - Organization (`ORG:`) and autonomous system (`ASN:`) stubs
//! - Order-independent identity hashing for comparing whole scopes
//!
//! # Example
//!
//! ```rust
//! use target_scope::{ScopeOptions, ScopeSet};
//!
//! let scope = ScopeSet::from_targets(
//!     ["evilcorp.com", "1.2.3.0/24"],
//!     ScopeOptions::default(),
//! )
//! .unwrap();
//!
//! assert!(scope.contains("www.evilcorp.com"));
//! assert!(scope.contains("https://admin.evilcorp.com"));
//! assert!(scope.contains("bob@evilcorp.com"));
//! assert!(scope.contains("1.2.3.4"));
//! assert!(!scope.contains("4.3.2.1"));
//! assert_eq!(scope.size(), 257);
//!
//! let entry = scope.get("1.2.3.4").unwrap();
//! assert_eq!(entry.data(), "1.2.3.0/24");
//! ```
//!
//! # Target Syntax
//!
//! | Type | Example | Host used for matching |
//! |------|---------|------------------------|
//! | Domain | `evilcorp.com` | `evilcorp.com` and subdomains |
//! | IP | `1.2.3.4` | the address |
//! | CIDR | `1.2.3.0/24` | every address in the range |
//! | URL | `https://evilcorp.com:8443/` | `evilcorp.com` |
//! | Email | `bob@evilcorp.com` | `evilcorp.com` |
//! | Host:port | `evilcorp.com:443` | `evilcorp.com` |
//! | Organization | `ORG:Acme` | none |
//! | ASN | `ASN:1234` | none |
//!
//! Lines starting with `#` are comments and are ignored when they do not
//! parse as a target.

pub mod error;
pub mod index;
pub mod parser;
pub mod scope;
pub mod types;

// Re-export commonly used items
pub use error::{Result, ScopeError};
pub use index::PrefixIndex;
pub use parser::{match_special_type, parse_targets, DefaultEntryFactory, EntryFactory};
pub use scope::{ScopeItem, ScopeOptions, ScopeSet, TARGET_TAG};
pub use types::{Entry, EntryKind, Host};
