//! Integration tests for ScopeSet membership, comparison and loading.

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::thread;

use target_scope::{EntryKind, ScopeError, ScopeOptions, ScopeSet};

fn scope(targets: &[&str]) -> ScopeSet {
    ScopeSet::from_targets(targets.iter().copied(), ScopeOptions::default()).unwrap()
}

fn strict_scope(targets: &[&str]) -> ScopeSet {
    ScopeSet::from_targets(
        targets.iter().copied(),
        ScopeOptions::new().with_strict_scope(true),
    )
    .unwrap()
}

mod membership_tests {
    use super::*;

    #[test]
    fn test_domain_subdomain_match() {
        assert!(scope(&["evilcorp.com"]).contains("www.evilcorp.com"));
        assert!(!strict_scope(&["evilcorp.com"]).contains("www.evilcorp.com"));
    }

    #[test]
    fn test_domain_case_and_trailing_dot() {
        let scope = scope(&["EvilCorp.COM"]);
        assert!(scope.contains("WWW.EVILCORP.COM."));
        assert!(!scope.contains("notevilcorp.com"));
    }

    #[test]
    fn test_range_containment() {
        let scope = scope(&["1.2.3.0/24"]);
        assert!(scope.contains("1.2.3.4"));
        assert!(!scope.contains("4.3.2.1"));
        assert_eq!(scope.size(), 256);
    }

    #[test]
    fn test_ipv6_range_containment() {
        let scope = scope(&["2001:db8::/32"]);
        assert!(scope.contains("2001:db8::1"));
        assert!(scope.contains("http://[2001:db8::1]:8080/"));
        assert!(!scope.contains("2001:db9::1"));
        assert!(!scope.contains("1.2.3.4"));
    }

    #[test]
    fn test_range_unaffected_by_strict_scope() {
        let scope = strict_scope(&["1.2.3.0/24"]);
        assert!(scope.contains("1.2.3.4"));
        assert!(scope.contains("1.2.3.0/28"));
        assert!(!scope.contains("1.2.0.0/16"));
    }

    #[test]
    fn test_single_ip_target() {
        let scope = scope(&["10.0.0.1"]);
        assert!(scope.contains("10.0.0.1"));
        assert!(!scope.contains("10.0.0.2"));
        assert_eq!(scope.size(), 1);
    }

    #[test]
    fn test_url_target_covers_whole_host() {
        // ports and protocols are not considered
        let scope = scope(&["https://evilcorp.com:8443"]);
        assert!(scope.contains("http://evilcorp.com"));
        assert!(scope.contains("evilcorp.com:22"));
        assert!(scope.contains("api.evilcorp.com"));
    }
}

mod special_type_tests {
    use super::*;

    #[test]
    fn test_org_stub() {
        let scope = scope(&["ORG:Acme"]);
        assert_eq!(scope.entry_count(), 1);
        let entry = &scope.entries()[0];
        assert_eq!(entry.kind(), EntryKind::OrgStub);
        assert_eq!(entry.data(), "Acme");
        assert!(entry.host().is_none());
    }

    #[test]
    fn test_asn_case_insensitive_prefix() {
        for raw in ["ASN:1234", "asn:1234", "Asn:1234"] {
            let scope = scope(&[raw]);
            let entry = &scope.entries()[0];
            assert_eq!(entry.kind(), EntryKind::Asn, "raw: {}", raw);
            assert_eq!(entry.data(), "1234");
        }
    }

    #[test]
    fn test_invalid_asn_is_rejected() {
        let mut scope = ScopeSet::default();
        assert!(scope.add("ASN:not-a-number").is_err());
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_comment_tolerance() {
        let mut scope = ScopeSet::default();
        assert!(scope.add("#not-a-target").is_ok());
        assert!(scope.is_empty());
    }

    #[test]
    fn test_invalid_target_raises_with_context() {
        let mut scope = ScopeSet::default();
        let err = scope.add("not a target !!!").unwrap_err();
        assert!(err.is_validation());
        match &err {
            ScopeError::InvalidTarget { target, .. } => assert_eq!(target, "not a target !!!"),
            other => panic!("expected InvalidTarget, got {:?}", other),
        }
        assert!(scope.is_empty());
    }

    #[test]
    fn test_construction_fails_on_invalid_target() {
        let result = ScopeSet::from_targets(["evilcorp.com", "bad target"], ScopeOptions::default());
        assert!(result.is_err());
    }
}

mod comparison_tests {
    use super::*;

    #[test]
    fn test_asymmetric_containment() {
        let parent = scope(&["evilcorp.com"]);
        let child = scope(&["www.evilcorp.com"]);

        assert!(parent.contains_scope(&child));
        assert!(!child.contains_scope(&parent));
        assert_ne!(parent, child);
    }

    #[test]
    fn test_strict_containment() {
        let parent = strict_scope(&["evilcorp.com"]);
        let child = scope(&["www.evilcorp.com"]);
        assert!(!parent.contains_scope(&child));
    }

    #[test]
    fn test_idempotent_merge() {
        let other = scope(&["evilcorp.com", "1.2.3.0/24", "ORG:Acme"]);

        let mut once = scope(&["example.org"]);
        once.merge(&other);

        let mut twice = scope(&["example.org"]);
        twice.merge(&other);
        twice.add_item(&other, None).unwrap();

        assert_eq!(once.entry_count(), 4);
        assert_eq!(twice.entry_count(), 4);
        assert_eq!(once, twice);

        let once_entries: HashSet<_> = once.iter().cloned().collect();
        let twice_entries: HashSet<_> = twice.iter().cloned().collect();
        assert_eq!(once_entries, twice_entries);
    }

    #[test]
    fn test_merge_preserves_entries() {
        let other = scope(&["ORG:Acme"]);
        let mut target = ScopeSet::default();
        target.merge(&other);

        assert!(Arc::ptr_eq(&target.entries()[0], &other.entries()[0]));
    }

    #[test]
    fn test_copy_independence() {
        let original = scope(&["evilcorp.com", "1.2.3.0/24"]);
        let mut copy = original.copy();
        assert_eq!(copy, original);
        assert!(original.contains_scope(&copy));
        assert!(copy.contains_scope(&original));

        copy.add("dev.evilcorp.com").unwrap();
        copy.add("9.9.9.9").unwrap();

        assert_eq!(original.entry_count(), 2);
        assert!(!original.contains("9.9.9.9"));
        assert_eq!(
            original.get("x.dev.evilcorp.com").unwrap().data(),
            "evilcorp.com"
        );
        assert_eq!(
            copy.get("x.dev.evilcorp.com").unwrap().data(),
            "dev.evilcorp.com"
        );
        assert!(original.contains("www.evilcorp.com"));
        assert!(original.contains("1.2.3.4"));
    }

    #[test]
    fn test_scopes_as_set_members() {
        let mut seen = HashSet::new();
        seen.insert(scope(&["evilcorp.com", "1.2.3.4"]));
        seen.insert(scope(&["1.2.3.4", "evilcorp.com"]));
        seen.insert(scope(&["example.org"]));
        assert_eq!(seen.len(), 2);
    }
}

mod loading_tests {
    use super::*;

    #[test]
    fn test_from_file() {
        let dir = std::env::temp_dir().join("target_scope_test_file");
        let _ = fs::create_dir_all(&dir);
        let path = dir.join("targets.txt");
        fs::write(&path, "# scope\nevilcorp.com\n\n1.2.3.0/24\nORG:Acme\n").unwrap();

        let scope = ScopeSet::from_file(&path, ScopeOptions::default()).unwrap();
        assert_eq!(scope.entry_count(), 3);
        assert!(scope.contains("www.evilcorp.com"));
        assert!(scope.contains("1.2.3.4"));

        let _ = fs::remove_file(&path);
        let _ = fs::remove_dir(&dir);
    }

    #[test]
    fn test_from_file_not_found() {
        let result = ScopeSet::from_file("/nonexistent/path/targets.txt", ScopeOptions::default());
        assert!(matches!(result, Err(ScopeError::Io(_))));
    }

    #[test]
    fn test_from_text_reports_bad_line() {
        let result = ScopeSet::from_text("evilcorp.com\nnot valid!!\n", ScopeOptions::default());
        let err = result.unwrap_err();
        assert!(format!("{}", err).contains("not valid!!"));
    }
}

mod concurrency_tests {
    use super::*;

    #[test]
    fn test_concurrent_readers() {
        let scope = Arc::new(scope(&["evilcorp.com", "10.0.0.0/8"]));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let scope = Arc::clone(&scope);
                thread::spawn(move || {
                    for j in 0..100 {
                        assert!(scope.contains(&format!("host{}.evilcorp.com", j)));
                        assert!(scope.contains(&format!("10.{}.0.{}", i, j)));
                        assert!(!scope.contains(&format!("11.{}.0.{}", i, j)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
