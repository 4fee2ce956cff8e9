//! Syntactic pre-check run before any network work.
//!
//! The rule is deliberately permissive: one `@`, no whitespace, and a domain
//! with at least one dot between non-empty segments. Anything stricter belongs
//! to a real RFC 5322 parser, which this crate does not try to be.

use std::sync::LazyLock;

use regex::Regex;

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("address pattern compiles")
});

/// Returns `true` when `address` passes the structural check.
///
/// The input is not trimmed: leading or trailing whitespace fails the check.
pub fn check_format(address: &str) -> bool {
    ADDRESS_RE.is_match(address)
}

/// Splits a well-formed address into `(local, domain)`.
///
/// Returns `None` for anything [`check_format`] rejects, so callers can use it
/// as the single entry point of the pipeline.
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    if !check_format(address) {
        return None;
    }
    address.rsplit_once('@')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_basic() {
        assert!(check_format("alice@example.com"));
        assert!(check_format("a.b+tag@mail.example.co.uk"));
    }

    #[test]
    fn rejects_missing_parts() {
        assert!(!check_format(""));
        assert!(!check_format("bad"));
        assert!(!check_format("@example.com"));
        assert!(!check_format("alice@"));
        assert!(!check_format("alice@example"));
        assert!(!check_format("alice@.com"));
        assert!(!check_format("alice@example."));
    }

    #[test]
    fn rejects_double_at_and_whitespace() {
        assert!(!check_format("a@@b.com"));
        assert!(!check_format("a@b@c.com"));
        assert!(!check_format("al ice@example.com"));
        assert!(!check_format(" alice@example.com"));
        assert!(!check_format("alice@example.com\n"));
    }

    #[test]
    fn split_returns_domain_after_at() {
        assert_eq!(
            split_address("alice@example.com"),
            Some(("alice", "example.com"))
        );
        assert_eq!(split_address("bad"), None);
    }

    proptest! {
        #[test]
        fn strings_without_at_are_rejected(s in "[^@]*") {
            prop_assert!(!check_format(&s));
        }

        #[test]
        fn domains_without_dot_are_rejected(local in "[a-z0-9]{1,12}", domain in "[a-z0-9-]{1,12}") {
            let address = format!("{local}@{domain}");
            prop_assert!(!check_format(&address));
        }

        #[test]
        fn simple_addresses_are_accepted(
            local in "[a-z0-9._+-]{1,16}",
            label in "[a-z0-9-]{1,16}",
            tld in "[a-z]{2,6}",
        ) {
            let domain = format!("{label}.{tld}");
            let address = format!("{local}@{domain}");
            prop_assert!(check_format(&address));
            prop_assert_eq!(split_address(&address), Some((local.as_str(), domain.as_str())));
        }
    }
}
