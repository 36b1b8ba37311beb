//! Version token ordering
//!
//! Dependency reports pin every module to a version token such as `v1.4.2`,
//! `v0.0.0-20210101000000-abcdef123456` or `v2.0.0+incompatible`. Tokens are
//! ordered by semantic-version precedence, never lexically: `v1.9.0` sorts
//! before `v1.10.0`.
//!
//! # Ordering
//!
//! - A token has the form `[v]MAJOR[.MINOR[.PATCH[-PRERELEASE][+BUILD]]]`.
//!   `v1` and `v1.2` are shorthand for `v1.0.0` and `v1.2.0`.
//! - Numeric components compare by magnitude, at any length.
//! - A pre-release sorts below the release it precedes.
//! - Build metadata does not affect precedence.
//! - Tokens that do not parse (including the empty token) sort below every
//!   valid token.
//! - Ties in precedence are broken by comparing the raw bytes, so two tokens
//!   compare equal only when they are the same string.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A semantic version borrowed from its token
///
/// Components are kept as digit strings so arbitrarily long numbers compare
/// correctly without overflow.
#[derive(Debug, Clone, Copy)]
pub struct Version<'a> {
    pub major: &'a str,
    pub minor: &'a str,
    pub patch: &'a str,
    /// Pre-release identifiers without the leading `-`
    pub prerelease: Option<&'a str>,
    /// Build metadata without the leading `+`
    pub build: Option<&'a str>,
}

impl<'a> Version<'a> {
    /// Parse a version token
    ///
    /// Returns `None` when the token is not a valid semantic version.
    /// Shorthand forms (`v1`, `v1.2`) may not carry a pre-release or build
    /// suffix.
    pub fn parse(token: &'a str) -> Option<Self> {
        let rest = token.strip_prefix('v').unwrap_or(token);

        let (major, rest) = split_number(rest)?;
        if rest.is_empty() {
            return Some(Self::release(major, "0", "0"));
        }

        let (minor, rest) = split_number(rest.strip_prefix('.')?)?;
        if rest.is_empty() {
            return Some(Self::release(major, minor, "0"));
        }

        let (patch, mut rest) = split_number(rest.strip_prefix('.')?)?;

        let mut prerelease = None;
        if let Some(tail) = rest.strip_prefix('-') {
            let end = tail.find('+').unwrap_or(tail.len());
            let (pre, after) = tail.split_at(end);
            if !is_valid_prerelease(pre) {
                return None;
            }
            prerelease = Some(pre);
            rest = after;
        }

        let mut build = None;
        if let Some(tail) = rest.strip_prefix('+') {
            if !is_valid_build(tail) {
                return None;
            }
            build = Some(tail);
            rest = "";
        }

        if !rest.is_empty() {
            return None;
        }

        Some(Self {
            major,
            minor,
            patch,
            prerelease,
            build,
        })
    }

    fn release(major: &'a str, minor: &'a str, patch: &'a str) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    /// Compare by semantic-version precedence, ignoring build metadata
    pub fn precedence(&self, other: &Version<'_>) -> Ordering {
        compare_numbers(self.major, other.major)
            .then_with(|| compare_numbers(self.minor, other.minor))
            .then_with(|| compare_numbers(self.patch, other.patch))
            .then_with(|| compare_prerelease(self.prerelease, other.prerelease))
    }
}

/// Total order over raw version tokens
///
/// Valid tokens are ordered by precedence, unparseable tokens sort lowest,
/// and remaining ties fall back to byte order.
pub fn compare(a: &str, b: &str) -> Ordering {
    let by_precedence = match (Version::parse(a), Version::parse(b)) {
        (Some(left), Some(right)) => left.precedence(&right),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    };

    by_precedence.then_with(|| a.cmp(b))
}

/// An owned version token ordered by [`compare`]
///
/// The empty token means "no version pinned".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the token parses as a semantic version
    pub fn is_valid(&self) -> bool {
        Version::parse(&self.0).is_some()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(&self.0, &other.0)
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for VersionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Split a leading decimal number off `s`
///
/// Leading zeros are rejected except for `0` itself.
fn split_number(s: &str) -> Option<(&str, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }

    let (digits, rest) = s.split_at(end);
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }

    Some((digits, rest))
}

fn is_numeric(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit())
}

fn is_identifier(identifier: &str) -> bool {
    !identifier.is_empty()
        && identifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn is_valid_prerelease(prerelease: &str) -> bool {
    prerelease.split('.').all(|identifier| {
        is_identifier(identifier)
            && !(is_numeric(identifier) && identifier.len() > 1 && identifier.starts_with('0'))
    })
}

fn is_valid_build(build: &str) -> bool {
    build.split('.').all(is_identifier)
}

/// Compare two canonical digit strings by magnitude
fn compare_numbers(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_prerelease(a: Option<&str>, b: Option<&str>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Greater,
        (Some(_), None) => return Ordering::Less,
        (Some(a), Some(b)) => (a, b),
    };

    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_identifier(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_identifier(a: &str, b: &str) -> Ordering {
    match (is_numeric(a), is_numeric(b)) {
        (true, true) => compare_numbers(a, b),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_full_version() {
        let v = Version::parse("v1.2.3-rc.1+build.5").unwrap();
        assert_eq!(v.major, "1");
        assert_eq!(v.minor, "2");
        assert_eq!(v.patch, "3");
        assert_eq!(v.prerelease, Some("rc.1"));
        assert_eq!(v.build, Some("build.5"));
    }

    #[test]
    fn test_parse_shorthand() {
        let v = Version::parse("v1.2").unwrap();
        assert_eq!((v.major, v.minor, v.patch), ("1", "2", "0"));

        let v = Version::parse("v3").unwrap();
        assert_eq!((v.major, v.minor, v.patch), ("3", "0", "0"));

        assert!(Version::parse("v1.2-pre").is_none());
        assert!(Version::parse("v1+meta").is_none());
    }

    #[test]
    fn test_parse_without_prefix() {
        assert!(Version::parse("1.10.0").is_some());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for token in [
            "", "v", "latest", "v1.", "v1.2.", "v01.2.3", "v1.02.3", "v1.2.3-", "v1.2.3-01",
            "v1.2.3+", "v1.2.3-a..b", "v1.2.3.4", "v1.2.3 ",
        ] {
            assert!(Version::parse(token).is_none(), "{token:?} should not parse");
        }
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert_eq!(compare("v1.9.0", "v1.10.0"), Ordering::Less);
        assert_eq!(compare("v10.0.0", "v9.99.99"), Ordering::Greater);
        assert_eq!(compare("1.2.0", "1.10.0"), Ordering::Less);
    }

    #[test]
    fn test_large_components_do_not_overflow() {
        assert_eq!(
            compare("v1.0.99999999999999999999999", "v1.0.100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn test_prerelease_below_release() {
        assert_eq!(compare("v1.0.0-rc.1", "v1.0.0"), Ordering::Less);
        assert_eq!(compare("v1.0.0-rc.1", "v0.9.9"), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_precedence_chain() {
        // Example chain from semver.org section 11
        let chain = [
            "v1.0.0-alpha",
            "v1.0.0-alpha.1",
            "v1.0.0-alpha.beta",
            "v1.0.0-beta",
            "v1.0.0-beta.2",
            "v1.0.0-beta.11",
            "v1.0.0-rc.1",
            "v1.0.0",
        ];
        for pair in chain.windows(2) {
            assert_eq!(compare(pair[0], pair[1]), Ordering::Less, "{pair:?}");
        }
    }

    #[test]
    fn test_pseudo_versions_order_by_timestamp() {
        assert_eq!(
            compare(
                "v0.0.0-20190101000000-aaaaaaaaaaaa",
                "v0.0.0-20210101000000-bbbbbbbbbbbb"
            ),
            Ordering::Less
        );
    }

    #[test]
    fn test_build_metadata_ignored_for_precedence() {
        let a = Version::parse("v2.0.0+incompatible").unwrap();
        let b = Version::parse("v2.0.0").unwrap();
        assert_eq!(a.precedence(&b), Ordering::Equal);

        // but the total order still separates distinct tokens
        assert_ne!(compare("v2.0.0+incompatible", "v2.0.0"), Ordering::Equal);
        assert_eq!(compare("v2.1.0", "v2.0.0+incompatible"), Ordering::Greater);
    }

    #[test]
    fn test_invalid_sorts_lowest() {
        assert_eq!(compare("", "v0.0.0"), Ordering::Less);
        assert_eq!(compare("garbage", "v0.0.1-alpha"), Ordering::Less);
        assert_eq!(compare("garbage", "other"), Ordering::Less);
        assert_eq!(compare("garbage", "garbage"), Ordering::Equal);
    }

    #[test]
    fn test_shorthand_ties_broken_by_bytes() {
        assert_ne!(compare("v1.2", "v1.2.0"), Ordering::Equal);
        assert_eq!(compare("v1.2", "v1.3.0"), Ordering::Less);
    }

    #[test]
    fn test_version_token_sorting() {
        let mut tokens: Vec<VersionToken> = ["1.2.0", "1.10.0", "1.3.0"]
            .into_iter()
            .map(VersionToken::from)
            .collect();
        tokens.sort();
        tokens.reverse();

        let sorted: Vec<&str> = tokens.iter().map(VersionToken::as_str).collect();
        assert_eq!(sorted, vec!["1.10.0", "1.3.0", "1.2.0"]);
    }

    #[test]
    fn test_version_token_serializes_as_string() {
        let token = VersionToken::from("v1.0.0");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"v1.0.0\"");
    }

    fn token_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u32..12, 0u32..12, 0u32..12).prop_map(|(a, b, c)| format!("v{a}.{b}.{c}")),
            (0u32..3, 0u32..3, prop::sample::select(vec!["alpha", "beta.2", "rc.1", "1"]))
                .prop_map(|(a, b, pre)| format!("v{a}.{b}.0-{pre}")),
            (0u32..3).prop_map(|a| format!("v{a}.0.0+incompatible")),
            "[a-z0-9.]{0,6}",
        ]
    }

    proptest! {
        #[test]
        fn prop_compare_is_antisymmetric(a in token_strategy(), b in token_strategy()) {
            prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
        }

        #[test]
        fn prop_equal_only_when_identical(a in token_strategy(), b in token_strategy()) {
            prop_assert_eq!(compare(&a, &b) == Ordering::Equal, a == b);
        }

        #[test]
        fn prop_sorted_order_is_consistent(tokens in prop::collection::vec(token_strategy(), 0..12)) {
            let mut sorted = tokens.clone();
            sorted.sort_by(|a, b| compare(a, b));
            for i in 0..sorted.len() {
                for j in i..sorted.len() {
                    prop_assert_ne!(compare(&sorted[i], &sorted[j]), Ordering::Greater);
                }
            }
        }

        #[test]
        fn prop_release_matches_numeric_tuple(
            a in (0u64..1000, 0u64..1000, 0u64..1000),
            b in (0u64..1000, 0u64..1000, 0u64..1000),
        ) {
            let left = format!("v{}.{}.{}", a.0, a.1, a.2);
            let right = format!("v{}.{}.{}", b.0, b.1, b.2);
            prop_assert_eq!(compare(&left, &right), a.cmp(&b));
        }
    }
}
