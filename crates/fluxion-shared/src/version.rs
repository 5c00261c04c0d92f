// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Version ordering shared by the release server and polling clients.
//!
//! Versions are dotted numeric strings with an optional leading `v`
//! (`v1.2.0`, `1.2`, `2.0.0-beta`). Ordering is lenient: a missing component
//! counts as `0`, only the numeric prefix before the first `-` of a component
//! is compared, and a component that is not a number counts as `0` instead of
//! failing. Pre-release qualifiers therefore do not order (`1.0.0-beta` equals
//! `1.0.0`).

use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("version is empty")]
    Empty,

    #[error("invalid version component {component:?} in {version:?}")]
    InvalidComponent { version: String, component: String },
}

fn strip_prefix_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

fn numeric_prefix(component: &str) -> &str {
    component.split('-').next().unwrap_or_default()
}

fn lenient_components(version: &str) -> Vec<u64> {
    strip_prefix_v(version)
        .split('.')
        .map(|c| numeric_prefix(c).parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two version strings.
///
/// This is a total order: `compare(a, a)` is `Equal`, swapping the arguments
/// reverses the result, and it is transitive.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    let left = lenient_components(a);
    let right = lenient_components(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or(0);
        let r = right.get(i).copied().unwrap_or(0);
        match l.cmp(&r) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

/// Returns true if `candidate` orders strictly after `current`.
#[must_use]
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare(candidate, current) == Ordering::Greater
}

/// Strictly parse the numeric components of a version.
///
/// Unlike [`compare`], this rejects components whose numeric prefix is not a
/// number. Used to flag suspicious input without refusing it.
pub fn parse_components(version: &str) -> Result<Vec<u64>, VersionError> {
    let stripped = strip_prefix_v(version.trim());
    if stripped.is_empty() {
        return Err(VersionError::Empty);
    }

    stripped
        .split('.')
        .map(|c| {
            numeric_prefix(c)
                .parse::<u64>()
                .map_err(|_| VersionError::InvalidComponent {
                    version: version.to_owned(),
                    component: c.to_owned(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_v_is_ignored() {
        assert_eq!(compare("v1.2.0", "1.2.0"), Ordering::Equal);
        assert_eq!(compare("v2", "1.9"), Ordering::Greater);
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(compare("1.0", "1.0.0"), Ordering::Equal);
        assert_eq!(compare("1", "1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_numeric_not_lexical() {
        assert_eq!(compare("2.0.0", "1.9.9"), Ordering::Greater);
        assert_eq!(compare("0.10.0", "0.9.0"), Ordering::Greater);
        assert_eq!(compare("1.2.10", "1.2.9"), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_suffix_ignored() {
        assert_eq!(compare("1.0.0-beta", "1.0.0"), Ordering::Equal);
        assert_eq!(compare("1.0.1-rc1", "1.0.0"), Ordering::Greater);
    }

    #[test]
    fn test_garbage_components_parse_as_zero() {
        assert_eq!(compare("1.x.3", "1.0.3"), Ordering::Equal);
        assert_eq!(compare("", "0"), Ordering::Equal);
    }

    #[test]
    fn test_only_one_leading_v_stripped() {
        // "vv1" keeps a "v" and its first component parses as zero
        assert_eq!(compare("vv1.0", "0.0"), Ordering::Equal);
    }

    #[test]
    fn test_order_properties() {
        let versions = [
            "0.1", "v0.1.0", "0.2.38", "0.2.39", "0.10", "1.0.0-beta", "1.0", "v1.0.1",
            "1.2", "2.0.0", "10.0", "x.y",
        ];

        for a in versions {
            assert_eq!(compare(a, a), Ordering::Equal, "reflexive for {a}");
            for b in versions {
                assert_eq!(compare(a, b), compare(b, a).reverse(), "antisymmetric {a} {b}");
                for c in versions {
                    if compare(a, b) == Ordering::Greater && compare(b, c) == Ordering::Greater {
                        assert_eq!(compare(a, c), Ordering::Greater, "transitive {a} {b} {c}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("0.2.39", "0.2.38"));
        assert!(!is_newer("0.2.38", "0.2.38"));
        assert!(!is_newer("0.9.99", "1.0.0"));
        assert!(is_newer("v1.1", "1.0.9"));
    }

    #[test]
    fn test_parse_components_strict() {
        assert_eq!(parse_components("v1.2.3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_components("1.0.0-beta").unwrap(), vec![1, 0, 0]);
        assert_eq!(parse_components(""), Err(VersionError::Empty));
        assert!(matches!(
            parse_components("1.x"),
            Err(VersionError::InvalidComponent { .. })
        ));
    }
}
