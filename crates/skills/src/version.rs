//! `major.minor.patch` comparison and bumping.
//!
//! A version is valid only when it splits into exactly three dot-separated
//! non-negative integers. Anything else is not comparable: comparisons
//! against a malformed string answer "not newer", and bumping one yields
//! `None` so callers can substitute a default such as `1.0.0`.

use std::fmt;

/// Which component a publish should increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpKind::Major => write!(f, "major"),
            BumpKind::Minor => write!(f, "minor"),
            BumpKind::Patch => write!(f, "patch"),
        }
    }
}

/// Parse a `major.minor.patch` triple.
pub fn parse_version(version: &str) -> Option<(u64, u64, u64)> {
    let mut parts = version.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}

/// Numeric component-wise comparison: is `candidate` newer than `installed`?
/// False when either side is malformed or when they are equal.
pub fn is_newer(candidate: &str, installed: &str) -> bool {
    match (parse_version(candidate), parse_version(installed)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

/// Next version string after bumping the selected component. Components to
/// the right of the bumped one reset to zero.
pub fn bump_version(current: &str, kind: BumpKind) -> Option<String> {
    let (major, minor, patch) = parse_version(current)?;
    let next = match kind {
        BumpKind::Major => (major + 1, 0, 0),
        BumpKind::Minor => (major, minor + 1, 0),
        BumpKind::Patch => (major, minor, patch + 1),
    };
    Some(format!("{}.{}.{}", next.0, next.1, next.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_shapes() {
        assert_eq!(parse_version("1.2.3"), Some((1, 2, 3)));
        assert_eq!(parse_version("0.0.0"), Some((0, 0, 0)));
        assert_eq!(parse_version("1.2"), None);
        assert_eq!(parse_version("1.2.3.4"), None);
        assert_eq!(parse_version("1.2.x"), None);
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("v1.2.3"), None);
    }

    #[test]
    fn test_is_newer_numeric_not_lexicographic() {
        assert!(is_newer("1.10.0", "1.2.3"));
        assert!(!is_newer("1.2.3", "1.10.0"));
    }

    #[test]
    fn test_is_newer_equal_is_false() {
        assert!(!is_newer("2.0.1", "2.0.1"));
    }

    #[test]
    fn test_is_newer_antisymmetric() {
        let pairs = [("1.2.3", "1.2.4"), ("0.9.9", "1.0.0"), ("3.1.0", "3.0.9")];
        for (a, b) in pairs {
            assert_ne!(is_newer(a, b), is_newer(b, a));
        }
    }

    #[test]
    fn test_is_newer_malformed_is_false() {
        assert!(!is_newer("abc", "1.0.0"));
        assert!(!is_newer("1.0.0", "abc"));
        assert!(!is_newer("1.0", "1.0.0"));
    }

    #[test]
    fn test_bump_resets_lower_components() {
        assert_eq!(bump_version("2.4.9", BumpKind::Minor).as_deref(), Some("2.5.0"));
        assert_eq!(bump_version("2.4.9", BumpKind::Major).as_deref(), Some("3.0.0"));
        assert_eq!(bump_version("2.4.9", BumpKind::Patch).as_deref(), Some("2.4.10"));
    }

    #[test]
    fn test_bump_malformed_is_none() {
        assert_eq!(bump_version("not-a-version", BumpKind::Patch), None);
        assert_eq!(bump_version("1.2", BumpKind::Major), None);
    }
}
