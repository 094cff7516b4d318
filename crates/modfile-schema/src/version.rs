//! `v`-prefixed semantic versions as they appear in module manifests.
//!
//! Versions are written `vMAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]`. The
//! shorthands `vMAJOR` and `vMAJOR.MINOR` are accepted when no pre-release
//! or build suffix is present; they stand for the `.0`-padded version.

use std::cmp::Ordering;

/// The language version implemented by this crate. Manifests declaring a
/// newer language version are rejected.
pub const LANGUAGE_VERSION: &str = "v0.9.2";

fn parse(v: &str) -> Option<semver::Version> {
    let rest = v.strip_prefix('v')?;
    if rest.contains(['-', '+']) {
        let mut parsed = semver::Version::parse(rest).ok()?;
        parsed.build = semver::BuildMetadata::EMPTY;
        return Some(parsed);
    }
    let padded = match rest.matches('.').count() {
        0 => format!("{rest}.0.0"),
        1 => format!("{rest}.0"),
        2 => rest.to_owned(),
        _ => return None,
    };
    semver::Version::parse(&padded).ok()
}

/// Reports whether `v` is a valid semantic version.
pub fn is_valid(v: &str) -> bool {
    parse(v).is_some()
}

/// Returns the canonical form of `v`: shorthand is padded with zeros and
/// build metadata is dropped. Returns an empty string for invalid versions.
pub fn canonical(v: &str) -> String {
    let Some(parsed) = parse(v) else {
        return String::new();
    };
    if parsed.pre.is_empty() {
        format!("v{}.{}.{}", parsed.major, parsed.minor, parsed.patch)
    } else {
        format!(
            "v{}.{}.{}-{}",
            parsed.major, parsed.minor, parsed.patch, parsed.pre
        )
    }
}

/// Returns the major version prefix of `v` (`"v2"` for `"v2.1.0"`), or an
/// empty string if `v` is invalid.
pub fn major(v: &str) -> String {
    parse(v).map_or_else(String::new, |parsed| format!("v{}", parsed.major))
}

/// Compares two versions. An invalid version sorts before every valid one
/// and two invalid versions compare equal.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
