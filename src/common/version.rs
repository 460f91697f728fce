use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// API maturity track a resource is read or written through.
///
/// The derived ordering is by strictness of stability: `Ga < Beta < Alpha`.
/// Alpha is the least stable and most feature complete track.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    #[default]
    Ga,
    Beta,
    Alpha,
}

pub const ALL_VERSIONS: &[Version] = &[Version::Ga, Version::Beta, Version::Alpha];

impl Version {
    /// Path segment used by the compute REST API for this track.
    pub fn api_path(self) -> &'static str {
        match self {
            Version::Ga => "v1",
            Version::Beta => "beta",
            Version::Alpha => "alpha",
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Version::Ga => f.write_str("ga"),
            Version::Beta => f.write_str("beta"),
            Version::Alpha => f.write_str("alpha"),
        }
    }
}

/// Placement of a resource.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Scope {
    #[default]
    Global,
    Regional,
    Zonal,
}

impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Returns true when `a` is strictly more stable than `b`.
pub fn is_lower_version(a: Version, b: Version) -> bool {
    a < b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_order() {
        assert!(is_lower_version(Version::Ga, Version::Beta));
        assert!(is_lower_version(Version::Beta, Version::Alpha));
        assert!(is_lower_version(Version::Ga, Version::Alpha));
        for v in ALL_VERSIONS {
            assert!(!is_lower_version(*v, *v));
        }
        assert!(!is_lower_version(Version::Alpha, Version::Beta));
        assert!(!is_lower_version(Version::Beta, Version::Ga));
    }
}
