//! Minimal semantic-version parsing: major.minor.patch, no build metadata or
//! pre-release suffixes. The registry only needs ordering and patch-bump,
//! not the full semver grammar, so a small hand-rolled parser is used
//! instead of pulling in the `semver` crate.

use super::error::RegistryError;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    pub fn parse(s: &str) -> Result<Self, RegistryError> {
        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(RegistryError::InvalidVersion(s.to_string()));
        }
        let mut nums = [0u64; 3];
        for (i, part) in parts.iter().enumerate() {
            nums[i] = part
                .parse::<u64>()
                .map_err(|_| RegistryError::InvalidVersion(s.to_string()))?;
        }
        Ok(SemVer { major: nums[0], minor: nums[1], patch: nums[2] })
    }

    pub fn bump_patch(&self) -> SemVer {
        SemVer { major: self.major, minor: self.minor, patch: self.patch + 1 }
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

pub fn cmp_versions(a: &str, b: &str) -> Ordering {
    match (SemVer::parse(a), SemVer::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_orders() {
        let a = SemVer::parse("1.2.3").unwrap();
        let b = SemVer::parse("1.10.0").unwrap();
        assert!(a < b);
    }

    #[test]
    fn bump_patch_increments_last_segment() {
        let v = SemVer::parse("2.0.5").unwrap();
        assert_eq!(v.bump_patch().to_string(), "2.0.6");
    }

    #[test]
    fn rejects_malformed_version() {
        assert!(SemVer::parse("1.2").is_err());
        assert!(SemVer::parse("a.b.c").is_err());
    }
}
