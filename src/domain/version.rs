use crate::error::{CiuxError, Result};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

fn release_candidate_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^rc(\d+)$").expect("static regex"))
}

/// Semantic version carried by a release tag (e.g. "v1.2.3-rc4")
///
/// Only the `vMAJOR.MINOR.PATCH[-PRERELEASE]` form is accepted; build
/// metadata is rejected so that rendering a parsed tag gives back the
/// exact tag name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Dot-separated pre-release identifiers, in order
    pub prerelease: Vec<String>,
}

impl SemVer {
    /// Create a release version without pre-release identifiers
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemVer {
            major,
            minor,
            patch,
            prerelease: Vec::new(),
        }
    }

    /// Parse a tag name, returning `None` when it is not a semver tag
    pub fn parse(tag: &str) -> Option<Self> {
        let rest = tag.strip_prefix('v')?;
        let version = semver::Version::parse(rest).ok()?;
        if !version.build.is_empty() {
            return None;
        }

        let prerelease = if version.pre.is_empty() {
            Vec::new()
        } else {
            version.pre.as_str().split('.').map(String::from).collect()
        };

        Some(SemVer {
            major: version.major,
            minor: version.minor,
            patch: version.patch,
            prerelease,
        })
    }

    /// Index of the release candidate (`rcN`) this version carries
    ///
    /// # Returns
    /// * `Ok(None)` - No pre-release part at all
    /// * `Ok(Some(n))` - First pre-release identifier is `rcN`
    /// * `Err` - Pre-release part exists but is not a release candidate
    pub fn release_candidate(&self) -> Result<Option<u64>> {
        let Some(first) = self.prerelease.first() else {
            return Ok(None);
        };

        let captures = release_candidate_pattern().captures(first).ok_or_else(|| {
            CiuxError::semver(format!(
                "pre-release '{}' of {} is not a release candidate",
                first, self
            ))
        })?;

        captures[1]
            .parse::<u64>()
            .map(Some)
            .map_err(|e| CiuxError::semver(format!("invalid release candidate '{}': {}", first, e)))
    }

    /// Next release tag: a final version opens `rc0` on the next patch,
    /// a release candidate moves to the following candidate.
    pub fn next_release_candidate(&self) -> Result<Self> {
        let overflow = || CiuxError::semver(format!("no release candidate can follow {}", self));

        let mut next = self.clone();
        match self.release_candidate()? {
            None => {
                next.patch = self.patch.checked_add(1).ok_or_else(overflow)?;
                next.prerelease = vec!["rc0".to_string()];
            }
            Some(n) => {
                next.prerelease[0] = format!("rc{}", n.checked_add(1).ok_or_else(overflow)?);
            }
        }
        Ok(next)
    }

    fn prerelease_precedence(&self) -> semver::Prerelease {
        semver::Prerelease::new(&self.prerelease.join(".")).unwrap_or(semver::Prerelease::EMPTY)
    }
}

/// Semver precedence: a release sorts after its pre-releases, numeric
/// identifiers compare as numbers
impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| self.prerelease_precedence().cmp(&other.prerelease_precedence()))
            .then_with(|| self.prerelease.cmp(&other.prerelease))
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for SemVer {
    type Err = CiuxError;

    fn from_str(s: &str) -> Result<Self> {
        SemVer::parse(s).ok_or_else(|| CiuxError::semver(format!("'{}' is not a semver tag", s)))
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.prerelease.is_empty() {
            write!(f, "-{}", self.prerelease.join("."))?;
        }
        Ok(())
    }
}
