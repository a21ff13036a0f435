use crate::domain::SemVer;
use crate::error::{CiuxError, Result};
use std::fmt;

/// Version rendered when no semver tag is reachable
pub const UNTAGGED_VERSION: &str = "v0";

/// Position of a commit relative to its nearest semver tag
///
/// `counter` is the first-parent distance from `commit_hash` back to the
/// commit carrying `tag`; it is zero exactly when the commit is tagged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Revision {
    /// Nearest annotated semver tag, empty when none is reachable
    pub tag: String,
    pub counter: usize,
    /// Full hexadecimal commit hash
    pub commit_hash: String,
    /// Live worktree state of the repository at describe time
    pub dirty: bool,
    /// Checked-out branch, only filled when describing HEAD
    pub branch: Option<String>,
}

impl Revision {
    /// Render as `git describe --tags` would, restricted to semver tags
    ///
    /// `{tag}[-{counter}-g{hash7}][-dirty]`, with `v0` standing in for a
    /// missing tag.
    pub fn version(&self) -> String {
        let tag = if self.tag.is_empty() {
            UNTAGGED_VERSION
        } else {
            self.tag.as_str()
        };

        let mut version = tag.to_string();
        if self.counter != 0 {
            let short = self.commit_hash.get(..7).unwrap_or(&self.commit_hash);
            version.push_str(&format!("-{}-g{}", self.counter, short));
        }
        if self.dirty {
            version.push_str("-dirty");
        }
        version
    }

    /// Tag of the next release candidate
    ///
    /// # Returns
    /// * `Ok("v0")` - When the revision has no tag
    /// * `Ok(tag)` - Next `rcN` for the current tag
    /// * `Err` - If the tag is not a semver tag or has a non-rc pre-release
    pub fn upgrade_tag(&self) -> Result<String> {
        if self.tag.is_empty() {
            return Ok(UNTAGGED_VERSION.to_string());
        }

        let semver = SemVer::parse(&self.tag)
            .ok_or_else(|| CiuxError::semver(format!("invalid semver tag {}", self.tag)))?;

        Ok(semver.next_release_candidate()?.to_string())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version())
    }
}
