//! `git describe --tags` restricted to annotated semver tags
//!
//! Distances are counted along first parents only: a tag reachable solely
//! through the second parent of a merge is not seen.

use crate::domain::Revision;
use crate::error::Result;
use crate::git::Repository;
use crate::tag_index::{build_semver_tag_index, SemVerTagIndex};
use git2::Oid;
use tracing::debug;

/// Describe `commit` against the nearest semver tag in its history
///
/// The dirty flag reflects the live worktree of `repo`, whatever commit is
/// described. Without a reachable tag, `counter` is the number of commits
/// visited.
pub fn describe(repo: &dyn Repository, commit: Oid) -> Result<Revision> {
    let index = build_semver_tag_index(repo)?;
    describe_with_index(repo, &index, commit)
}

/// Same as [describe], reusing an index built once for several commits
pub fn describe_with_index(repo: &dyn Repository, index: &SemVerTagIndex, commit: Oid) -> Result<Revision> {
    let dirty = repo.is_dirty()?;

    let mut counter = 0;
    let mut tag = String::new();
    for oid in repo.log(commit)? {
        let oid = oid?;
        if let Some(name) = index.get(&oid) {
            tag = name.clone();
            break;
        }
        counter += 1;
    }

    let revision = Revision {
        tag,
        counter,
        commit_hash: commit.to_string(),
        dirty,
        branch: None,
    };
    debug!(commit = %commit, version = %revision.version(), "Described commit");
    Ok(revision)
}

/// Describe HEAD, filling in the checked-out branch
pub fn head_revision(repo: &dyn Repository) -> Result<Revision> {
    let head = repo.head_commit()?;
    let mut revision = describe(repo, head)?;
    revision.branch = repo.current_branch()?;
    Ok(revision)
}
