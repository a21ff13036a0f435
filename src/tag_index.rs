use crate::domain::SemVer;
use crate::error::Result;
use crate::git::{Repository, TagTarget};
use git2::Oid;
use std::collections::HashMap;
use tracing::debug;

/// Commit -> tag name, restricted to annotated semver tags
pub type SemVerTagIndex = HashMap<Oid, String>;

/// Index the annotated tags of `repo` whose name is a semver version
///
/// Lightweight tags and non-semver names never take part in versioning.
/// Keys are the commits the tags point at, not the tag objects. When two
/// semver tags share a commit the highest version wins, so a final release
/// tagged over its last candidate describes as the release.
pub fn build_semver_tag_index(repo: &dyn Repository) -> Result<SemVerTagIndex> {
    let mut index = SemVerTagIndex::new();
    let mut versions: HashMap<Oid, SemVer> = HashMap::new();

    for tag in repo.tags()? {
        let commit = match tag.target {
            TagTarget::Annotated { commit } => commit,
            TagTarget::Lightweight { .. } => continue,
        };

        let Some(version) = SemVer::parse(&tag.name) else {
            debug!(tag = %tag.name, "Skipping non-semver tag");
            continue;
        };

        if versions.get(&commit).is_some_and(|existing| *existing >= version) {
            continue;
        }
        versions.insert(commit, version);
        index.insert(commit, tag.name);
    }

    Ok(index)
}
