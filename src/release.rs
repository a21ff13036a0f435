use crate::error::{CiuxError, Result};
use crate::git::Repository;
use git2::Oid;
use tracing::info;

/// Remote release tags are pushed to
pub const DEFAULT_REMOTE: &str = "origin";

pub fn release_message(tag: &str) -> String {
    format!("Release {}", tag)
}

/// Git commands equivalent to [create_release_tag] then [push_tag]
pub fn release_commands(tag: &str) -> Vec<String> {
    vec![
        format!("git tag -m \"{}\" {}", release_message(tag), tag),
        "git push --tag".to_string(),
    ]
}

/// Create the annotated tag `Release <tag>` on HEAD
pub fn create_release_tag(repo: &dyn Repository, tag: &str) -> Result<Oid> {
    if tag.is_empty() {
        return Err(CiuxError::semver("empty release tag"));
    }
    let oid = repo.create_annotated_tag(tag, &release_message(tag))?;
    info!(tag, "Release tag created");
    Ok(oid)
}

pub fn push_tag(repo: &dyn Repository, remote: &str, tag: &str) -> Result<()> {
    repo.push_tags(remote, &[tag])?;
    info!(tag, remote, "Release tag pushed");
    Ok(())
}
