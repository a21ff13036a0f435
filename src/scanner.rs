//! Source change scanner
//!
//! Finds the commits whose in-scope sources are identical to a starting
//! commit, so an image built for any of them can stand in for a rebuild.

use crate::error::Result;
use crate::git::{FileChange, Repository};
use git2::Oid;
use std::path::Path;
use tracing::{debug, info};

/// One configured source path, resolved against the working tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePath {
    /// Matches every file below it
    Directory(String),
    /// Matches this exact path only
    File(String),
}

impl SourcePath {
    fn matches(&self, file: &str) -> bool {
        match self {
            SourcePath::Directory(dir) => file
                .strip_prefix(dir.as_str())
                .is_some_and(|rest| rest.starts_with('/')),
            SourcePath::File(path) => file == path,
        }
    }
}

/// Set of paths that count as sources; empty means the whole repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    paths: Vec<SourcePath>,
}

impl SourceFilter {
    pub fn new(paths: Vec<SourcePath>) -> Self {
        SourceFilter { paths }
    }

    /// Classify each entry as directory or file by looking under `root`
    ///
    /// Entries that do not exist on disk, or any entry when there is no
    /// working tree, are compared as exact file paths.
    pub fn resolve(root: Option<&Path>, source_paths: &[String]) -> Self {
        let paths = source_paths
            .iter()
            .map(|p| match root {
                Some(root) if root.join(p).is_dir() => SourcePath::Directory(p.clone()),
                _ => SourcePath::File(p.clone()),
            })
            .collect();
        SourceFilter { paths }
    }

    pub fn matches(&self, file: &str) -> bool {
        self.paths.is_empty() || self.paths.iter().any(|p| p.matches(file))
    }

    /// True when either side of any patch is in scope
    pub fn touched_by(&self, changes: &[FileChange]) -> bool {
        changes.iter().any(|change| {
            change.paths().any(|path| {
                let hit = self.matches(path);
                if hit {
                    debug!(path, "Source file changed");
                }
                hit
            })
        })
    }
}

/// Commits sharing the in-scope sources of `start`, oldest first
///
/// `source_paths` are resolved against the working tree of `repo`.
pub fn find_equivalence_chain(repo: &dyn Repository, start: Oid, source_paths: &[String]) -> Result<Vec<Oid>> {
    let filter = SourceFilter::resolve(repo.workdir(), source_paths);
    find_equivalence_chain_with(repo, start, &filter)
}

/// Walk first parents from `start` until a commit changes an in-scope path
///
/// The first element is that boundary commit, or the root commit when no
/// commit touches the sources; the last element is `start`.
pub fn find_equivalence_chain_with(repo: &dyn Repository, start: Oid, filter: &SourceFilter) -> Result<Vec<Oid>> {
    let mut chain = Vec::new();
    let mut current = start;

    loop {
        chain.push(current);

        let Some(parent) = repo.first_parent(current)? else {
            debug!(commit = %current, "Reached root commit");
            break;
        };
        if filter.touched_by(&repo.diff_against_parent(current)?) {
            break;
        }
        current = parent;
    }

    chain.reverse();
    info!(
        boundary = %chain[0],
        length = chain.len(),
        "Source equivalence chain"
    );
    Ok(chain)
}
