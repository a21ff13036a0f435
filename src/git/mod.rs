//! Git capability layer
//!
//! The resolution engine never talks to libgit2 directly. It goes through
//! the [Repository] trait for local history and through
//! [remote::RemoteLister] for listing references of repositories that are
//! not cloned. This keeps describe, the source change scanner and image
//! resolution testable against the in-memory [mock::MockRepository].
//!
//! - [repository::Git2Repository]: implementation over the `git2` crate
//! - [mock::MockRepository]: in-memory commit graph for tests
//! - [remote::Git2RemoteLister]: `ls-remote` equivalent, no clone required

pub mod handle;
pub mod mock;
pub mod remote;
pub mod repository;

pub use handle::RepoHandle;
pub use mock::MockRepository;
pub use remote::{Git2RemoteLister, RemoteLister, RemoteRefs};
pub use repository::Git2Repository;

use crate::error::Result;
use git2::Oid;
use std::path::Path;

/// Paths touched by one file patch of a commit diff
///
/// `from` is `None` for an added file, `to` is `None` for a deleted one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl FileChange {
    pub fn modified(path: impl Into<String>) -> Self {
        let path = path.into();
        FileChange {
            from: Some(path.clone()),
            to: Some(path),
        }
    }

    pub fn added(path: impl Into<String>) -> Self {
        FileChange {
            from: None,
            to: Some(path.into()),
        }
    }

    pub fn deleted(path: impl Into<String>) -> Self {
        FileChange {
            from: Some(path.into()),
            to: None,
        }
    }

    /// Both sides of the patch, skipping absent ones
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.from.iter().chain(self.to.iter()).map(String::as_str)
    }
}

/// What a tag reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagTarget {
    /// Tag object, already peeled to the commit it targets
    Annotated { commit: Oid },
    /// Plain reference to an object, no tag object involved
    Lightweight { target: Oid },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    /// Short name, e.g. "v1.0.0"
    pub name: String,
    pub target: TagTarget,
}

/// Commit ids yielded newest first
pub type CommitLog<'a> = Box<dyn Iterator<Item = Result<Oid>> + 'a>;

/// Read access to a repository's history, plus release tagging
///
/// ## Error Handling
///
/// Implementations map their backend failures to
/// [crate::error::CiuxError::Git] or [crate::error::CiuxError::Vcs].
pub trait Repository {
    /// Commit HEAD resolves to
    fn head_commit(&self) -> Result<Oid>;

    /// Branch HEAD points to, `None` when detached
    fn current_branch(&self) -> Result<Option<String>>;

    /// First-parent history starting at `from` (included), in committer-time order
    ///
    /// Merge parents beyond the first are never followed.
    fn log(&self, from: Oid) -> Result<CommitLog<'_>>;

    /// First parent of `commit`, `None` for a root commit
    fn first_parent(&self, commit: Oid) -> Result<Option<Oid>>;

    /// File-level diff between the first parent of `commit` and `commit`
    ///
    /// A root commit is diffed against the empty tree.
    fn diff_against_parent(&self, commit: Oid) -> Result<Vec<FileChange>>;

    /// Every tag reference of the repository
    fn tags(&self) -> Result<Vec<TagRef>>;

    /// True when tracked files are modified or staged; untracked files do not count
    fn is_dirty(&self) -> Result<bool>;

    /// Root of the working tree, `None` for bare or in-memory repositories
    fn workdir(&self) -> Option<&Path>;

    /// Create an annotated tag on HEAD
    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<Oid>;

    /// Push tags to a named remote
    fn push_tags(&self, remote: &str, tag_names: &[&str]) -> Result<()>;
}
