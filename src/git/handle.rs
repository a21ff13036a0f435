use crate::describe;
use crate::domain::Revision;
use crate::error::{CiuxError, Result};
use crate::git::{RemoteRefs, Repository};
use git2::Oid;
use std::fmt;
use std::path::PathBuf;

/// A repository the project works with, opened locally or only known remotely
///
/// The main repository is always local. A dependency starts remote-only
/// and becomes local once its sources are retrieved.
pub struct RepoHandle {
    pub url: String,
    /// Branch the repository is worked on, filled by branch resolution
    pub work_branch: Option<String>,
    /// Head of `work_branch` on the remote, as listed during branch resolution
    pub remote_hash: Option<Oid>,
    /// Branches and tags listed on the remote
    pub remote_refs: Option<RemoteRefs>,
    /// True when the sources were already present before retrieval
    pub in_place: bool,
    repo: Option<Box<dyn Repository>>,
}

impl RepoHandle {
    /// Handle on a repository known only by its URL
    pub fn remote(url: impl Into<String>) -> Self {
        RepoHandle {
            url: url.into(),
            work_branch: None,
            remote_hash: None,
            remote_refs: None,
            in_place: false,
            repo: None,
        }
    }

    /// Handle on an opened repository
    pub fn local(url: impl Into<String>, repo: Box<dyn Repository>) -> Self {
        RepoHandle {
            repo: Some(repo),
            ..RepoHandle::remote(url)
        }
    }

    pub fn attach(&mut self, repo: Box<dyn Repository>, in_place: bool) {
        self.repo = Some(repo);
        self.in_place = in_place;
    }

    pub fn is_remote_only(&self) -> bool {
        self.repo.is_none()
    }

    /// Opened repository, or a `Vcs` error for remote-only handles
    pub fn repository(&self) -> Result<&dyn Repository> {
        self.repo
            .as_deref()
            .ok_or_else(|| CiuxError::vcs(format!("repository {} is not available locally", self.url)))
    }

    /// Last path segment of the URL, without a `.git` suffix
    pub fn name(&self) -> &str {
        repository_name(&self.url)
    }

    /// Shell variable prefix: uppercased name, non-alphanumerics replaced by `_`
    pub fn env_prefix(&self) -> String {
        self.name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect()
    }

    /// Working tree root of the local repository, without trailing separator
    pub fn root(&self) -> Result<PathBuf> {
        self.repository()?
            .workdir()
            .map(|dir| dir.components().collect())
            .ok_or_else(|| CiuxError::vcs(format!("repository {} has no working tree", self.url)))
    }

    /// Revision of HEAD, branch included
    pub fn head_revision(&self) -> Result<Revision> {
        describe::head_revision(self.repository()?)
    }
}

impl fmt::Debug for RepoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoHandle")
            .field("url", &self.url)
            .field("work_branch", &self.work_branch)
            .field("remote_hash", &self.remote_hash)
            .field("in_place", &self.in_place)
            .field("remote_only", &self.is_remote_only())
            .finish()
    }
}

pub(crate) fn repository_name(url: &str) -> &str {
    let trimmed = url.trim_end_matches('/');
    let base = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    base.strip_suffix(".git").unwrap_or(base)
}
