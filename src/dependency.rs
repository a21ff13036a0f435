use crate::config::{DepConfig, DepSource};
use crate::error::Result;
use crate::git::RepoHandle;
use std::fmt;

/// A dependency of the project, selected by labels from the configuration
#[derive(Debug)]
pub enum Dependency {
    /// Repository developed alongside the project
    Git {
        repo: RepoHandle,
        /// Retrieve the sources next to the main repository
        clone: bool,
        /// The dependency image must already exist in the registry
        pull: bool,
    },
    /// Installable package, e.g. a Go module path with version
    Package { id: String },
    /// Container image used as-is
    Image { reference: String },
}

impl Dependency {
    pub fn from_config(config: &DepConfig) -> Result<Self> {
        Ok(match config.source()? {
            DepSource::Package(id) => Dependency::Package { id: id.to_string() },
            DepSource::Image(reference) => Dependency::Image {
                reference: reference.to_string(),
            },
            DepSource::Git(url) => Dependency::Git {
                repo: RepoHandle::remote(url),
                clone: config.clone,
                pull: config.pull,
            },
        })
    }

    pub fn git(url: impl Into<String>, clone: bool, pull: bool) -> Self {
        Dependency::Git {
            repo: RepoHandle::remote(url),
            clone,
            pull,
        }
    }

    pub fn repo(&self) -> Option<&RepoHandle> {
        match self {
            Dependency::Git { repo, .. } => Some(repo),
            _ => None,
        }
    }

    pub fn repo_mut(&mut self) -> Option<&mut RepoHandle> {
        match self {
            Dependency::Git { repo, .. } => Some(repo),
            _ => None,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Git { repo, .. } => write!(f, "{}", repo.url),
            Dependency::Package { id } => write!(f, "{}", id),
            Dependency::Image { reference } => write!(f, "{}", reference),
        }
    }
}
