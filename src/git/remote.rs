use crate::domain::{BranchContext, MAIN_BRANCH_CANDIDATES};
use crate::error::{CiuxError, Result};
use git2::{Cred, CredentialType, Direction, Oid, Remote, RemoteCallbacks};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Default deadline for a remote reference listing
pub const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(60);

/// Branches and tags advertised by a remote repository
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteRefs {
    pub url: String,
    branches: BTreeMap<String, Oid>,
    tags: BTreeMap<String, Oid>,
}

impl RemoteRefs {
    pub fn new(url: impl Into<String>) -> Self {
        RemoteRefs {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Build from advertised `(refname, oid)` pairs
    ///
    /// Peeled entries (`refs/tags/v1^{}`) replace the tag object id with
    /// the commit it points to.
    pub fn from_advertised<I>(url: impl Into<String>, heads: I) -> Self
    where
        I: IntoIterator<Item = (String, Oid)>,
    {
        let mut refs = RemoteRefs::new(url);
        for (name, oid) in heads {
            if let Some(branch) = BranchContext::from_ref(&name) {
                refs.branches.insert(branch.name, oid);
            } else if let Some(tag) = name.strip_prefix("refs/tags/") {
                let tag = tag.strip_suffix("^{}").unwrap_or(tag);
                refs.tags.insert(tag.to_string(), oid);
            }
        }
        refs
    }

    pub fn with_branch(mut self, name: impl Into<String>, oid: Oid) -> Self {
        self.branches.insert(name.into(), oid);
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, oid: Oid) -> Self {
        self.tags.insert(name.into(), oid);
        self
    }

    /// Head of a remote branch, if it exists
    pub fn branch(&self, name: &str) -> Option<Oid> {
        self.branches.get(name).copied()
    }

    pub fn branches(&self) -> impl Iterator<Item = &str> {
        self.branches.keys().map(String::as_str)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Default branch of the remote, probing "main" then "master"
    pub fn main_branch(&self) -> Result<(String, Oid)> {
        MAIN_BRANCH_CANDIDATES
            .iter()
            .find_map(|name| self.branch(name).map(|oid| (name.to_string(), oid)))
            .ok_or_else(|| {
                CiuxError::not_found(format!(
                    "no main branch ({}) in {}",
                    MAIN_BRANCH_CANDIDATES.join(", "),
                    self.url
                ))
            })
    }
}

/// Lists the references of a repository without cloning it
pub trait RemoteLister {
    fn list(&self, url: &str) -> Result<RemoteRefs>;
}

/// `git ls-remote` over libgit2, bounded by a deadline
pub struct Git2RemoteLister {
    timeout: Duration,
}

impl Git2RemoteLister {
    pub fn new(timeout: Duration) -> Self {
        Git2RemoteLister { timeout }
    }
}

impl Default for Git2RemoteLister {
    fn default() -> Self {
        Self::new(DEFAULT_LIST_TIMEOUT)
    }
}

impl RemoteLister for Git2RemoteLister {
    fn list(&self, url: &str) -> Result<RemoteRefs> {
        let (tx, rx) = mpsc::channel();
        let owned_url = url.to_string();

        // libgit2 has no deadline on connect, the worker is abandoned on timeout
        thread::spawn(move || {
            let _ = tx.send(list_remote_refs(&owned_url));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(refs) => refs,
            Err(RecvTimeoutError::Timeout) => Err(CiuxError::vcs(format!(
                "ls-remote {} timed out after {:?}",
                url, self.timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(CiuxError::vcs(format!(
                "ls-remote {} worker exited without result",
                url
            ))),
        }
    }
}

fn list_remote_refs(url: &str) -> Result<RemoteRefs> {
    let mut remote = Remote::create_detached(url)?;
    let connection = remote
        .connect_auth(Direction::Fetch, Some(remote_callbacks()), None)
        .map_err(|e| CiuxError::vcs(format!("unable to connect to {}: {}", url, e)))?;

    let heads: Vec<(String, Oid)> = connection
        .list()?
        .iter()
        .map(|head| (head.name().to_string(), head.oid()))
        .collect();

    let refs = RemoteRefs::from_advertised(url, heads);
    debug!(
        url,
        branches = ?refs.branches().collect::<Vec<_>>(),
        tags = ?refs.tags().collect::<Vec<_>>(),
        "Remote references"
    );
    Ok(refs)
}

/// Credential callbacks for fetch, clone, ls-remote and push
///
/// Tries the usual SSH keys from ~/.ssh, then the SSH agent, then default
/// credentials.
pub(crate) fn remote_callbacks<'a>() -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");

        if allowed_types.contains(CredentialType::SSH_KEY) {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                let key_path = Path::new(&home).join(".ssh").join(key);
                if key_path.exists() {
                    if let Ok(cred) = Cred::ssh_key(username, None, &key_path, None) {
                        return Ok(cred);
                    }
                }
            }

            if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
        }

        Cred::default()
    });
    callbacks
}
