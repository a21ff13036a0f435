use crate::error::{CiuxError, Result};
use crate::git::remote::remote_callbacks;
use crate::git::{CommitLog, FileChange, TagRef, TagTarget};
use git2::build::RepoBuilder;
use git2::{Delta, DiffFile, FetchOptions, ObjectType, Oid, PushOptions, Sort, Status, StatusOptions};
use git2::Repository as Git2Repo;
use std::path::Path;
use tracing::debug;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path.as_ref()).map_err(|e| {
            CiuxError::vcs(format!(
                "unable to open git repository {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Ok(Git2Repository { repo })
    }

    /// Open `path` only if it already is the root of a git repository
    pub fn open_if_exists<P: AsRef<Path>>(path: P) -> Result<Option<Self>> {
        match Git2Repo::open(path.as_ref()) {
            Ok(repo) => Ok(Some(Git2Repository { repo })),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Clone `url` into `into`, checking out `branch`
    pub fn clone_branch(url: &str, branch: &str, into: &Path) -> Result<Self> {
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());

        let repo = RepoBuilder::new()
            .branch(branch)
            .fetch_options(fetch_options)
            .clone(url, into)
            .map_err(|e| {
                CiuxError::vcs(format!(
                    "unable to clone {} (branch {}) into {}: {}",
                    url,
                    branch,
                    into.display(),
                    e
                ))
            })?;

        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }
}

fn file_path(file: DiffFile<'_>) -> Option<String> {
    file.path().map(|p| p.to_string_lossy().into_owned())
}

impl super::Repository for Git2Repository {
    fn head_commit(&self) -> Result<Oid> {
        let head = self
            .repo
            .head()
            .map_err(|e| CiuxError::vcs(format!("unable to find head: {}", e)))?;
        Ok(head.peel_to_commit()?.id())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let head = self
            .repo
            .head()
            .map_err(|e| CiuxError::vcs(format!("unable to find head: {}", e)))?;

        if head.is_branch() {
            Ok(head.shorthand().map(String::from))
        } else {
            Ok(None)
        }
    }

    fn log(&self, from: Oid) -> Result<CommitLog<'_>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push(from)?;
        revwalk.simplify_first_parent()?;

        Ok(Box::new(revwalk.map(|oid| oid.map_err(CiuxError::from))))
    }

    fn first_parent(&self, commit: Oid) -> Result<Option<Oid>> {
        let commit = self.repo.find_commit(commit)?;
        if commit.parent_count() == 0 {
            return Ok(None);
        }
        Ok(Some(commit.parent_id(0)?))
    }

    fn diff_against_parent(&self, commit: Oid) -> Result<Vec<FileChange>> {
        let commit = self.repo.find_commit(commit)?;
        let tree = commit.tree()?;
        let parent_tree = if commit.parent_count() > 0 {
            Some(commit.parent(0)?.tree()?)
        } else {
            None
        };

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(|e| CiuxError::vcs(format!("unable to get patch for {}: {}", commit.id(), e)))?;

        let changes = diff
            .deltas()
            .map(|delta| match delta.status() {
                Delta::Added => FileChange {
                    from: None,
                    to: file_path(delta.new_file()),
                },
                Delta::Deleted => FileChange {
                    from: file_path(delta.old_file()),
                    to: None,
                },
                _ => FileChange {
                    from: file_path(delta.old_file()),
                    to: file_path(delta.new_file()),
                },
            })
            .collect();

        Ok(changes)
    }

    fn tags(&self) -> Result<Vec<TagRef>> {
        let mut tags = Vec::new();

        for reference in self.repo.references_glob("refs/tags/*")? {
            let reference = reference?;
            let (Some(name), Some(target)) = (reference.shorthand(), reference.target()) else {
                continue;
            };

            let object = self.repo.find_object(target, None)?;
            let tag_target = if object.kind() == Some(ObjectType::Tag) {
                match object.peel_to_commit() {
                    Ok(commit) => TagTarget::Annotated {
                        commit: commit.id(),
                    },
                    Err(e) => {
                        debug!(tag = name, error = %e, "Annotated tag does not point to a commit");
                        continue;
                    }
                }
            } else {
                TagTarget::Lightweight { target }
            };

            tags.push(TagRef {
                name: name.to_string(),
                target: tag_target,
            });
        }

        Ok(tags)
    }

    fn is_dirty(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);

        let statuses = self
            .repo
            .statuses(Some(&mut options))
            .map_err(|e| CiuxError::vcs(format!("unable to find worktree status: {}", e)))?;

        Ok(statuses.iter().any(|entry| {
            let status = entry.status();
            status != Status::CURRENT && !status.intersects(Status::WT_NEW | Status::IGNORED)
        }))
    }

    fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<Oid> {
        let head = self.repo.head()?.peel_to_commit()?;
        let signature = self.repo.signature()?;

        self.repo
            .tag(name, head.as_object(), &signature, message, false)
            .map_err(|e| CiuxError::vcs(format!("Cannot create tag {}: {}", name, e)))
    }

    fn push_tags(&self, remote: &str, tag_names: &[&str]) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote)
            .map_err(|e| CiuxError::vcs(format!("Cannot find remote: {}", e)))?;

        let refspecs: Vec<String> = tag_names
            .iter()
            .map(|tag| format!("refs/tags/{}:refs/tags/{}", tag, tag))
            .collect();

        let mut push_options = PushOptions::new();
        push_options.remote_callbacks(remote_callbacks());

        remote
            .push(&refspecs, Some(&mut push_options))
            .map_err(|e| CiuxError::vcs(format!("Push failed: {}", e)))?;

        Ok(())
    }
}
