use crate::error::{CiuxError, Result};
use crate::git::{CommitLog, FileChange, Repository, TagRef, TagTarget};
use git2::Oid;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
struct MockCommit {
    parents: Vec<Oid>,
    changes: Vec<FileChange>,
}

/// In-memory commit graph for testing without actual git operations
///
/// Commits created through [MockRepository::commit] advance HEAD, like
/// committing in a worktree would.
pub struct MockRepository {
    commits: HashMap<Oid, MockCommit>,
    tags: RefCell<Vec<TagRef>>,
    pushed: RefCell<Vec<String>>,
    head: Option<Oid>,
    branch: Option<String>,
    dirty: bool,
    workdir: Option<PathBuf>,
    next_id: u64,
}

impl MockRepository {
    /// Create a new empty mock repository on branch "main"
    pub fn new() -> Self {
        MockRepository {
            commits: HashMap::new(),
            tags: RefCell::new(Vec::new()),
            pushed: RefCell::new(Vec::new()),
            head: None,
            branch: Some("main".to_string()),
            dirty: false,
            workdir: None,
            next_id: 0,
        }
    }

    fn next_oid(&mut self) -> Oid {
        self.next_id += 1;
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&self.next_id.to_be_bytes());
        bytes[0] = 0xc1;
        Oid::from_bytes(&bytes).unwrap_or_else(|_| Oid::zero())
    }

    /// Add a commit with explicit id, parents and file changes
    pub fn add_commit(&mut self, oid: Oid, parents: &[Oid], changes: Vec<FileChange>) {
        self.commits.insert(
            oid,
            MockCommit {
                parents: parents.to_vec(),
                changes,
            },
        );
    }

    /// Commit modifications of `paths` on top of HEAD and move HEAD to it
    pub fn commit(&mut self, paths: &[&str]) -> Oid {
        let changes = paths.iter().map(|p| FileChange::modified(*p)).collect();
        self.commit_changes(changes)
    }

    /// Commit arbitrary file changes on top of HEAD and move HEAD to it
    pub fn commit_changes(&mut self, changes: Vec<FileChange>) -> Oid {
        let oid = self.next_oid();
        let parents: Vec<Oid> = self.head.into_iter().collect();
        self.add_commit(oid, &parents, changes);
        self.head = Some(oid);
        oid
    }

    /// Merge commit whose first parent is HEAD and second parent `other`
    pub fn merge(&mut self, other: Oid, paths: &[&str]) -> Oid {
        let oid = self.next_oid();
        let mut parents: Vec<Oid> = self.head.into_iter().collect();
        parents.push(other);
        let changes = paths.iter().map(|p| FileChange::modified(*p)).collect();
        self.add_commit(oid, &parents, changes);
        self.head = Some(oid);
        oid
    }

    pub fn set_head(&mut self, oid: Oid) {
        self.head = Some(oid);
    }

    /// Set the checked-out branch, `None` for a detached HEAD
    pub fn set_branch(&mut self, branch: Option<&str>) {
        self.branch = branch.map(String::from);
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn set_workdir(&mut self, path: impl Into<PathBuf>) {
        self.workdir = Some(path.into());
    }

    pub fn add_annotated_tag(&mut self, name: impl Into<String>, commit: Oid) {
        self.tags.borrow_mut().push(TagRef {
            name: name.into(),
            target: TagTarget::Annotated { commit },
        });
    }

    pub fn add_lightweight_tag(&mut self, name: impl Into<String>, target: Oid) {
        self.tags.borrow_mut().push(TagRef {
            name: name.into(),
            target: TagTarget::Lightweight { target },
        });
    }

    /// Tags pushed so far, in push order
    pub fn pushed_tags(&self) -> Vec<String> {
        self.pushed.borrow().clone()
    }

    fn find(&self, oid: Oid) -> Result<&MockCommit> {
        self.commits
            .get(&oid)
            .ok_or_else(|| CiuxError::vcs(format!("commit not found: {}", oid)))
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository for MockRepository {
    fn head_commit(&self) -> Result<Oid> {
        self.head
            .ok_or_else(|| CiuxError::vcs("unable to find head: repository is empty"))
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.branch.clone())
    }

    fn log(&self, from: Oid) -> Result<CommitLog<'_>> {
        let mut history = Vec::new();
        let mut current = Some(from);
        while let Some(oid) = current {
            current = self.find(oid)?.parents.first().copied();
            history.push(Ok(oid));
        }
        Ok(Box::new(history.into_iter()))
    }

    fn first_parent(&self, commit: Oid) -> Result<Option<Oid>> {
        Ok(self.find(commit)?.parents.first().copied())
    }

    fn diff_against_parent(&self, commit: Oid) -> Result<Vec<FileChange>> {
        Ok(self.find(commit)?.changes.clone())
    }

    fn tags(&self) -> Result<Vec<TagRef>> {
        Ok(self.tags.borrow().clone())
    }

    fn is_dirty(&self) -> Result<bool> {
        Ok(self.dirty)
    }

    fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    fn create_annotated_tag(&self, name: &str, _message: &str) -> Result<Oid> {
        let head = self.head_commit()?;
        let mut tags = self.tags.borrow_mut();
        if tags.iter().any(|t| t.name == name) {
            return Err(CiuxError::vcs(format!("tag {} already exists", name)));
        }
        tags.push(TagRef {
            name: name.to_string(),
            target: TagTarget::Annotated { commit: head },
        });
        Ok(head)
    }

    fn push_tags(&self, _remote: &str, tag_names: &[&str]) -> Result<()> {
        self.pushed
            .borrow_mut()
            .extend(tag_names.iter().map(|t| t.to_string()));
        Ok(())
    }
}
