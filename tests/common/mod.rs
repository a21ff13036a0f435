#![allow(dead_code)]

use git2::{Oid, Repository, Signature, Time};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Temporary git repository with a controllable commit clock
pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
    clock: i64,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Could not create temp dir");
        Self::init_in(dir)
    }

    /// Initialise inside `parent/name`, so the repository has a known base name
    pub fn named(name: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix("ciux-test")
            .tempdir()
            .expect("Could not create temp dir");
        let repo_dir = dir.path().join(name);
        fs::create_dir(&repo_dir).expect("Could not create repository dir");
        let repo = init_repo(&repo_dir);
        TestRepo {
            dir,
            repo,
            clock: 1_700_000_000,
        }
    }

    fn init_in(dir: TempDir) -> Self {
        let repo = init_repo(dir.path());
        TestRepo {
            dir,
            repo,
            clock: 1_700_000_000,
        }
    }

    pub fn path(&self) -> &Path {
        self.repo.workdir().expect("Repository has a workdir")
    }

    fn signature(&mut self) -> Signature<'static> {
        self.clock += 60;
        Signature::new("Test User", "test@example.com", &Time::new(self.clock, 0))
            .expect("Could not build signature")
    }

    /// Write `path` and commit it on top of HEAD
    pub fn commit_file(&mut self, path: &str, content: &str) -> Oid {
        self.commit_to("HEAD", path, content)
    }

    /// Write `path` and commit it to `reference`
    pub fn commit_to(&mut self, reference: &str, path: &str, content: &str) -> Oid {
        let signature = self.signature();
        let full_path = self.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Could not create parent dirs");
        }
        fs::write(&full_path, content).expect("Could not write file");

        let mut index = self.repo.index().expect("Could not get index");
        index.add_path(Path::new(path)).expect("Could not add file to index");
        index.write().expect("Could not write index");
        let tree_id = index.write_tree().expect("Could not write tree");
        let tree = self.repo.find_tree(tree_id).expect("Could not find tree");

        let parent = self
            .repo
            .refname_to_id(reference)
            .ok()
            .and_then(|id| self.repo.find_commit(id).ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(
                Some(reference),
                &signature,
                &signature,
                &format!("Update {}", path),
                &tree,
                &parents,
            )
            .expect("Could not create commit")
    }

    pub fn annotated_tag(&mut self, name: &str, target: Oid) {
        let signature = self.signature();
        let object = self.repo.find_object(target, None).expect("Could not find object");
        self.repo
            .tag(name, &object, &signature, &format!("Release {}", name), false)
            .expect("Could not create tag");
    }

    pub fn lightweight_tag(&self, name: &str, target: Oid) {
        let object = self.repo.find_object(target, None).expect("Could not find object");
        self.repo
            .tag_lightweight(name, &object, false)
            .expect("Could not create tag");
    }

    /// Create `branch` at HEAD and check it out
    pub fn checkout_new_branch(&self, branch: &str) {
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("Could not resolve HEAD");
        self.repo.branch(branch, &head, false).expect("Could not create branch");
        self.repo
            .set_head(&format!("refs/heads/{}", branch))
            .expect("Could not set HEAD");
    }

    pub fn write_config(&mut self, content: &str) -> Oid {
        self.commit_file(".ciux.yaml", content)
    }
}

fn init_repo(path: &Path) -> Repository {
    let repo = Repository::init(path).expect("Could not init git repo");
    {
        let mut config = repo.config().expect("Could not get config");
        config
            .set_str("user.name", "Test User")
            .expect("Could not set user.name");
        config
            .set_str("user.email", "test@example.com")
            .expect("Could not set user.email");
    }
    repo
}

pub fn short(oid: Oid) -> String {
    oid.to_string()[..7].to_string()
}
