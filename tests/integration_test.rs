// tests/integration_test.rs
mod common;

use ciux::branches::resolve_work_branches;
use ciux::dependency::Dependency;
use ciux::describe::{describe, head_revision};
use ciux::git::{Git2RemoteLister, Git2Repository, RemoteLister, Repository};
use ciux::project::{Project, ProjectOptions};
use ciux::registry::ImageRegistry;
use ciux::release::create_release_tag;
use ciux::resolver::resolve_image;
use ciux::scanner::find_equivalence_chain;
use ciux::sources::{check_dependency_images, retrieve_dependency_sources};
use ciux::{CiuxError, Result};
use common::{short, TestRepo};
use std::collections::HashSet;
use std::fs;
use tempfile::TempDir;

/// Registry answering from a fixed set of image URLs
struct FakeRegistry {
    images: HashSet<String>,
}

impl FakeRegistry {
    fn with(images: &[&str]) -> Self {
        FakeRegistry {
            images: images.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ImageRegistry for FakeRegistry {
    fn exists(&self, reference: &str) -> Result<bool> {
        Ok(self.images.contains(reference))
    }
}

fn open(test_repo: &TestRepo) -> Git2Repository {
    Git2Repository::open(test_repo.path()).expect("Should open repository")
}

// ============================================================================
// Describe
// ============================================================================

#[test]
fn test_describe_counts_commits_since_tag() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("a.txt", "a");
    test_repo.annotated_tag("v1.0.0", c1);
    test_repo.commit_file("b.txt", "b");
    let c3 = test_repo.commit_file("c.txt", "c");

    let repo = open(&test_repo);
    let revision = head_revision(&repo).unwrap();
    assert_eq!(revision.tag, "v1.0.0");
    assert_eq!(revision.counter, 2);
    assert_eq!(revision.version(), format!("v1.0.0-2-g{}", short(c3)));
    assert!(revision.branch.is_some());
}

#[test]
fn test_describe_on_tagged_commit() {
    let mut test_repo = TestRepo::new();
    test_repo.commit_file("a.txt", "a");
    let c2 = test_repo.commit_file("b.txt", "b");
    test_repo.annotated_tag("v2.1.0-rc3", c2);

    let repo = open(&test_repo);
    assert_eq!(describe(&repo, c2).unwrap().version(), "v2.1.0-rc3");
}

#[test]
fn test_describe_ignores_lightweight_and_non_semver_tags() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("a.txt", "a");
    test_repo.annotated_tag("v0.9.0", c1);
    let c2 = test_repo.commit_file("b.txt", "b");
    test_repo.lightweight_tag("v1.0.0", c2);
    test_repo.annotated_tag("nightly", c2);
    let c3 = test_repo.commit_file("c.txt", "c");

    let repo = open(&test_repo);
    assert_eq!(
        head_revision(&repo).unwrap().version(),
        format!("v0.9.0-2-g{}", short(c3))
    );
}

#[test]
fn test_describe_without_tag() {
    let mut test_repo = TestRepo::new();
    test_repo.commit_file("a.txt", "a");
    let c2 = test_repo.commit_file("b.txt", "b");

    let repo = open(&test_repo);
    let revision = head_revision(&repo).unwrap();
    assert!(revision.tag.is_empty());
    assert_eq!(revision.version(), format!("v0-2-g{}", short(c2)));
    assert_eq!(revision.upgrade_tag().unwrap(), "v0");
}

#[test]
fn test_dirty_tracked_file() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("a.txt", "a");
    test_repo.annotated_tag("v1.0.0", c1);

    fs::write(test_repo.path().join("a.txt"), "changed").unwrap();

    let repo = open(&test_repo);
    assert!(repo.is_dirty().unwrap());
    assert_eq!(head_revision(&repo).unwrap().version(), "v1.0.0-dirty");
}

#[test]
fn test_untracked_file_is_not_dirty() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("a.txt", "a");
    test_repo.annotated_tag("v1.0.0", c1);

    fs::write(test_repo.path().join("new.txt"), "untracked").unwrap();

    let repo = open(&test_repo);
    assert!(!repo.is_dirty().unwrap());
    assert_eq!(head_revision(&repo).unwrap().version(), "v1.0.0");
}

#[test]
fn test_detached_head_has_no_branch() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("a.txt", "a");
    test_repo.commit_file("b.txt", "b");
    test_repo.repo.set_head_detached(c1).unwrap();

    let repo = open(&test_repo);
    assert_eq!(repo.current_branch().unwrap(), None);
    assert_eq!(repo.head_commit().unwrap(), c1);
}

// ============================================================================
// Source equivalence chain
// ============================================================================

#[test]
fn test_chain_stops_at_last_source_change() {
    let mut test_repo = TestRepo::new();
    test_repo.commit_file("README.md", "init");
    let c1 = test_repo.commit_file("rootfs/Dockerfile", "FROM alpine");
    let c2 = test_repo.commit_file("README.md", "doc");
    let c3 = test_repo.commit_file("docs/index.md", "more doc");

    let repo = open(&test_repo);
    let chain = find_equivalence_chain(&repo, c3, &["rootfs".to_string()]).unwrap();
    assert_eq!(chain, vec![c1, c2, c3]);
}

#[test]
fn test_chain_directory_prefix_is_not_a_string_prefix() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("rootfs/Dockerfile", "FROM alpine");
    let c2 = test_repo.commit_file("rootfs2/file", "not a source");

    let repo = open(&test_repo);
    let chain = find_equivalence_chain(&repo, c2, &["rootfs".to_string()]).unwrap();
    assert_eq!(chain, vec![c1, c2]);
}

#[test]
fn test_chain_head_changes_sources() {
    let mut test_repo = TestRepo::new();
    test_repo.commit_file("rootfs/Dockerfile", "FROM alpine");
    let c2 = test_repo.commit_file("rootfs/Dockerfile", "FROM debian");

    let repo = open(&test_repo);
    let chain = find_equivalence_chain(&repo, c2, &["rootfs".to_string()]).unwrap();
    assert_eq!(chain, vec![c2]);
}

#[test]
fn test_chain_reaches_root_when_sources_never_change() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("README.md", "init");
    let c2 = test_repo.commit_file("docs/a.md", "a");

    let repo = open(&test_repo);
    let chain = find_equivalence_chain(&repo, c2, &["rootfs".to_string()]).unwrap();
    assert_eq!(chain, vec![c1, c2]);
}

// ============================================================================
// Image resolution
// ============================================================================

fn image_project() -> (TestRepo, Vec<git2::Oid>) {
    let mut test_repo = TestRepo::named("project-x");
    test_repo.write_config("registry: registry.example.org\nsourcePathes:\n  - rootfs\n");
    let c1 = test_repo.commit_file("rootfs/Dockerfile", "FROM alpine");
    test_repo.annotated_tag("v1.0.0", c1);
    let c2 = test_repo.commit_file("README.md", "doc");
    let c3 = test_repo.commit_file("docs/index.md", "more doc");
    (test_repo, vec![c1, c2, c3])
}

#[test]
fn test_resolve_image_reuses_equivalent_image() {
    let (test_repo, commits) = image_project();
    let existing = format!("registry.example.org/project-x:v1.0.0-1-g{}", short(commits[1]));
    let registry = FakeRegistry::with(&[existing.as_str()]);

    let options = ProjectOptions {
        main_only: true,
        ..Default::default()
    };
    let mut project = Project::open(test_repo.path(), options).unwrap();
    let warnings = resolve_image(&mut project, &registry, "", true).unwrap();
    assert!(warnings.is_empty());

    let image = project.image.unwrap();
    assert!(image.in_registry);
    assert_eq!(image.url(), existing);
}

#[test]
fn test_resolve_image_targets_temporary_registry_when_missing() {
    let (test_repo, commits) = image_project();
    let registry = FakeRegistry::with(&[]);

    let options = ProjectOptions {
        main_only: true,
        temporary_registry: Some("localhost:5000".to_string()),
        ..Default::default()
    };
    let mut project = Project::open(test_repo.path(), options).unwrap();
    resolve_image(&mut project, &registry, "noscience", true).unwrap();

    let image = project.image.unwrap();
    assert!(!image.in_registry);
    assert_eq!(
        image.url(),
        format!("localhost:5000/project-x-noscience:v1.0.0-2-g{}", short(commits[2]))
    );
}

// ============================================================================
// Multi-repository projects
// ============================================================================

/// Dependency repository whose only branch is `main`
fn dependency_repo(name: &str) -> TestRepo {
    let mut dep = TestRepo::named(name);
    dep.repo.set_head("refs/heads/main").unwrap();
    let c1 = dep.commit_file("lib.txt", "lib");
    dep.annotated_tag("v0.3.0", c1);
    dep
}

fn main_project(dep: &TestRepo, clone: bool) -> TestRepo {
    let mut main = TestRepo::named("project-x");
    main.write_config(&format!(
        "registry: registry.example.org\ndependencies:\n  - url: {}\n    clone: {}\n    pull: true\n    labels:\n      build: true\n",
        dep.path().display(),
        clone
    ));
    main.checkout_new_branch("feature-x");
    main
}

#[test]
fn test_remote_listing_of_local_repository() {
    let dep = dependency_repo("dep-lib");
    let url = dep.path().to_string_lossy().into_owned();

    let refs = Git2RemoteLister::default().list(&url).unwrap();
    assert!(refs.branch("main").is_some());
    assert!(refs.branch("master").is_none());
    assert_eq!(refs.tags().collect::<Vec<_>>(), vec!["v0.3.0"]);
}

#[test]
fn test_dependency_falls_back_to_main_branch() {
    let dep = dependency_repo("dep-lib");
    let main = main_project(&dep, true);

    let mut project = Project::open(main.path(), ProjectOptions::default()).unwrap();
    let warnings = resolve_work_branches(&mut project, &Git2RemoteLister::default()).unwrap();
    assert!(warnings.is_empty());

    assert_eq!(project.main.work_branch.as_deref(), Some("feature-x"));
    let dep_handle = project.git_dependencies().next().unwrap();
    assert_eq!(dep_handle.name(), "dep-lib");
    assert_eq!(dep_handle.work_branch.as_deref(), Some("main"));
}

#[test]
fn test_dependency_follows_project_branch() {
    let mut dep = dependency_repo("dep-lib");
    dep.commit_to("refs/heads/feature-x", "feature.txt", "wip");
    let main = main_project(&dep, true);

    let mut project = Project::open(main.path(), ProjectOptions::default()).unwrap();
    resolve_work_branches(&mut project, &Git2RemoteLister::default()).unwrap();

    let dep_handle = project.git_dependencies().next().unwrap();
    assert_eq!(dep_handle.work_branch.as_deref(), Some("feature-x"));
}

#[test]
fn test_selector_excludes_dependency() {
    let dep = dependency_repo("dep-lib");
    let main = main_project(&dep, true);

    let options = ProjectOptions {
        selector: Some("build!=true".to_string()),
        ..Default::default()
    };
    let project = Project::open(main.path(), options).unwrap();
    assert!(project.dependencies.is_empty());
    assert_eq!(project.description(), "Label selectors: build!=true");
}

#[test]
fn test_retrieve_sources_clones_work_branch() {
    let dep = dependency_repo("dep-lib");
    let main = main_project(&dep, true);
    let base_dir = TempDir::new().unwrap();

    let mut project = Project::open(main.path(), ProjectOptions::default()).unwrap();
    resolve_work_branches(&mut project, &Git2RemoteLister::default()).unwrap();
    retrieve_dependency_sources(&mut project, base_dir.path()).unwrap();

    let dep_handle = project.git_dependencies().next().unwrap();
    assert!(!dep_handle.in_place);
    assert!(base_dir.path().join("dep-lib").join("lib.txt").is_file());
    assert_eq!(dep_handle.head_revision().unwrap().version(), "v0.3.0");
}

#[test]
fn test_retrieve_sources_uses_existing_checkout() {
    let dep = dependency_repo("dep-lib");
    let main = main_project(&dep, true);

    let mut project = Project::open(main.path(), ProjectOptions::default()).unwrap();
    resolve_work_branches(&mut project, &Git2RemoteLister::default()).unwrap();
    retrieve_dependency_sources(&mut project, dep.dir.path()).unwrap();

    let dep_handle = project.git_dependencies().next().unwrap();
    assert!(dep_handle.in_place);
    assert_eq!(dep_handle.root().unwrap(), dep.path());
}

#[test]
fn test_check_dependency_images() {
    let dep = dependency_repo("dep-lib");
    let main = main_project(&dep, true);

    let mut project = Project::open(main.path(), ProjectOptions::default()).unwrap();
    resolve_work_branches(&mut project, &Git2RemoteLister::default()).unwrap();
    retrieve_dependency_sources(&mut project, dep.dir.path()).unwrap();

    let registry = FakeRegistry::with(&["registry.example.org/dep-lib:v0.3.0"]);
    assert_eq!(
        check_dependency_images(&project, &registry).unwrap(),
        vec!["registry.example.org/dep-lib:v0.3.0".to_string()]
    );

    let empty = FakeRegistry::with(&[]);
    assert!(matches!(
        check_dependency_images(&project, &empty).unwrap_err(),
        CiuxError::NotFound(_)
    ));
}

#[test]
fn test_dependencies_without_clone_stay_remote() {
    let dep = dependency_repo("dep-lib");
    let main = main_project(&dep, false);
    let base_dir = TempDir::new().unwrap();

    let mut project = Project::open(main.path(), ProjectOptions::default()).unwrap();
    resolve_work_branches(&mut project, &Git2RemoteLister::default()).unwrap();
    retrieve_dependency_sources(&mut project, base_dir.path()).unwrap();

    match &project.dependencies[0] {
        Dependency::Git { repo, clone, .. } => {
            assert!(!clone);
            assert!(repo.is_remote_only());
        }
        other => panic!("unexpected dependency {}", other),
    }
    assert!(!base_dir.path().join("dep-lib").exists());
}

// ============================================================================
// Release tags
// ============================================================================

#[test]
fn test_create_release_tag_on_head() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("a.txt", "a");
    test_repo.annotated_tag("v1.0.0", c1);
    test_repo.commit_file("b.txt", "b");

    let repo = open(&test_repo);
    let new_tag = head_revision(&repo).unwrap().upgrade_tag().unwrap();
    assert_eq!(new_tag, "v1.0.1-rc0");

    create_release_tag(&repo, &new_tag).unwrap();
    assert_eq!(head_revision(&repo).unwrap().version(), "v1.0.1-rc0");

    let tag = test_repo
        .repo
        .revparse_single("refs/tags/v1.0.1-rc0")
        .unwrap()
        .peel_to_tag()
        .unwrap();
    assert_eq!(tag.message().map(str::trim), Some("Release v1.0.1-rc0"));

    // Tag already exists
    assert!(create_release_tag(&repo, &new_tag).is_err());
}

#[test]
fn test_release_candidate_increments() {
    let mut test_repo = TestRepo::new();
    let c1 = test_repo.commit_file("a.txt", "a");
    test_repo.annotated_tag("v1.0.1-rc0", c1);
    test_repo.commit_file("b.txt", "b");

    let repo = open(&test_repo);
    assert_eq!(head_revision(&repo).unwrap().upgrade_tag().unwrap(), "v1.0.1-rc1");
}
