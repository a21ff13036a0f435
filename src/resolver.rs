//! Image resolution: reuse an already published image when the sources
//! have not changed since it was built.

use crate::boundary::BoundaryWarning;
use crate::describe::describe_with_index;
use crate::domain::Image;
use crate::error::Result;
use crate::project::Project;
use crate::registry::ImageRegistry;
use crate::scanner::find_equivalence_chain;
use crate::tag_index::build_semver_tag_index;
use tracing::{debug, info, warn};

/// Repository base name, with `-suffix` appended when a suffix is given
pub fn image_name(project: &Project, suffix: &str) -> String {
    let name = project.main.name();
    if suffix.is_empty() {
        name.to_string()
    } else {
        format!("{}-{}", name, suffix)
    }
}

/// Compute `project.image`
///
/// With `check_registry`, every commit of the source equivalence chain of
/// HEAD is checked oldest first, and the first image present in the
/// registry is used. Otherwise, or when none is present, the image is
/// tagged with the HEAD version and sent to the temporary registry if one
/// is configured.
///
/// Query failures count as "not in registry" and are returned as warnings.
pub fn resolve_image(
    project: &mut Project,
    registry: &dyn ImageRegistry,
    suffix: &str,
    check_registry: bool,
) -> Result<Vec<BoundaryWarning>> {
    let name = image_name(project, suffix);
    let mut warnings = Vec::new();

    let found = if check_registry {
        find_in_registry(project, registry, &name, &mut warnings)?
    } else {
        None
    };

    let image = match found {
        Some(image) => image,
        None => {
            let version = project.main.head_revision()?.version();
            let target_registry = project
                .temporary_registry
                .clone()
                .unwrap_or_else(|| project.image_registry.clone());
            let image = Image::new(target_registry, name, version);
            debug!(image = %image, "Image not found in registry");
            image
        }
    };

    info!(image = %image, "Project image");
    project.image = Some(image);
    Ok(warnings)
}

fn find_in_registry(
    project: &Project,
    registry: &dyn ImageRegistry,
    name: &str,
    warnings: &mut Vec<BoundaryWarning>,
) -> Result<Option<Image>> {
    let repo = project.main.repository()?;
    debug!(source_paths = ?project.source_paths, "Project source directories");

    let head = repo.head_commit()?;
    let chain = find_equivalence_chain(repo, head, &project.source_paths)?;
    let index = build_semver_tag_index(repo)?;

    for commit in chain {
        let revision = describe_with_index(repo, &index, commit)?;
        let mut image = Image::new(project.image_registry.as_str(), name, revision.version());
        let url = image.url();
        debug!(image = %url, commit = %commit, "Check image in registry");

        match registry.exists(&url) {
            Ok(true) => {
                debug!(image = %url, "Found image in registry");
                image.in_registry = true;
                return Ok(Some(image));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(image = %url, error = %e, "Registry query failed");
                warnings.push(BoundaryWarning::RegistryCheckFailed {
                    image: url,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(None)
}

/// Image pushed once the pipeline succeeds: permanent registry, HEAD version
pub fn promoted_image(project: &Project, name: &str) -> Result<Image> {
    let version = project.main.head_revision()?.version();
    Ok(Image::new(project.image_registry.as_str(), name, version))
}

/// HEAD image in the temporary registry, if one is configured
pub fn temporary_image(project: &Project, name: &str) -> Result<Option<Image>> {
    match &project.temporary_registry {
        Some(registry) => {
            let version = project.main.head_revision()?.version();
            Ok(Some(Image::new(registry.as_str(), name, version)))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::error::CiuxError;
    use crate::git::{MockRepository, RepoHandle};
    use crate::project::ProjectOptions;
    use git2::Oid;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Registry answering from a fixed table, recording queries
    struct FakeRegistry {
        answers: HashMap<String, Result<bool>>,
        queried: RefCell<Vec<String>>,
    }

    impl FakeRegistry {
        fn new() -> Self {
            FakeRegistry {
                answers: HashMap::new(),
                queried: RefCell::new(Vec::new()),
            }
        }

        fn with(mut self, url: String, answer: Result<bool>) -> Self {
            self.answers.insert(url, answer);
            self
        }
    }

    impl ImageRegistry for FakeRegistry {
        fn exists(&self, reference: &str) -> Result<bool> {
            self.queried.borrow_mut().push(reference.to_string());
            match self.answers.get(reference) {
                Some(Ok(found)) => Ok(*found),
                Some(Err(e)) => Err(CiuxError::registry(e.to_string())),
                None => Ok(false),
            }
        }
    }

    struct Fixture {
        project: Project,
        commits: Vec<Oid>,
    }

    /// v1.0.0 on the first commit, then rootfs change, then two unrelated commits
    fn fixture(temporary_registry: Option<&str>) -> Fixture {
        let mut repo = MockRepository::new();
        let c0 = repo.commit(&["README.md"]);
        repo.add_annotated_tag("v1.0.0", c0);
        let c1 = repo.commit(&["rootfs"]);
        let c2 = repo.commit(&["docs.md"]);
        let c3 = repo.commit(&["notes.md"]);

        let config = ProjectConfig {
            registry: "registry.example.org/team".to_string(),
            temporary_registry: temporary_registry.map(String::from),
            source_paths: vec!["rootfs".to_string()],
            ..Default::default()
        };
        let main = RepoHandle::local("/src/My-Project", Box::new(repo));
        let project = Project::from_config(main, config, ProjectOptions::default()).unwrap();
        Fixture {
            project,
            commits: vec![c0, c1, c2, c3],
        }
    }

    fn url(registry: &str, commit: Oid, counter: usize) -> String {
        format!("{}/my-project:v1.0.0-{}-g{}", registry, counter, &commit.to_string()[..7])
    }

    #[test]
    fn test_image_name_suffix() {
        let f = fixture(None);
        assert_eq!(image_name(&f.project, ""), "My-Project");
        assert_eq!(image_name(&f.project, "noscience"), "My-Project-noscience");
    }

    #[test]
    fn test_oldest_equivalent_image_wins() {
        let mut f = fixture(None);
        let registry_url = "registry.example.org/team";
        let registry = FakeRegistry::new()
            .with(url(registry_url, f.commits[1], 1), Ok(true))
            .with(url(registry_url, f.commits[2], 2), Ok(true));

        let warnings = resolve_image(&mut f.project, &registry, "", true).unwrap();
        assert!(warnings.is_empty());

        let image = f.project.image.unwrap();
        assert!(image.in_registry);
        assert_eq!(image.url(), url(registry_url, f.commits[1], 1));
        assert_eq!(registry.queried.borrow().len(), 1);
    }

    #[test]
    fn test_chain_is_queried_oldest_first() {
        let mut f = fixture(None);
        let registry_url = "registry.example.org/team";
        let registry = FakeRegistry::new().with(url(registry_url, f.commits[3], 3), Ok(true));

        resolve_image(&mut f.project, &registry, "", true).unwrap();

        let expected: Vec<String> = [(1, 1), (2, 2), (3, 3)]
            .iter()
            .map(|(i, n)| url(registry_url, f.commits[*i], *n))
            .collect();
        assert_eq!(*registry.queried.borrow(), expected);
        assert!(f.project.image.unwrap().in_registry);
    }

    #[test]
    fn test_not_found_uses_head_and_temporary_registry() {
        let mut f = fixture(Some("localhost:5000"));
        let registry = FakeRegistry::new();

        resolve_image(&mut f.project, &registry, "", true).unwrap();

        let image = f.project.image.unwrap();
        assert!(!image.in_registry);
        assert_eq!(image.url(), url("localhost:5000", f.commits[3], 3));
    }

    #[test]
    fn test_query_errors_become_warnings() {
        let mut f = fixture(None);
        let registry_url = "registry.example.org/team";
        let failing = url(registry_url, f.commits[1], 1);
        let registry = FakeRegistry::new()
            .with(failing.clone(), Err(CiuxError::registry("connection refused")))
            .with(url(registry_url, f.commits[2], 2), Ok(true));

        let warnings = resolve_image(&mut f.project, &registry, "", true).unwrap();

        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            BoundaryWarning::RegistryCheckFailed { image, .. } if *image == failing
        ));
        assert_eq!(f.project.image.unwrap().url(), url(registry_url, f.commits[2], 2));
    }

    #[test]
    fn test_without_registry_check_nothing_is_queried() {
        let mut f = fixture(None);
        let registry = FakeRegistry::new();

        resolve_image(&mut f.project, &registry, "ci", false).unwrap();

        assert!(registry.queried.borrow().is_empty());
        let image = f.project.image.unwrap();
        assert!(!image.in_registry);
        assert_eq!(image.name, "My-Project-ci");
        assert_eq!(image.registry, "registry.example.org/team");
    }

    #[test]
    fn test_promoted_and_temporary_images() {
        let f = fixture(Some("localhost:5000"));
        let promoted = promoted_image(&f.project, "My-Project").unwrap();
        assert_eq!(promoted.url(), url("registry.example.org/team", f.commits[3], 3));

        let temporary = temporary_image(&f.project, "My-Project").unwrap().unwrap();
        assert_eq!(temporary.registry, "localhost:5000");

        let f = fixture(None);
        assert!(temporary_image(&f.project, "My-Project").unwrap().is_none());
    }
}
