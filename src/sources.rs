use crate::dependency::Dependency;
use crate::domain::Image;
use crate::error::{CiuxError, Result};
use crate::git::Git2Repository;
use crate::project::Project;
use crate::registry::ImageRegistry;
use std::path::Path;
use tracing::{debug, info, warn};

/// Make the sources of every `clone` dependency available under `base_dir`
///
/// `base_dir/<name>` is reused when it already is a git repository,
/// otherwise the dependency is cloned there at its work branch.
pub fn retrieve_dependency_sources(project: &mut Project, base_dir: &Path) -> Result<()> {
    debug!(base_dir = %base_dir.display(), "Retrieve dependencies sources locally");

    for dep in project.dependencies.iter_mut() {
        let Dependency::Git { repo, clone: true, .. } = dep else {
            continue;
        };
        if !repo.is_remote_only() {
            continue;
        }

        let path = base_dir.join(repo.name());
        if let Some(existing) = Git2Repository::open_if_exists(&path)? {
            info!(path = %path.display(), "Dependency sources in place");
            repo.attach(Box::new(existing), true);
            continue;
        }

        let branch = repo.work_branch.clone().ok_or_else(|| {
            CiuxError::vcs(format!("no work branch resolved for {}, unable to clone", repo.url))
        })?;
        info!(url = %repo.url, branch = %branch, path = %path.display(), "Cloning dependency");
        let cloned = Git2Repository::clone_branch(&repo.url, &branch, &path)?;
        repo.attach(Box::new(cloned), false);
    }

    Ok(())
}

/// Images a dependency requires to be published already
fn required_image(project: &Project, dep: &Dependency) -> Result<Option<String>> {
    match dep {
        Dependency::Git { repo, pull: true, .. } => {
            let version = repo.head_revision().map_err(|e| {
                CiuxError::vcs(format!("unable to describe dependency {}: {}", repo.url, e))
            })?;
            let image = Image::new(project.image_registry.as_str(), repo.name(), version.version());
            Ok(Some(image.url()))
        }
        Dependency::Image { reference } => Ok(Some(reference.clone())),
        _ => Ok(None),
    }
}

/// Check that the images of `pull` git dependencies and image dependencies exist
///
/// # Returns
/// * `Ok(references)` - Every required image, all found in their registry
/// * `Err(NotFound)` - If one is missing, or its registry cannot be queried
/// * `Err` - If a dependency cannot be described
pub fn check_dependency_images(project: &Project, registry: &dyn ImageRegistry) -> Result<Vec<String>> {
    let mut found = Vec::new();

    for dep in &project.dependencies {
        let Some(reference) = required_image(project, dep)? else {
            continue;
        };

        debug!(image = %reference, "Check image existence");
        match registry.exists(&reference) {
            Ok(true) => found.push(reference),
            Ok(false) => {
                return Err(CiuxError::not_found(format!("image {} is not in registry", reference)));
            }
            Err(e) => {
                warn!(image = %reference, error = %e, "Registry query failed");
                return Err(CiuxError::not_found(format!(
                    "image {} is not in registry: {}",
                    reference, e
                )));
            }
        }
    }

    Ok(found)
}
