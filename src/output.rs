//! Shell environment file consumed by CI pipelines

use crate::config::CIUXCONFIG_ENV;
use crate::dependency::Dependency;
use crate::domain::ImageReference;
use crate::error::{CiuxError, Result};
use crate::git::RepoHandle;
use crate::project::Project;
use crate::resolver::{promoted_image, temporary_image};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the env file goes: `$CIUXCONFIG`, else `<repo>/.ciux.d/ciux<selector>.sh`
pub fn env_file_path(project: &Project) -> Result<PathBuf> {
    match std::env::var(CIUXCONFIG_ENV) {
        Ok(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(project
            .main
            .root()?
            .join(".ciux.d")
            .join(format!("ciux{}.sh", project.selector.to_file_suffix()))),
    }
}

fn export_repository(out: &mut String, repo: &RepoHandle) -> Result<()> {
    let prefix = repo.env_prefix();
    if !repo.is_remote_only() {
        let _ = writeln!(out, "export {}_DIR={}", prefix, repo.root()?.display());
        let _ = writeln!(out, "export {}_VERSION={}", prefix, repo.head_revision()?.version());
    }
    let _ = writeln!(
        out,
        "export {}_WORKBRANCH={}",
        prefix,
        repo.work_branch.as_deref().unwrap_or_default()
    );
    Ok(())
}

/// Render the env file of a project whose image is resolved
pub fn render_env(project: &Project) -> Result<String> {
    let image = project
        .image
        .as_ref()
        .ok_or_else(|| CiuxError::not_found("project image is not resolved"))?;

    let mut out = String::new();
    let _ = writeln!(out, "# {}", project.description());

    for repo in project.git_dependencies().chain(std::iter::once(&project.main)) {
        export_repository(&mut out, repo)?;
    }

    for dep in &project.dependencies {
        if let Dependency::Image { reference } = dep {
            let prefix = ImageReference::parse(reference)?.env_prefix();
            let _ = writeln!(out, "export {}_IMAGE={}", prefix, reference);
        }
    }

    let _ = writeln!(out, "export CIUX_IMAGE_REGISTRY={}", project.image_registry);
    let _ = writeln!(out, "export CIUX_IMAGE_NAME={}", image.name);
    let _ = writeln!(
        out,
        "# Image which contains latest code source changes {}_VERSION",
        project.main.env_prefix()
    );
    let _ = writeln!(out, "export CIUX_IMAGE_TAG={}", image.tag);
    let _ = writeln!(out, "export CIUX_IMAGE_URL={}", image.url());
    let _ = writeln!(out, "# True if CIUX_IMAGE_URL need to be built");
    let _ = writeln!(out, "export CIUX_BUILD={}", !image.in_registry);

    let promoted = promoted_image(project, &image.name)?;
    let _ = writeln!(out, "# Promoted image is the image which will be pushed if CI runs successfully");
    let _ = writeln!(out, "export CIUX_PROMOTED_IMAGE_URL={}", promoted.url());

    if let Some(temporary) = temporary_image(project, &image.name)? {
        let _ = writeln!(out, "# Temporary image is the image built and pushed during the CI run");
        let _ = writeln!(out, "export CIUX_TEMPORARY_IMAGE_URL={}", temporary.url());
    }

    Ok(out)
}

/// Write the env file and return its path
pub fn write_env_file(project: &Project) -> Result<PathBuf> {
    let path = env_file_path(project)?;
    let content = render_env(project)?;
    write_file(&path, &content)?;
    debug!(path = %path.display(), "Configuration file written");
    Ok(path)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}
