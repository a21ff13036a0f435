//! Work branch resolution for dependency repositories
//!
//! A dependency follows the project: it is worked on the branch of the
//! same name when the remote has one, on its own main branch otherwise.

use crate::boundary::BoundaryWarning;
use crate::error::{CiuxError, Result};
use crate::git::RemoteLister;
use crate::project::Project;
use tracing::{debug, info, warn};

/// Branch the main repository is worked on: forced, or checked out
pub fn main_work_branch(project: &Project) -> Result<String> {
    if let Some(forced) = &project.forced_branch {
        return Ok(forced.clone());
    }
    project.main.repository()?.current_branch()?.ok_or_else(|| {
        CiuxError::vcs(format!(
            "HEAD of {} is detached, a branch must be forced",
            project.main.url
        ))
    })
}

/// Set the work branch of the main repository and of every git dependency
///
/// # Returns
/// * `Ok(warnings)` - One [BoundaryWarning::MissingMainBranch] per dependency
///   that has neither the project branch nor `main`/`master`
/// * `Err` - If the main branch is unknown or a remote listing fails
pub fn resolve_work_branches(project: &mut Project, lister: &dyn RemoteLister) -> Result<Vec<BoundaryWarning>> {
    let branch = main_work_branch(project)?;
    info!(branch = %branch, "Project work branch");
    project.main.work_branch = Some(branch.clone());

    let mut warnings = Vec::new();
    for dep in project.git_dependencies_mut() {
        let refs = lister.list(&dep.url).map_err(|e| {
            CiuxError::vcs(format!("unable to ls-remote for dependency repository {}: {}", dep.url, e))
        })?;

        let resolved = match refs.branch(&branch) {
            Some(hash) => Ok((branch.clone(), hash)),
            None => refs.main_branch(),
        };

        match resolved {
            Ok((work_branch, hash)) => {
                debug!(url = %dep.url, branch = %work_branch, commit = %hash, "Dependency");
                dep.work_branch = Some(work_branch);
                dep.remote_hash = Some(hash);
                dep.remote_refs = Some(refs);
            }
            Err(CiuxError::NotFound(reason)) => {
                warn!(url = %dep.url, %reason, "No work branch for dependency");
                warnings.push(BoundaryWarning::MissingMainBranch { url: dep.url.clone() });
            }
            Err(e) => return Err(e),
        }
    }

    Ok(warnings)
}
