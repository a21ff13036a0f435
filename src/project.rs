use crate::config::{load_project_config, ProjectConfig};
use crate::dependency::Dependency;
use crate::domain::{Image, Selector};
use crate::error::{CiuxError, Result};
use crate::git::{Git2Repository, RepoHandle, Repository};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Options set from the command line when opening a project
#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    /// Branch used instead of the checked-out one (CI checkouts are often detached)
    pub forced_branch: Option<String>,
    /// Label selector expression filtering dependencies
    pub selector: Option<String>,
    /// Ignore every dependency
    pub main_only: bool,
    /// Overrides the temporary registry of the configuration
    pub temporary_registry: Option<String>,
}

/// Main repository, its selected dependencies and image settings
#[derive(Debug)]
pub struct Project {
    pub main: RepoHandle,
    pub source_paths: Vec<String>,
    pub image_registry: String,
    pub temporary_registry: Option<String>,
    pub dependencies: Vec<Dependency>,
    pub forced_branch: Option<String>,
    pub selector: Selector,
    /// Resolved by [crate::resolver::resolve_image]
    pub image: Option<Image>,
    main_only: bool,
}

impl Project {
    /// Open the repository containing `repo_path` and load its configuration
    pub fn open(repo_path: &Path, options: ProjectOptions) -> Result<Self> {
        let repo = Git2Repository::open(repo_path)?;
        let root: PathBuf = repo
            .workdir()
            .map(|dir| dir.components().collect::<PathBuf>())
            .ok_or_else(|| CiuxError::vcs(format!("{} has no working tree", repo_path.display())))?;

        let config = load_project_config(&root)?;
        let main = RepoHandle::local(root.to_string_lossy(), Box::new(repo));
        Project::from_config(main, config, options)
    }

    /// Build a project around an already opened main repository
    pub fn from_config(main: RepoHandle, config: ProjectConfig, options: ProjectOptions) -> Result<Self> {
        config.validate()?;

        let selector = match options.selector.as_deref() {
            Some(expr) if !options.main_only => Selector::parse(expr)?,
            _ => Selector::everything(),
        };
        debug!(selector = %selector, "Label selector");

        let mut dependencies = Vec::new();
        if !options.main_only {
            for dep_config in &config.dependencies {
                let dep = Dependency::from_config(dep_config)?;
                if selector.matches(&dep_config.labels) {
                    debug!(labels = ?dep_config.labels, dep = %dep, "Dependency selected");
                    dependencies.push(dep);
                }
            }
        }

        let temporary_registry = options
            .temporary_registry
            .filter(|r| !r.is_empty())
            .or_else(|| config.temporary_registry().map(String::from));

        Ok(Project {
            main,
            source_paths: config.source_paths,
            image_registry: config.registry,
            temporary_registry,
            dependencies,
            forced_branch: options.forced_branch.filter(|b| !b.is_empty()),
            selector,
            image: None,
            main_only: options.main_only,
        })
    }

    /// First line of the generated shell file
    pub fn description(&self) -> String {
        if self.main_only || self.selector.is_everything() {
            "Core project".to_string()
        } else {
            format!("Label selectors: {}", self.selector)
        }
    }

    pub fn git_dependencies(&self) -> impl Iterator<Item = &RepoHandle> {
        self.dependencies.iter().filter_map(Dependency::repo)
    }

    pub fn git_dependencies_mut(&mut self) -> impl Iterator<Item = &mut RepoHandle> {
        self.dependencies.iter_mut().filter_map(Dependency::repo_mut)
    }

    /// Human-readable state of the project and its dependencies
    pub fn summary(&self) -> Result<String> {
        let revision = self.main.head_revision()?;
        let mut msg = format!(
            "Project {}\n  {}@{}\n",
            self.main.name(),
            self.main.root()?.display(),
            revision.version()
        );

        if self.dependencies.is_empty() {
            return Ok(msg);
        }

        msg.push_str("Dependencies:");
        for dep in &self.dependencies {
            match dep {
                Dependency::Package { id } => {
                    let _ = write!(msg, "\n  Package: {}", id);
                }
                Dependency::Image { reference } => {
                    let _ = write!(msg, "\n  Image: {}", reference);
                }
                Dependency::Git { repo, pull, .. } => {
                    if repo.is_remote_only() {
                        let _ = write!(
                            msg,
                            "\n  {} remote-only=true branch={} commit={}",
                            repo.url,
                            repo.work_branch.as_deref().unwrap_or_default(),
                            repo.remote_hash.map(|h| h.to_string()).unwrap_or_default()
                        );
                    } else {
                        let _ = write!(
                            msg,
                            "\n  {} {} in-place={}",
                            repo.root()?.display(),
                            repo.head_revision()?.version(),
                            repo.in_place
                        );
                    }
                    if *pull {
                        msg.push_str(" pull=true");
                    }
                }
            }
        }
        Ok(msg)
    }
}
