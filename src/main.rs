use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use ciux::boundary::BoundaryWarning;
use ciux::branches::resolve_work_branches;
use ciux::dependency::Dependency;
use ciux::describe::head_revision;
use ciux::git::{Git2RemoteLister, Git2Repository};
use ciux::output::write_env_file;
use ciux::project::{Project, ProjectOptions};
use ciux::registry::{HttpRegistry, DEFAULT_QUERY_TIMEOUT};
use ciux::release::{create_release_tag, push_tag, release_commands, DEFAULT_REMOTE};
use ciux::resolver::resolve_image;
use ciux::sources::{check_dependency_images, retrieve_dependency_sources};
use ciux::ui;

#[derive(Parser)]
#[command(
    name = "ciux",
    version,
    about = "Compute build identities and reusable images for multi-repository CI pipelines"
)]
struct Cli {
    /// Increase verbosity (-v info, -vv debug), RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a project for a CI run and write its environment file
    Ignite {
        /// Path to the main repository
        repository: PathBuf,

        /// Branch of the main repository, when HEAD is detached
        #[arg(short, long)]
        branch: Option<String>,

        /// Label selector filtering dependencies
        #[arg(short = 'l', long)]
        selector: Option<String>,

        /// Suffix appended to the image name
        #[arg(long, default_value = "")]
        suffix: String,

        /// Registry receiving images built during the run
        #[arg(long = "tmp-registry")]
        tmp_registry: Option<String>,
    },
    /// Print information about a project
    Get {
        #[command(subcommand)]
        what: GetCommand,
    },
    /// Compute the next release tag
    Tag {
        repository: PathBuf,

        /// Create the annotated tag on HEAD
        #[arg(long)]
        create: bool,

        /// Push the tag to origin
        #[arg(long)]
        push: bool,

        /// Skip confirmation prompts
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum GetCommand {
    /// Version of the repository HEAD
    Revision { repository: PathBuf },
    /// Image to use for the repository HEAD
    Image {
        repository: PathBuf,

        /// Look for an existing image of an equivalent commit
        #[arg(long)]
        check: bool,

        #[arg(long, default_value = "")]
        suffix: String,

        #[arg(short, long)]
        branch: Option<String>,

        #[arg(long = "tmp-registry")]
        tmp_registry: Option<String>,
    },
    /// Selected dependencies and their work branches
    Deps {
        repository: PathBuf,

        #[arg(short = 'l', long)]
        selector: Option<String>,

        #[arg(short, long)]
        branch: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn report(warnings: &[BoundaryWarning]) {
    for warning in warnings {
        ui::display_boundary_warning(warning);
    }
}

fn ignite(
    repository: &Path,
    branch: Option<String>,
    selector: Option<String>,
    suffix: &str,
    tmp_registry: Option<String>,
) -> Result<()> {
    let options = ProjectOptions {
        forced_branch: branch,
        selector,
        main_only: false,
        temporary_registry: tmp_registry,
    };
    let mut project = Project::open(repository, options).context("unable to open project")?;

    let warnings = resolve_work_branches(&mut project, &Git2RemoteLister::default())
        .context("unable to resolve dependency branches")?;
    report(&warnings);

    let root = project.main.root()?;
    let base_dir = root.parent().unwrap_or(root.as_path());
    retrieve_dependency_sources(&mut project, base_dir).context("unable to retrieve dependency sources")?;

    let registry = HttpRegistry::new(DEFAULT_QUERY_TIMEOUT)?;
    let images = check_dependency_images(&project, &registry).context("dependency image check failed")?;
    for image in &images {
        ui::display_success(&format!("Image {} found", image));
    }

    let warnings = resolve_image(&mut project, &registry, suffix, true).context("unable to resolve project image")?;
    report(&warnings);

    let path = write_env_file(&project).context("unable to write configuration file")?;

    println!("{}", project.summary()?);
    if let Some(image) = &project.image {
        ui::display_image(image);
    }
    ui::display_success(&format!("Configuration file:\n  {}", path.display()));
    Ok(())
}

fn get(what: GetCommand) -> Result<()> {
    match what {
        GetCommand::Revision { repository } => {
            let repo = Git2Repository::open(&repository)?;
            println!("{}", head_revision(&repo)?.version());
        }
        GetCommand::Image {
            repository,
            check,
            suffix,
            branch,
            tmp_registry,
        } => {
            let options = ProjectOptions {
                forced_branch: branch,
                main_only: true,
                temporary_registry: tmp_registry,
                ..Default::default()
            };
            let mut project = Project::open(&repository, options).context("unable to open project")?;
            let registry = HttpRegistry::new(DEFAULT_QUERY_TIMEOUT)?;
            let warnings = resolve_image(&mut project, &registry, &suffix, check)?;
            report(&warnings);
            if let Some(image) = &project.image {
                println!("{}", image);
            }
        }
        GetCommand::Deps {
            repository,
            selector,
            branch,
        } => {
            let options = ProjectOptions {
                forced_branch: branch,
                selector,
                ..Default::default()
            };
            let mut project = Project::open(&repository, options).context("unable to open project")?;
            let warnings = resolve_work_branches(&mut project, &Git2RemoteLister::default())?;
            report(&warnings);

            let lines: Vec<(String, Option<String>)> = project
                .dependencies
                .iter()
                .map(|dep| {
                    let branch = match dep {
                        Dependency::Git { repo, .. } => repo.work_branch.clone(),
                        _ => None,
                    };
                    (dep.to_string(), branch)
                })
                .collect();
            ui::display_dependencies(&lines);
        }
    }
    Ok(())
}

fn tag(repository: &Path, create: bool, push: bool, yes: bool) -> Result<()> {
    let repo = Git2Repository::open(repository)?;
    let revision = head_revision(&repo)?;
    if revision.tag.is_empty() {
        report(&[BoundaryWarning::NoSemVerTag {
            repository: repository.display().to_string(),
        }]);
    }

    let new_tag = revision.upgrade_tag().context("unable to compute release tag")?;
    ui::display_proposed_tag(&revision.version(), &new_tag, &release_commands(&new_tag));

    if create {
        create_release_tag(&repo, &new_tag)?;
        ui::display_success(&format!("Created tag {}", new_tag));
    }

    if push {
        if !yes && !ui::confirm_action(&format!("Push tag {} to {}?", new_tag, DEFAULT_REMOTE))? {
            ui::display_status("Push cancelled");
            return Ok(());
        }
        push_tag(&repo, DEFAULT_REMOTE, &new_tag)?;
        ui::display_success(&format!("Pushed tag {} to {}", new_tag, DEFAULT_REMOTE));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Ignite {
            repository,
            branch,
            selector,
            suffix,
            tmp_registry,
        } => ignite(&repository, branch, selector, &suffix, tmp_registry),
        Commands::Get { what } => get(what),
        Commands::Tag {
            repository,
            create,
            push,
            yes,
        } => tag(&repository, create, push, yes),
    };

    if let Err(e) = &result {
        ui::display_error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}
