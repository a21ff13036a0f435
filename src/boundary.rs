use std::fmt;

/// Failures downgraded to warnings while resolving a project.
/// The run goes on; these are reported to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// Dependency has neither the project branch nor a main branch; it keeps no work branch
    MissingMainBranch { url: String },
    /// Registry could not be queried, the image is considered absent
    RegistryCheckFailed { image: String, reason: String },
    /// No annotated semver tag is reachable from HEAD
    NoSemVerTag { repository: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::MissingMainBranch { url } => {
                write!(f, "No work branch for '{}': no matching branch and no main/master", url)
            }
            BoundaryWarning::RegistryCheckFailed { image, reason } => {
                write!(f, "Cannot check image '{}', assuming it is not in registry: {}", image, reason)
            }
            BoundaryWarning::NoSemVerTag { repository } => {
                write!(f, "No annotated semver tag reachable in '{}'", repository)
            }
        }
    }
}
