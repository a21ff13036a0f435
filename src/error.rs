use thiserror::Error;

/// Unified error type for ciux operations
#[derive(Error, Debug)]
pub enum CiuxError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Repository error: {0}")]
    Vcs(String),

    #[error("Registry query failed: {0}")]
    RegistryQuery(String),

    #[error("Invalid semantic version: {0}")]
    InvalidSemVer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid label selector: {0}")]
    SelectorParse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in ciux
pub type Result<T> = std::result::Result<T, CiuxError>;

impl CiuxError {
    /// Create a repository error with context
    pub fn vcs(msg: impl Into<String>) -> Self {
        CiuxError::Vcs(msg.into())
    }

    /// Create a registry query error with context
    pub fn registry(msg: impl Into<String>) -> Self {
        CiuxError::RegistryQuery(msg.into())
    }

    /// Create a semantic version error with context
    pub fn semver(msg: impl Into<String>) -> Self {
        CiuxError::InvalidSemVer(msg.into())
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        CiuxError::Config(msg.into())
    }

    /// Create a selector error with context
    pub fn selector(msg: impl Into<String>) -> Self {
        CiuxError::SelectorParse(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CiuxError::NotFound(msg.into())
    }

    /// True for failures coming from the repository layer (libgit2 or our own wrappers)
    pub fn is_vcs(&self) -> bool {
        matches!(self, CiuxError::Git(_) | CiuxError::Vcs(_))
    }
}

impl From<serde_yaml::Error> for CiuxError {
    fn from(e: serde_yaml::Error) -> Self {
        CiuxError::Config(format!("invalid YAML: {}", e))
    }
}

impl From<toml::de::Error> for CiuxError {
    fn from(e: toml::de::Error) -> Self {
        CiuxError::Config(format!("invalid TOML: {}", e))
    }
}
