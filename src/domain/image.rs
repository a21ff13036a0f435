use crate::error::{CiuxError, Result};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const DEFAULT_REGISTRY: &str = "docker.io";
const DEFAULT_TAG: &str = "latest";

fn path_component_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$").expect("static regex")
    })
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$").expect("static regex"))
}

/// Container image produced for a project
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Image {
    pub registry: String,
    pub name: String,
    pub tag: String,
    /// Set only after an explicit registry check succeeded
    pub in_registry: bool,
}

impl Image {
    pub fn new(registry: impl Into<String>, name: impl Into<String>, tag: impl Into<String>) -> Self {
        Image {
            registry: registry.into(),
            name: name.into(),
            tag: tag.into(),
            in_registry: false,
        }
    }

    /// Full reference: `registry/lowercase(name):tag`
    pub fn url(&self) -> String {
        format!("{}/{}:{}", self.registry, self.name.to_lowercase(), self.tag)
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, in registry: {}", self.url(), self.in_registry)
    }
}

/// Tag or digest part of an image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    Tag(String),
    Digest(String),
}

impl ImageTarget {
    pub fn as_str(&self) -> &str {
        match self {
            ImageTarget::Tag(t) => t,
            ImageTarget::Digest(d) => d,
        }
    }
}

/// Parsed `[registry/]repository[:tag|@digest]` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub repository: String,
    pub target: ImageTarget,
}

impl ImageReference {
    /// Parse an image reference, normalising Docker Hub short names
    ///
    /// # Example
    /// ```ignore
    /// let r = ImageReference::parse("alpine:3.18")?;
    /// assert_eq!(r.registry, "docker.io");
    /// assert_eq!(r.repository, "library/alpine");
    /// ```
    pub fn parse(reference: &str) -> Result<Self> {
        let invalid = |why: &str| CiuxError::registry(format!("parsing reference {:?}: {}", reference, why));

        let (name_part, target) = match reference.split_once('@') {
            Some((name, digest)) => {
                if !digest.contains(':') {
                    return Err(invalid("digest must be algorithm:hex"));
                }
                (name, ImageTarget::Digest(digest.to_string()))
            }
            None => {
                let slash = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
                match reference[slash..].rfind(':') {
                    Some(colon) => {
                        let colon = slash + colon;
                        (
                            &reference[..colon],
                            ImageTarget::Tag(reference[colon + 1..].to_string()),
                        )
                    }
                    None => (reference, ImageTarget::Tag(DEFAULT_TAG.to_string())),
                }
            }
        };

        if let ImageTarget::Tag(tag) = &target {
            if !tag_pattern().is_match(tag) {
                return Err(invalid("invalid tag"));
            }
        }

        let mut components: Vec<&str> = name_part.split('/').collect();
        let registry = if components.len() > 1 && is_registry_host(components[0]) {
            components.remove(0).to_string()
        } else {
            DEFAULT_REGISTRY.to_string()
        };

        if components.iter().any(|c| !path_component_pattern().is_match(c)) {
            return Err(invalid("invalid repository name"));
        }

        let mut repository = components.join("/");
        if registry == DEFAULT_REGISTRY && components.len() == 1 {
            repository = format!("library/{}", repository);
        }

        Ok(ImageReference {
            registry,
            repository,
            target,
        })
    }

    /// Host serving the distribution API for this registry
    pub fn api_host(&self) -> &str {
        if self.registry == DEFAULT_REGISTRY {
            "registry-1.docker.io"
        } else {
            &self.registry
        }
    }

    /// Registries reached over plain HTTP (local development registries)
    pub fn is_insecure(&self) -> bool {
        let host = self.registry.split(':').next().unwrap_or_default();
        host == "localhost" || host == "127.0.0.1"
    }

    /// Environment variable prefix derived from the repository path
    ///
    /// "docker.io/library/alpine:3.18" -> "LIBRARY_ALPINE"
    pub fn env_prefix(&self) -> String {
        self.repository.replace(['/', '-'], "_").to_uppercase()
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            ImageTarget::Tag(t) => write!(f, "{}/{}:{}", self.registry, self.repository, t),
            ImageTarget::Digest(d) => write!(f, "{}/{}@{}", self.registry, self.repository, d),
        }
    }
}

fn is_registry_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}
