use crate::error::{CiuxError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Configuration files looked up in the repository root, in order
pub const CONFIG_FILE_NAMES: [&str; 3] = [".ciux.yaml", ".ciux.yml", ".ciux.toml"];

/// Environment variable overriding the path of the generated shell file
pub const CIUXCONFIG_ENV: &str = "CIUXCONFIG";

/// Per-repository ciux configuration.
///
/// Holds the image registries, the paths whose changes require a new image,
/// and the dependency declarations.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub registry: String,

    #[serde(default, alias = "temporary_registry")]
    pub temporary_registry: Option<String>,

    #[serde(default, rename = "sourcePathes", alias = "sourcePaths", alias = "source_paths")]
    pub source_paths: Vec<String>,

    #[serde(default)]
    pub dependencies: Vec<DepConfig>,
}

/// One dependency declaration.
///
/// Exactly one of `url`, `package` or `image` is expected. When several are
/// set, `package` wins over `image`, which wins over `url`.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct DepConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub package: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    /// Retrieve the sources next to the main repository
    #[serde(default)]
    pub clone: bool,

    /// Require the dependency image to exist in the registry
    #[serde(default)]
    pub pull: bool,

    #[serde(default, deserialize_with = "deserialize_labels")]
    pub labels: BTreeMap<String, String>,
}

/// Which field of a [DepConfig] defines the dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepSource<'a> {
    Git(&'a str),
    Package(&'a str),
    Image(&'a str),
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl DepConfig {
    pub fn source(&self) -> Result<DepSource<'_>> {
        if let Some(package) = non_empty(&self.package) {
            Ok(DepSource::Package(package))
        } else if let Some(image) = non_empty(&self.image) {
            Ok(DepSource::Image(image))
        } else if let Some(url) = non_empty(&self.url) {
            Ok(DepSource::Git(url))
        } else {
            Err(CiuxError::config(
                "dependency must define one of url, package or image",
            ))
        }
    }
}

/// Label values may be written as YAML/TOML scalars (`build: true`)
#[derive(Deserialize)]
#[serde(untagged)]
enum LabelValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Text(s) => write!(f, "{}", s),
            LabelValue::Flag(b) => write!(f, "{}", b),
            LabelValue::Integer(i) => write!(f, "{}", i),
            LabelValue::Float(x) => write!(f, "{}", x),
        }
    }
}

fn deserialize_labels<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, LabelValue>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.to_string()))
        .collect())
}

impl ProjectConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: ProjectConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ProjectConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Source paths must be relative and clean, dependencies well-formed
    pub fn validate(&self) -> Result<()> {
        for path in &self.source_paths {
            validate_source_path(path)?;
        }
        for dep in &self.dependencies {
            dep.source()?;
        }
        Ok(())
    }

    /// Temporary registry, ignoring an empty value
    pub fn temporary_registry(&self) -> Option<&str> {
        non_empty(&self.temporary_registry)
    }
}

fn validate_source_path(path: &str) -> Result<()> {
    if Path::new(path).is_absolute() {
        return Err(CiuxError::config(format!("source path {} must be relative", path)));
    }

    let clean = !path.is_empty()
        && !path.ends_with('/')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if !clean {
        return Err(CiuxError::config(format!("source path {} must be clean", path)));
    }
    Ok(())
}

/// Locate the configuration file of a repository
///
/// # Returns
/// * `Ok(path)` - First of [CONFIG_FILE_NAMES] present in `repo_root`
/// * `Err` - If none exists
pub fn find_config_file(repo_root: &Path) -> Result<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| repo_root.join(name))
        .find(|path| path.is_file())
        .ok_or_else(|| {
            CiuxError::config(format!(
                "no configuration file ({}) in {}",
                CONFIG_FILE_NAMES.join(", "),
                repo_root.display()
            ))
        })
}

/// Load and validate the configuration of the repository rooted at `repo_root`
pub fn load_project_config(repo_root: &Path) -> Result<ProjectConfig> {
    let path = find_config_file(repo_root)?;
    debug!(file = %path.display(), "Ciux config file");

    let content = fs::read_to_string(&path)
        .map_err(|e| CiuxError::config(format!("unable to read {}: {}", path.display(), e)))?;

    if path.extension().is_some_and(|ext| ext == "toml") {
        ProjectConfig::from_toml_str(&content)
    } else {
        ProjectConfig::from_yaml_str(&content)
    }
}
