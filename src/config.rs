use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CitError, Result};
use crate::transform::TransformProfile;

/// Name of the per-repository job template file, kept at the git root.
pub const REPO_CONFIG_FILE: &str = ".cit.yaml";

/// Maximum number of directories probed while looking for the git root.
pub const MAX_ROOT_SEARCH_STEPS: usize = 20;

/// Application-wide settings: where the Jenkins server lives and how to
/// authenticate against it.
///
/// Written once by `cit --install` and read on every invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    pub jenkins: JenkinsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JenkinsConfig {
    /// Jenkins base URL
    pub url: String,

    /// User name for HTTP basic auth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// API token paired with `username`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

/// Per-repository configuration stored in `.cit.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RepoConfig {
    /// Transform profile applied by `add`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<TransformProfile>,

    /// Job templates, in declaration order
    #[serde(default)]
    pub jobs: Vec<JobTemplate>,
}

/// A mainline job paired with the name pattern of its feature-branch clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobTemplate {
    pub source_job: String,
    pub feature_branch_job: String,
}

/// A repository's configuration together with the git root it was found at.
#[derive(Debug, Clone)]
pub struct LocalConfig {
    pub root: PathBuf,
    pub config: RepoConfig,
}

impl GlobalConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            jenkins: JenkinsConfig {
                url: url.into(),
                username: None,
                api_token: None,
            },
        }
    }

    /// Default location of the global config file:
    /// - Linux: `~/.config/cit/config.yaml`
    /// - macOS: `~/Library/Application Support/cit/config.yaml`
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| CitError::Config("No config directory found".into()))?;
        Ok(dir.join("cit").join("config.yaml"))
    }

    /// Load the global config. A missing file is a fatal configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CitError::GlobalConfigMissing(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        parse_by_extension(path, &contents)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| CitError::Config(format!("Failed to serialize config: {e}")))?,
            _ => serde_yaml::to_string(self)
                .map_err(|e| CitError::Config(format!("Failed to serialize config: {e}")))?,
        };

        fs::write(path, contents)?;
        debug!("Wrote global config to {}", path.display());
        Ok(())
    }
}

impl RepoConfig {
    /// Location of the config file for a given git root.
    pub fn path(repo_root: &Path) -> PathBuf {
        repo_root.join(REPO_CONFIG_FILE)
    }

    /// Load `.cit.yaml` from `repo_root`.
    ///
    /// A missing or empty file yields the default (no jobs); only a
    /// malformed file is an error.
    pub fn load(repo_root: &Path) -> Result<Self> {
        let path = Self::path(repo_root);
        if !path.is_file() {
            debug!("No {} found at {}", REPO_CONFIG_FILE, repo_root.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&contents).map_err(|e| CitError::ConfigParse {
            path,
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)
            .map_err(|e| CitError::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Token replaced by the branch name in `feature-branch-job` patterns.
    pub fn placeholder(&self) -> &'static str {
        self.profile.unwrap_or_default().placeholder()
    }
}

impl LocalConfig {
    /// Find the git root above `start` and load its `.cit.yaml`.
    pub fn discover(start: &Path) -> Result<Self> {
        let root = resolve_repo_root(start)?;
        let config = RepoConfig::load(&root)?;
        Ok(Self { root, config })
    }

    pub fn file(&self) -> PathBuf {
        RepoConfig::path(&self.root)
    }
}

/// Walk upward from `start` to the first directory containing `.git`.
///
/// `start` itself counts as the first probe; after
/// [`MAX_ROOT_SEARCH_STEPS`] directories the search gives up.
pub fn resolve_repo_root(start: &Path) -> Result<PathBuf> {
    for (steps, dir) in start.ancestors().enumerate() {
        if steps >= MAX_ROOT_SEARCH_STEPS {
            break;
        }
        if dir.join(".git").is_dir() {
            debug!("Found git root at {}", dir.display());
            return Ok(dir.to_path_buf());
        }
    }

    Err(CitError::RepoRootNotFound {
        start: start.to_path_buf(),
        steps: MAX_ROOT_SEARCH_STEPS,
    })
}

fn parse_by_extension<T: DeserializeOwned>(path: &Path, contents: &str) -> Result<T> {
    let parse_error = |message: String| CitError::ConfigParse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|ext| ext.to_str()).unwrap_or("") {
        "toml" => toml::from_str(contents).map_err(|e| parse_error(e.to_string())),
        "json" => serde_json::from_str(contents).map_err(|e| parse_error(e.to_string())),
        "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| parse_error(e.to_string())),
        _ => {
            // Try YAML first, then TOML, then JSON
            serde_yaml::from_str(contents)
                .map_err(|e| e.to_string())
                .or_else(|_| toml::from_str(contents).map_err(|e| e.to_string()))
                .or_else(|_| serde_json::from_str(contents).map_err(|e| e.to_string()))
                .map_err(parse_error)
        }
    }
}
