use std::path::PathBuf;

use thiserror::Error;

pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_UNKNOWN_COMMAND: u8 = 2;
pub const EXIT_CONFIG_NOT_FOUND: u8 = 3;
pub const EXIT_REPO_NOT_FOUND: u8 = 4;

#[derive(Error, Debug)]
pub enum CitError {
    #[error("could not find cit config file at: {}", .0.display())]
    GlobalConfigMissing(PathBuf),

    #[error("Unknown command: \"{0}\"")]
    UnknownCommand(String),

    #[error("could not find .git directory within {steps} levels of {}", .start.display())]
    RepoRootNotFound { start: PathBuf, steps: usize },

    #[error("Failed to parse config file {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Job not found on Jenkins: {0}")]
    UnknownJob(String),

    #[error("Jenkins API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("`{command}` failed: {message}")]
    Vcs { command: String, message: String },

    #[error("Malformed job configuration: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CitError {
    /// Process exit code reported when this error aborts a command.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::GlobalConfigMissing(_) => EXIT_CONFIG_NOT_FOUND,
            Self::UnknownCommand(_) => EXIT_UNKNOWN_COMMAND,
            Self::RepoRootNotFound { .. } => EXIT_REPO_NOT_FOUND,
            _ => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, CitError>;
