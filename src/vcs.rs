//! Git metadata for the checkout cit runs in.
//!
//! Every query runs `git` as a subprocess whose working directory is set to
//! the target directory, leaving the process's own working directory alone.

use std::path::Path;

use log::debug;
use tokio::process::Command;

use crate::error::{CitError, Result};

/// Version-control queries, each scoped to a directory inside a checkout.
#[allow(async_fn_in_trait)]
pub trait Vcs {
    async fn current_branch(&self, dir: &Path) -> Result<String>;
    async fn user_name(&self, dir: &Path) -> Result<String>;
    async fn user_email(&self, dir: &Path) -> Result<String>;
}

/// [`Vcs`] backed by the `git` executable on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        debug!("Running `{command}` in {}", dir.display());

        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .await
            .map_err(|e| CitError::Vcs {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("exited with {}", output.status),
                trimmed => trimmed.to_string(),
            };
            return Err(CitError::Vcs { command, message });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn config_value(&self, dir: &Path, key: &str) -> Result<String> {
        let value = self
            .run(dir, &["config", "--get", key])
            .await
            .map_err(|e| match e {
                CitError::Vcs { command, .. } => CitError::Vcs {
                    command,
                    message: format!("{key} is not set"),
                },
                other => other,
            })?;
        if value.is_empty() {
            return Err(CitError::Vcs {
                command: format!("git config --get {key}"),
                message: format!("{key} is empty"),
            });
        }
        Ok(value)
    }
}

impl Vcs for GitCli {
    /// Short name of the checked-out branch. A detached HEAD has none and is
    /// reported as an error.
    async fn current_branch(&self, dir: &Path) -> Result<String> {
        self.run(dir, &["symbolic-ref", "--short", "HEAD"]).await
    }

    async fn user_name(&self, dir: &Path) -> Result<String> {
        self.config_value(dir, "user.name").await
    }

    async fn user_email(&self, dir: &Path) -> Result<String> {
        self.config_value(dir, "user.email").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;
    use tempfile::TempDir;

    fn git(dir: &Path, args: &[&str]) -> bool {
        StdCommand::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    /// A fresh repository, or `None` when git is unavailable.
    fn init_repo() -> Option<TempDir> {
        let temp_dir = TempDir::new().unwrap();
        if !git(temp_dir.path(), &["init", "-q"]) {
            return None;
        }
        Some(temp_dir)
    }

    #[tokio::test]
    async fn test_current_branch() {
        let Some(repo) = init_repo() else { return };
        assert!(git(
            repo.path(),
            &["symbolic-ref", "HEAD", "refs/heads/feature/x"]
        ));

        let subdir = repo.path().join("src");
        std::fs::create_dir(&subdir).unwrap();
        let cwd = std::env::current_dir().unwrap();

        let branch = GitCli.current_branch(&subdir).await.unwrap();
        assert_eq!(branch, "feature/x");
        assert_eq!(std::env::current_dir().unwrap(), cwd);
    }

    #[tokio::test]
    async fn test_detached_head_has_no_branch() {
        let Some(repo) = init_repo() else { return };
        assert!(git(
            repo.path(),
            &[
                "-c",
                "user.name=ci",
                "-c",
                "user.email=ci@example.com",
                "commit",
                "-q",
                "--allow-empty",
                "-m",
                "init",
            ]
        ));
        assert!(git(repo.path(), &["checkout", "-q", "--detach"]));

        let err = GitCli.current_branch(repo.path()).await.unwrap_err();
        assert!(
            matches!(err, CitError::Vcs { ref command, .. } if command == "git symbolic-ref --short HEAD")
        );
    }

    #[tokio::test]
    async fn test_user_identity() {
        let Some(repo) = init_repo() else { return };
        assert!(git(repo.path(), &["config", "user.name", "Ada Lovelace"]));
        assert!(git(repo.path(), &["config", "user.email", "ada@example.com"]));

        assert_eq!(GitCli.user_name(repo.path()).await.unwrap(), "Ada Lovelace");
        assert_eq!(
            GitCli.user_email(repo.path()).await.unwrap(),
            "ada@example.com"
        );
    }

    #[tokio::test]
    async fn test_failure_reports_command() {
        let Some(repo) = init_repo() else { return };
        let err = GitCli
            .run(repo.path(), &["rev-parse", "--verify", "no-such-ref"])
            .await
            .unwrap_err();
        assert!(
            matches!(err, CitError::Vcs { ref command, .. } if command == "git rev-parse --verify no-such-ref")
        );
    }
}
