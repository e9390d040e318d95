use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use log::info;
use std::io;
use std::path::PathBuf;

use crate::commands;
use crate::config::{GlobalConfig, LocalConfig};
use crate::error::CitError;
use crate::output::{print_banner, Reporter};
use crate::providers::{Credentials, JenkinsClient};
use crate::transform::TransformProfile;
use crate::vcs::GitCli;

#[derive(Parser, Debug)]
#[command(name = "cit")]
#[command(author, version, about = "Feature-branch jobs for Jenkins", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Prompt for the Jenkins URL and write the global config
    #[arg(long)]
    install: bool,

    /// Global config file [default: <config dir>/cit/config.yaml]
    #[arg(short, long, global = true, env = "CIT_CONFIG")]
    config: Option<PathBuf>,

    /// Jenkins user for basic auth
    #[arg(long, global = true, env = "JENKINS_USER")]
    user: Option<String>,

    /// Jenkins API token for basic auth
    #[arg(long, global = true, env = "JENKINS_API_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Configure jobs for feature branches for this git repo
    #[command(alias = "config")]
    Init,

    /// Add (or refresh) the feature branch jobs on Jenkins
    Add {
        /// Branch name [default: current git branch]
        branch: Option<String>,

        /// How the copied job configuration is rewritten
        #[arg(short, long, value_enum)]
        profile: Option<TransformProfile>,
    },

    /// Start a build of the feature branch jobs
    Start {
        /// Branch name [default: current git branch]
        branch: Option<String>,
    },

    /// Remove the feature branch jobs
    Rm {
        /// Branch name [default: current git branch]
        branch: Option<String>,
    },

    /// Anything else; rejected once the global config has been read
    #[command(external_subcommand)]
    Unknown(Vec<String>),
}

/// Print the command summary to stdout.
pub fn print_help() {
    println!("{}", Cli::command().render_help());
}

impl Cli {
    fn connect(&self, global: &GlobalConfig) -> crate::error::Result<JenkinsClient> {
        let username = self
            .user
            .clone()
            .or_else(|| global.jenkins.username.clone());
        let api_token = self
            .token
            .clone()
            .or_else(|| global.jenkins.api_token.clone());

        let credentials = match (username, api_token) {
            (Some(username), Some(api_token)) => Some(Credentials {
                username,
                api_token,
            }),
            _ => None,
        };

        JenkinsClient::new(&global.jenkins.url, credentials)
    }

    pub async fn execute(&self) -> Result<()> {
        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => GlobalConfig::default_path()?,
        };

        if self.install {
            print_banner();
            let mut input = io::stdin().lock();
            commands::install(
                &config_path,
                |config| self.connect(config),
                &mut input,
                &mut Reporter::stdout(),
            )
            .await?;
            return Ok(());
        }

        let global = GlobalConfig::load(&config_path)?;
        info!("Using Jenkins at {}", global.jenkins.url);

        let Some(command) = &self.command else {
            print_help();
            return Ok(());
        };

        let cwd = std::env::current_dir().context("Failed to read working directory")?;
        let mut reporter = Reporter::stdout();

        match command {
            Commands::Init => {
                let mut local = LocalConfig::discover(&cwd)?;
                let mut input = io::stdin().lock();
                commands::init(&mut local, &mut input, &mut reporter)?;
            }
            Commands::Add { branch, profile } => {
                let local = LocalConfig::discover(&cwd)?;
                let ci = self.connect(&global)?;
                commands::add(
                    &ci,
                    &GitCli,
                    &local,
                    branch.as_deref(),
                    *profile,
                    &mut reporter,
                )
                .await?;
            }
            Commands::Start { branch } => {
                let local = LocalConfig::discover(&cwd)?;
                let ci = self.connect(&global)?;
                commands::start(&ci, &GitCli, &local, branch.as_deref(), &mut reporter).await?;
            }
            Commands::Rm { branch } => {
                let local = LocalConfig::discover(&cwd)?;
                let ci = self.connect(&global)?;
                commands::remove(&ci, &GitCli, &local, branch.as_deref(), &mut reporter).await?;
            }
            Commands::Unknown(args) => {
                print_help();
                let name = args.first().cloned().unwrap_or_default();
                return Err(CitError::UnknownCommand(name).into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments() {
        let cli = parse(&[]);
        assert_eq!(cli.command, None);
        assert!(!cli.install);
    }

    #[test]
    fn test_config_is_alias_for_init() {
        assert_eq!(parse(&["config"]).command, Some(Commands::Init));
        assert_eq!(parse(&["init"]).command, Some(Commands::Init));
    }

    #[test]
    fn test_add_with_branch_and_profile() {
        let cli = parse(&["add", "feature/x", "--profile", "isolated"]);
        assert_eq!(
            cli.command,
            Some(Commands::Add {
                branch: Some("feature/x".to_string()),
                profile: Some(TransformProfile::Isolated),
            })
        );
    }

    #[test]
    fn test_branch_is_optional() {
        assert_eq!(
            parse(&["rm"]).command,
            Some(Commands::Rm { branch: None })
        );
        assert_eq!(
            parse(&["start", "xyz"]).command,
            Some(Commands::Start {
                branch: Some("xyz".to_string())
            })
        );
    }

    #[test]
    fn test_install_flag() {
        assert!(parse(&["--install"]).install);
    }

    #[test]
    fn test_unknown_command_is_deferred() {
        assert_eq!(
            parse(&["frobnicate", "now"]).command,
            Some(Commands::Unknown(vec![
                "frobnicate".to_string(),
                "now".to_string()
            ]))
        );
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = Cli::try_parse_from(["cit", "--frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }
}
