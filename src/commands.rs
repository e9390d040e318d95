//! The work behind each sub-command, independent of argument parsing.

use std::io::{BufRead, Write};
use std::path::Path;

use log::{debug, info, warn};

use crate::config::{GlobalConfig, JobTemplate, LocalConfig};
use crate::error::{CitError, Result};
use crate::jobs::expand_jobs;
use crate::output::{templates_table, JobStatus, Reporter, Spinner};
use crate::providers::{CiClient, JobLookup};
use crate::transform::{specialize, TransformProfile};
use crate::vcs::Vcs;

/// Use `branch` when given, otherwise ask git for the checked-out one.
pub async fn resolve_branch<V: Vcs>(
    vcs: &V,
    local: &LocalConfig,
    branch: Option<&str>,
) -> Result<String> {
    match branch {
        Some(branch) => Ok(branch.to_string()),
        None => vcs.current_branch(&local.root).await,
    }
}

/// Create or update the feature-branch job of every template.
///
/// A missing target is copied from its source job first; an existing one is
/// left in place. Either way the target's configuration is then replaced by
/// the source's, specialized for `branch`.
pub async fn add<C: CiClient, V: Vcs, W: Write>(
    ci: &C,
    vcs: &V,
    local: &LocalConfig,
    branch: Option<&str>,
    profile: Option<TransformProfile>,
    reporter: &mut Reporter<W>,
) -> Result<()> {
    let branch = resolve_branch(vcs, local, branch).await?;
    let profile = profile.or(local.config.profile).unwrap_or_default();
    let email = vcs.user_email(&local.root).await?;
    let name = vcs.user_name(&local.root).await?;
    debug!("Notifications go to {name} <{email}>");
    info!("Adding jobs for branch {branch} ({profile} profile)");

    for pair in expand_jobs(&branch, &local.config) {
        let (job, status) = match ci.get_job(&pair.target).await? {
            JobLookup::Found(job) => (job, JobStatus::Updated),
            JobLookup::NotFound => (
                ci.copy_job(&pair.source, &pair.target).await?,
                JobStatus::Created,
            ),
        };
        reporter.copied(&pair.source, &pair.target, status)?;

        let source = match ci.get_job(&pair.source).await? {
            JobLookup::Found(source) => source,
            JobLookup::NotFound => return Err(CitError::UnknownJob(pair.source)),
        };
        let config = ci.get_config(&source).await?;
        let specialized = specialize(&config, &branch, &email, profile)?;
        for warning in &specialized.warnings {
            warn!("{}: {warning}", pair.target);
            reporter.warning(warning)?;
        }

        debug!("Updating configuration of {}", job.url);
        ci.update_config(&job, &specialized.document).await?;
    }

    Ok(())
}

/// Delete the feature-branch job of every template, where it exists.
pub async fn remove<C: CiClient, V: Vcs, W: Write>(
    ci: &C,
    vcs: &V,
    local: &LocalConfig,
    branch: Option<&str>,
    reporter: &mut Reporter<W>,
) -> Result<()> {
    let branch = resolve_branch(vcs, local, branch).await?;
    info!("Removing jobs for branch {branch}");

    for pair in expand_jobs(&branch, &local.config) {
        let status = if ci.has_job(&pair.target).await? {
            ci.delete_job(&pair.target).await?;
            JobStatus::Removed
        } else {
            JobStatus::NotFound
        };
        reporter.status(&pair.target, status)?;
    }

    Ok(())
}

/// Start a build of every feature-branch job that is not already running.
pub async fn start<C: CiClient, V: Vcs, W: Write>(
    ci: &C,
    vcs: &V,
    local: &LocalConfig,
    branch: Option<&str>,
    reporter: &mut Reporter<W>,
) -> Result<()> {
    let branch = resolve_branch(vcs, local, branch).await?;
    info!("Starting jobs for branch {branch}");

    for pair in expand_jobs(&branch, &local.config) {
        let status = match ci.get_job(&pair.target).await? {
            JobLookup::Found(job) => {
                if ci.is_running(&job).await? {
                    JobStatus::Running
                } else {
                    ci.invoke(&job).await?;
                    JobStatus::Started
                }
            }
            JobLookup::NotFound => JobStatus::NotFound,
        };
        reporter.status(&pair.target, status)?;
    }

    Ok(())
}

/// Interactively append job templates to the repository's `.cit.yaml`.
///
/// Entering an empty answer (or closing input) ends the session. The file is
/// written only if at least one template was added. Returns how many were.
pub fn init<R: BufRead, W: Write>(
    local: &mut LocalConfig,
    input: &mut R,
    reporter: &mut Reporter<W>,
) -> Result<usize> {
    let file = local.file();
    reporter.line(format!(
        "Configuring jobs for feature branches: {}",
        file.display()
    ))?;
    reporter.line("")?;

    if !local.config.jobs.is_empty() {
        reporter.line(templates_table(&local.config.jobs))?;
        reporter.line("")?;
    }

    let feature_prompt = format!(
        "Feature job (use {}):    ",
        local.config.placeholder()
    );
    let mut added = 0;
    loop {
        reporter.prompt("Source job (empty to exit):      ")?;
        let Some(source_job) = read_answer(input)? else {
            break;
        };

        reporter.prompt(&feature_prompt)?;
        let Some(feature_branch_job) = read_answer(input)? else {
            break;
        };

        local.config.jobs.push(JobTemplate {
            source_job,
            feature_branch_job,
        });
        added += 1;
        reporter.line("Done! Next?")?;
        reporter.line("")?;
    }

    reporter.line("")?;
    if added > 0 {
        local.config.save(&file)?;
        reporter.line(format!("Done! Configured {added} job(s)!"))?;
    } else {
        reporter.line("Abort? Okaay.")?;
    }

    Ok(added)
}

/// Prompt for the Jenkins URL, check it answers, and save the global config.
///
/// An unreachable server is reported but does not stop the config from
/// being written.
pub async fn install<C, F, R, W>(
    path: &Path,
    connect: F,
    input: &mut R,
    reporter: &mut Reporter<W>,
) -> Result<GlobalConfig>
where
    C: CiClient,
    F: FnOnce(&GlobalConfig) -> Result<C>,
    R: BufRead,
    W: Write,
{
    reporter.line("=".repeat(60))?;
    reporter.line("Configuration")?;
    reporter.line("=".repeat(60))?;
    reporter.prompt("- Enter Jenkins URL:   ")?;
    let url = normalize_url(&read_answer(input)?.unwrap_or_default());

    // Keep credentials from an earlier install
    let mut config = match GlobalConfig::load(path) {
        Ok(config) => config,
        Err(CitError::GlobalConfigMissing(_)) => GlobalConfig::new(""),
        Err(e) => return Err(e),
    };
    config.jenkins.url = url;

    reporter.line("")?;
    reporter.prompt("Checking Jenkins server... ")?;
    let spinner = Spinner::start("Contacting Jenkins");
    let probe = match connect(&config) {
        Ok(client) => client.probe().await,
        Err(e) => Err(e),
    };
    match probe {
        Ok(version) => {
            spinner.succeed(&format!("Jenkins {version}"));
            reporter.line("OK")?;
        }
        Err(e) => {
            spinner.fail("Jenkins unreachable");
            reporter.line(format!("ERROR ({e})"))?;
        }
    }

    config.save(path)?;
    reporter.note(format!("Saved configuration to {}", path.display()))?;
    Ok(config)
}

/// Assume plain HTTP when no scheme is given.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Next trimmed line of input; `None` on an empty line or end of input.
fn read_answer<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}
