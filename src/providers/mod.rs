mod jenkins;

pub use jenkins::{Credentials, JenkinsClient};

use crate::error::Result;

/// A job on the CI server, identified by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub name: String,
    pub url: String,
}

/// Outcome of looking a job up by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobLookup {
    Found(JobHandle),
    NotFound,
}

/// Operations cit needs from a CI server's remote API.
///
/// Calls are awaited one at a time; implementations do not retry.
#[allow(async_fn_in_trait)]
pub trait CiClient {
    async fn get_job(&self, name: &str) -> Result<JobLookup>;

    async fn has_job(&self, name: &str) -> Result<bool> {
        Ok(matches!(self.get_job(name).await?, JobLookup::Found(_)))
    }

    /// Create `new_name` as a copy of `source`.
    async fn copy_job(&self, source: &str, new_name: &str) -> Result<JobHandle>;

    async fn delete_job(&self, name: &str) -> Result<()>;

    async fn get_config(&self, job: &JobHandle) -> Result<String>;

    async fn update_config(&self, job: &JobHandle, config: &str) -> Result<()>;

    /// Queue a build.
    async fn invoke(&self, job: &JobHandle) -> Result<()>;

    /// Whether a build is queued or in progress.
    async fn is_running(&self, job: &JobHandle) -> Result<bool>;

    /// Check connectivity, returning the server version.
    async fn probe(&self) -> Result<String>;
}
