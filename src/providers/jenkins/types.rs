use serde::Deserialize;

/// Subset of `job/{name}/api/json` that cit reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub in_queue: bool,
    #[serde(default)]
    pub last_build: Option<BuildRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildRef {
    #[serde(default)]
    pub building: bool,
}

/// CSRF protection token from `crumbIssuer/api/json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crumb {
    pub crumb: String,
    pub crumb_request_field: String,
}

impl JobInfo {
    pub fn is_running(&self) -> bool {
        self.in_queue || self.last_build.as_ref().is_some_and(|build| build.building)
    }
}
