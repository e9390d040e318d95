use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::OnceCell;
use url::Url;

use crate::error::{CitError, Result};
use crate::providers::{CiClient, JobHandle, JobLookup};

use super::types::{Crumb, JobInfo};

const JOB_TREE: &str = "name,url,inQueue,lastBuild[building]";

/// Jenkins user name plus API token for HTTP basic auth.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub api_token: String,
}

/// Jenkins remote API client.
pub struct JenkinsClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
    crumb: OnceCell<Option<Crumb>>,
}

impl JenkinsClient {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cit/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()
            .map_err(|e| CitError::Config(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(base_url)
            .map_err(|e| CitError::Config(format!("Invalid Jenkins URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CitError::Config(format!("Invalid Jenkins URL: {base_url}")));
        }

        Ok(Self {
            client,
            base_url,
            credentials,
            crumb: OnceCell::new(),
        })
    }

    /// Build `{base}/{segments...}`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn job_url(&self, name: &str, tail: &[&str]) -> Url {
        let mut segments = vec!["job", name];
        segments.extend_from_slice(tail);
        self.endpoint(&segments)
    }

    fn auth_request(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(creds) => request.basic_auth(&creds.username, Some(&creds.api_token)),
            None => request,
        }
    }

    /// Fetch the CSRF crumb once per client. Servers without a crumb
    /// issuer (or that refuse it) get requests without one.
    async fn crumb(&self) -> Result<Option<&Crumb>> {
        let crumb = self
            .crumb
            .get_or_try_init(|| async {
                let url = self.endpoint(&["crumbIssuer", "api", "json"]);
                debug!("GET {url}");
                let response = self.auth_request(self.client.get(url)).send().await?;
                if !response.status().is_success() {
                    debug!("No crumb issued (status {})", response.status());
                    return Ok::<_, CitError>(None);
                }
                let crumb = response.json::<Crumb>().await?;
                Ok::<_, CitError>(Some(crumb))
            })
            .await?;
        Ok(crumb.as_ref())
    }

    async fn post(&self, url: Url) -> Result<RequestBuilder> {
        debug!("POST {url}");
        let mut request = self.auth_request(self.client.post(url));
        if let Some(crumb) = self.crumb().await? {
            request = request.header(crumb.crumb_request_field.as_str(), crumb.crumb.as_str());
        }
        Ok(request)
    }

    fn get(&self, url: Url) -> RequestBuilder {
        debug!("GET {url}");
        self.auth_request(self.client.get(url))
    }

    async fn fetch_job(&self, name: &str) -> Result<Option<JobInfo>> {
        let mut url = self.job_url(name, &["api", "json"]);
        url.query_pairs_mut().append_pair("tree", JOB_TREE);

        let response = self.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response).await?;
        Ok(Some(response.json().await?))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(CitError::Api {
        status: status.as_u16(),
        message: message.trim().to_string(),
    })
}

impl CiClient for JenkinsClient {
    async fn get_job(&self, name: &str) -> Result<JobLookup> {
        Ok(match self.fetch_job(name).await? {
            Some(info) => JobLookup::Found(JobHandle {
                name: info.name,
                url: info.url,
            }),
            None => JobLookup::NotFound,
        })
    }

    async fn copy_job(&self, source: &str, new_name: &str) -> Result<JobHandle> {
        let mut url = self.endpoint(&["createItem"]);
        url.query_pairs_mut()
            .append_pair("name", new_name)
            .append_pair("mode", "copy")
            .append_pair("from", source);

        let request = self
            .post(url)
            .await?
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        check_status(request.send().await?).await?;

        Ok(JobHandle {
            name: new_name.to_string(),
            url: self.job_url(new_name, &[]).to_string(),
        })
    }

    async fn delete_job(&self, name: &str) -> Result<()> {
        let request = self.post(self.job_url(name, &["doDelete"])).await?;
        check_status(request.send().await?).await?;
        Ok(())
    }

    async fn get_config(&self, job: &JobHandle) -> Result<String> {
        let response = self
            .get(self.job_url(&job.name, &["config.xml"]))
            .send()
            .await?;
        Ok(check_status(response).await?.text().await?)
    }

    async fn update_config(&self, job: &JobHandle, config: &str) -> Result<()> {
        let request = self
            .post(self.job_url(&job.name, &["config.xml"]))
            .await?
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(config.to_string());
        check_status(request.send().await?).await?;
        Ok(())
    }

    async fn invoke(&self, job: &JobHandle) -> Result<()> {
        let request = self.post(self.job_url(&job.name, &["build"])).await?;
        check_status(request.send().await?).await?;
        Ok(())
    }

    async fn is_running(&self, job: &JobHandle) -> Result<bool> {
        match self.fetch_job(&job.name).await? {
            Some(info) => Ok(info.is_running()),
            None => Err(CitError::Api {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("job {} disappeared", job.name),
            }),
        }
    }

    async fn probe(&self) -> Result<String> {
        let response = self.get(self.endpoint(&["api", "json"])).send().await?;
        let response = check_status(response).await?;
        Ok(response
            .headers()
            .get("x-jenkins")
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn job_body(name: &str, in_queue: bool, building: bool) -> String {
        format!(
            r#"{{"_class":"hudson.model.FreeStyleProject","name":"{name}","url":"http://ci/job/{name}/","inQueue":{in_queue},"lastBuild":{{"building":{building}}}}}"#
        )
    }

    fn handle(name: &str) -> JobHandle {
        JobHandle {
            name: name.to_string(),
            url: format!("http://ci/job/{name}/"),
        }
    }

    #[test]
    fn test_job_url_encodes_name() {
        let client = JenkinsClient::new("http://ci.example.com/jenkins/", None).unwrap();
        assert_eq!(
            client.job_url("build feature", &["api", "json"]).as_str(),
            "http://ci.example.com/jenkins/job/build%20feature/api/json"
        );
        assert_eq!(
            client.endpoint(&["createItem"]).as_str(),
            "http://ci.example.com/jenkins/createItem"
        );
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        assert!(matches!(
            JenkinsClient::new("not a url", None),
            Err(CitError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_get_job_found() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/job/build/api/json")
            .match_query(Matcher::UrlEncoded("tree".into(), JOB_TREE.into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(job_body("build", false, false))
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        let lookup = client.get_job("build").await.unwrap();

        assert_eq!(lookup, JobLookup::Found(handle("build")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_job_not_found() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/missing/api/json")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        assert_eq!(client.get_job("missing").await.unwrap(), JobLookup::NotFound);
        assert!(!client.has_job("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_job_server_error_propagates() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/build/api/json")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        let err = client.get_job("build").await.unwrap_err();
        assert!(matches!(err, CitError::Api { status: 500, ref message } if message == "boom"));
    }

    #[tokio::test]
    async fn test_copy_job_sends_crumb() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/crumbIssuer/api/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"crumb":"c0ffee","crumbRequestField":"Jenkins-Crumb"}"#)
            .create_async()
            .await;
        let copy = server
            .mock("POST", "/createItem")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("name".into(), "build-xyz".into()),
                Matcher::UrlEncoded("mode".into(), "copy".into()),
                Matcher::UrlEncoded("from".into(), "build".into()),
            ]))
            .match_header("jenkins-crumb", "c0ffee")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        let job = client.copy_job("build", "build-xyz").await.unwrap();

        assert_eq!(job.name, "build-xyz");
        assert!(job.url.ends_with("/job/build-xyz"));
        copy.assert_async().await;
    }

    #[tokio::test]
    async fn test_crumb_is_fetched_once() {
        let mut server = Server::new_async().await;
        let crumb = server
            .mock("GET", "/crumbIssuer/api/json")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/job/a/build")
            .with_status(201)
            .create_async()
            .await;
        server
            .mock("POST", "/job/b/build")
            .with_status(201)
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        client.invoke(&handle("a")).await.unwrap();
        client.invoke(&handle("b")).await.unwrap();

        crumb.assert_async().await;
    }

    #[tokio::test]
    async fn test_basic_auth_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/json")
            .match_header("authorization", "Basic Ym9iOnRva2Vu")
            .with_status(200)
            .with_header("x-jenkins", "2.440.1")
            .with_body("{}")
            .create_async()
            .await;

        let credentials = Credentials {
            username: "bob".to_string(),
            api_token: "token".to_string(),
        };
        let client = JenkinsClient::new(&server.url(), Some(credentials)).unwrap();

        assert_eq!(client.probe().await.unwrap(), "2.440.1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_config_roundtrip_requests() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/build/config.xml")
            .with_status(200)
            .with_body("<project/>")
            .create_async()
            .await;
        let update = server
            .mock("POST", "/job/build-xyz/config.xml")
            .match_header("content-type", "application/xml; charset=utf-8")
            .match_body("<project><x/></project>")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        assert_eq!(client.get_config(&handle("build")).await.unwrap(), "<project/>");
        client
            .update_config(&handle("build-xyz"), "<project><x/></project>")
            .await
            .unwrap();

        update.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_job() {
        let mut server = Server::new_async().await;
        let delete = server
            .mock("POST", "/job/build-xyz/doDelete")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        client.delete_job("build-xyz").await.unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_is_running() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/job/idle/api/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(job_body("idle", false, false))
            .create_async()
            .await;
        server
            .mock("GET", "/job/busy/api/json")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(job_body("busy", false, true))
            .create_async()
            .await;

        let client = JenkinsClient::new(&server.url(), None).unwrap();
        assert!(!client.is_running(&handle("idle")).await.unwrap());
        assert!(client.is_running(&handle("busy")).await.unwrap());
    }
}
