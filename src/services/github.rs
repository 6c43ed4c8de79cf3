//! GitHub REST adapter for [`RepositoryHost`].

use super::{FileUpsertRequest, HostResponse, PullRequestRequest, RepositoryHost};
use crate::config::VersionControlTarget;
use crate::error::Diagram2TfError;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

const USER_AGENT: &str = concat!("diagram2tf/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl GitHubClient {
    pub fn new(api_base: impl Into<String>, token: impl Into<String>) -> Result<Self, Diagram2TfError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Diagram2TfError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn for_target(target: &VersionControlTarget) -> Result<Self, Diagram2TfError> {
        Self::new(&target.api_base, &target.auth_token)
    }

    pub fn contents_url(&self, repository: &str, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base,
            repository,
            path.trim_start_matches('/')
        )
    }

    pub fn pulls_url(&self, repository: &str) -> String {
        format!("{}/repos/{}/pulls", self.api_base, repository)
    }

    fn authorised(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

async fn send(builder: RequestBuilder) -> Result<HostResponse, reqwest::Error> {
    let response: Response = builder.send().await?;
    let status = response.status().as_u16();
    let text = response.text().await?;
    let body = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    };
    Ok(HostResponse { status, body })
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    async fn get_file(
        &self,
        repository: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<HostResponse, Diagram2TfError> {
        let url = self.contents_url(repository, path);
        debug!("GET {}?ref={}", url, git_ref);
        let request = self.authorised(self.http.get(&url)).query(&[("ref", git_ref)]);
        send(request).await.map_err(|e| {
            Diagram2TfError::Internal(format!("metadata probe of {repository}/{path} failed: {e}"))
        })
    }

    async fn put_file(
        &self,
        repository: &str,
        request: &FileUpsertRequest,
    ) -> Result<HostResponse, Diagram2TfError> {
        let url = self.contents_url(repository, &request.path);
        debug!(
            "PUT {} on {} ({})",
            url,
            request.branch,
            if request.existing_sha.is_some() { "update" } else { "create" }
        );
        let builder = self.authorised(self.http.put(&url)).json(&request.wire_body());
        send(builder)
            .await
            .map_err(|e| Diagram2TfError::VersionControlWrite {
                repository: repository.to_string(),
                path: request.path.clone(),
                status: None,
                detail: e.to_string(),
            })
    }

    async fn create_pull_request(
        &self,
        repository: &str,
        request: &PullRequestRequest,
    ) -> Result<HostResponse, Diagram2TfError> {
        let url = self.pulls_url(repository);
        debug!("POST {} ({} → {})", url, request.head, request.base);
        let builder = self.authorised(self.http.post(&url)).json(request);
        send(builder)
            .await
            .map_err(|e| Diagram2TfError::PullRequest {
                repository: repository.to_string(),
                head: request.head.clone(),
                base: request.base.clone(),
                status: None,
                detail: e.to_string(),
            })
    }
}
