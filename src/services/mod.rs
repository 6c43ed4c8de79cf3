//! External collaborators, behind traits.
//!
//! The pipeline only talks to these traits, so each collaborator can be
//! replaced by an in-memory fake in tests or by another backend in
//! production. The concrete adapters are:
//!
//! | Trait | Adapter | Backend |
//! |-------|---------|---------|
//! | [`ObjectStore`] | [`s3::S3ObjectStore`] | Amazon S3 |
//! | [`InferenceClient`] | [`bedrock::BedrockInference`] | Bedrock runtime `InvokeModel` |
//! | [`RepositoryHost`] | [`github::GitHubClient`] | GitHub REST contents + pulls API |
//!
//! Adapters convert their transport errors into [`Diagram2TfError`]
//! variants of the stage they serve. The repository host additionally
//! reports non-2xx answers as a [`HostResponse`] rather than an error,
//! because the publish protocol branches on the status code.

pub mod bedrock;
pub mod github;
pub mod s3;

use crate::error::Diagram2TfError;
use crate::model::{InferenceRequest, InferenceResponse};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

/// Byte-level object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fails with [`Diagram2TfError::StorageFetch`].
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, Diagram2TfError>;

    /// Unconditional overwrite. Fails with [`Diagram2TfError::StorageWrite`].
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), Diagram2TfError>;
}

/// A blocking (non-streaming) multimodal model call.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Fails with [`Diagram2TfError::Inference`] on any non-success answer.
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResponse, Diagram2TfError>;

    fn model_id(&self) -> &str;
}

/// Status and decoded JSON body of a repository-host call.
#[derive(Debug, Clone, PartialEq)]
pub struct HostResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl HostResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The host's `message` field, or the whole body.
    pub fn detail(&self) -> String {
        match self.body.get("message").and_then(|m| m.as_str()) {
            Some(m) => m.to_string(),
            None => self.body.to_string(),
        }
    }
}

/// Source-control contents and pull-request API.
///
/// Implementations return `Err` only when no HTTP answer was obtained.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// `GET /repos/{repository}/contents/{path}?ref={git_ref}`
    async fn get_file(
        &self,
        repository: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<HostResponse, Diagram2TfError>;

    /// `PUT /repos/{repository}/contents/{request.path}`
    async fn put_file(
        &self,
        repository: &str,
        request: &FileUpsertRequest,
    ) -> Result<HostResponse, Diagram2TfError>;

    /// `POST /repos/{repository}/pulls`
    async fn create_pull_request(
        &self,
        repository: &str,
        request: &PullRequestRequest,
    ) -> Result<HostResponse, Diagram2TfError>;
}

/// Create-or-update of one file on one branch.
///
/// `existing_sha` present means update; absent means create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpsertRequest {
    pub path: String,
    pub content: Vec<u8>,
    pub message: String,
    pub branch: String,
    pub existing_sha: Option<String>,
}

#[derive(Serialize)]
struct PutContentsBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl FileUpsertRequest {
    /// JSON body of the contents write. The `sha` key is omitted entirely
    /// on creation; content is standard base64.
    pub fn wire_body(&self) -> serde_json::Value {
        let body = PutContentsBody {
            message: &self.message,
            content: STANDARD.encode(&self.content),
            branch: &self.branch,
            sha: self.existing_sha.as_deref(),
        };
        serde_json::to_value(body).unwrap_or(serde_json::Value::Null)
    }
}

/// Pull request from `head` into `base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}
