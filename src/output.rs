//! Results of a pipeline run.

use crate::error::Diagram2TfError;
use serde::{Deserialize, Serialize};

/// The coarse result handed back to the invoker: a status code plus a short
/// message naming the outcome or the failing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResult {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl InvocationResult {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            body: body.into(),
        }
    }

    pub fn from_error(err: &Diagram2TfError) -> Self {
        Self {
            status_code: err.status_code(),
            body: err.stage_message().to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Where the artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublishOutcome {
    Stored {
        bucket: String,
        key: String,
    },
    PullRequestOpened {
        repository: String,
        path: String,
        branch: String,
        base_branch: String,
        /// True when the file did not exist on the branch before the write.
        created: bool,
        commit_sha: Option<String>,
        pull_number: Option<u64>,
        pull_url: Option<String>,
    },
}

impl PublishOutcome {
    /// Body text of a successful invocation.
    pub fn summary(&self) -> String {
        match self {
            PublishOutcome::Stored { key, .. } => format!("Terraform code saved to S3: {key}"),
            PublishOutcome::PullRequestOpened { .. } => {
                "File successfully pushed and pull request created".to_string()
            }
        }
    }
}

/// Per-run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub image_bytes: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub stop_reason: Option<String>,
    /// The artifact is a raw-response diagnostic, not extracted text.
    pub degraded: bool,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutput {
    /// Exactly the text that was published.
    pub artifact: String,
    pub outcome: PublishOutcome,
    pub stats: RunStats,
}
