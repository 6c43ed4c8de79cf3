//! Error types for the diagram2tf library.
//!
//! Every hard failure in the pipeline is a [`Diagram2TfError`]. Each variant
//! belongs to exactly one stage, which is what lets
//! [`crate::handler::Pipeline::handle`] turn an error into a coarse
//! `statusCode` plus a body naming the failing stage.
//!
//! Two conditions look like errors but are *not* variants here:
//!
//! * An inference response without a text part becomes
//!   [`crate::pipeline::extract::Extraction::Diagnostic`] and is still
//!   published.
//! * A failed file-metadata probe on the repository host becomes
//!   [`crate::pipeline::publish::FileProbe::NotFound`]; the following write
//!   then either creates the file or is rejected by the host.

use thiserror::Error;

/// All fatal errors returned by the diagram2tf library.
#[derive(Debug, Error)]
pub enum Diagram2TfError {
    // ── Trigger ──────────────────────────────────────────────────────────
    /// The storage notification did not contain a usable record.
    #[error("Invalid trigger event: {0}")]
    InvalidEvent(String),

    // ── Ingest ───────────────────────────────────────────────────────────
    /// The diagram object could not be read from storage.
    #[error("Failed to fetch s3://{bucket}/{key}: {reason}")]
    StorageFetch {
        bucket: String,
        key: String,
        not_found: bool,
        reason: String,
    },

    // ── Interpret ────────────────────────────────────────────────────────
    /// The inference service rejected the request or could not be reached.
    #[error("Inference call to '{model}' failed: {reason}")]
    Inference {
        model: String,
        status: Option<u16>,
        reason: String,
    },

    // ── Publish ──────────────────────────────────────────────────────────
    /// Writing the result object to the destination bucket failed.
    #[error("Failed to write s3://{bucket}/{key}: {reason}")]
    StorageWrite {
        bucket: String,
        key: String,
        reason: String,
    },

    /// The repository host refused the create-or-update file request.
    #[error("Failed to write '{path}' to {repository}: {detail}")]
    VersionControlWrite {
        repository: String,
        path: String,
        status: Option<u16>,
        detail: String,
    },

    /// The repository host refused to open the pull request.
    #[error("Failed to open pull request {head} → {base} on {repository}: {detail}")]
    PullRequest {
        repository: String,
        head: String,
        base: String,
        status: Option<u16>,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or environment validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Diagram2TfError {
    /// HTTP-style status code reported in the invocation result.
    ///
    /// Collaborator statuses pass through unchanged where the collaborator
    /// answered; transport failures with no status map to 502.
    pub fn status_code(&self) -> u16 {
        match self {
            Diagram2TfError::InvalidEvent(_) => 400,
            Diagram2TfError::StorageFetch { not_found: true, .. } => 404,
            Diagram2TfError::StorageFetch { .. } => 502,
            Diagram2TfError::Inference { status, .. } => upstream_or_bad_gateway(*status),
            Diagram2TfError::StorageWrite { .. } => 502,
            Diagram2TfError::VersionControlWrite { status, .. } => upstream_or_bad_gateway(*status),
            Diagram2TfError::PullRequest { status, .. } => upstream_or_bad_gateway(*status),
            Diagram2TfError::InvalidConfig(_) | Diagram2TfError::Internal(_) => 500,
        }
    }

    /// Short, human-readable body naming the stage that failed.
    pub fn stage_message(&self) -> &'static str {
        match self {
            Diagram2TfError::InvalidEvent(_) => "Invalid trigger event",
            Diagram2TfError::StorageFetch { .. } => "Failed to fetch diagram from S3",
            Diagram2TfError::Inference { .. } => "Failed to invoke inference model",
            Diagram2TfError::StorageWrite { .. } => "Failed to save Terraform code to S3",
            Diagram2TfError::VersionControlWrite { .. } => "Failed to push file to GitHub",
            Diagram2TfError::PullRequest { .. } => "Failed to create pull request",
            Diagram2TfError::InvalidConfig(_) => "Invalid configuration",
            Diagram2TfError::Internal(_) => "Internal error",
        }
    }
}

// A 2xx "failure" would read as success to the caller.
fn upstream_or_bad_gateway(status: Option<u16>) -> u16 {
    match status {
        Some(code) if !(200..300).contains(&code) => code,
        _ => 502,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_failure_keeps_upstream_status() {
        let e = Diagram2TfError::VersionControlWrite {
            repository: "acme/infra".into(),
            path: "main.tf".into(),
            status: Some(409),
            detail: "sha mismatch".into(),
        };
        assert_eq!(e.status_code(), 409);
        assert_eq!(e.stage_message(), "Failed to push file to GitHub");
        assert!(e.to_string().contains("acme/infra"));
    }

    #[test]
    fn pull_request_conflict_surfaces_422() {
        let e = Diagram2TfError::PullRequest {
            repository: "acme/infra".into(),
            head: "develop".into(),
            base: "main".into(),
            status: Some(422),
            detail: "A pull request already exists".into(),
        };
        assert_eq!(e.status_code(), 422);
        assert_eq!(e.stage_message(), "Failed to create pull request");
    }

    #[test]
    fn transport_failures_map_to_bad_gateway() {
        let e = Diagram2TfError::Inference {
            model: "m".into(),
            status: None,
            reason: "dns".into(),
        };
        assert_eq!(e.status_code(), 502);

        let e = Diagram2TfError::PullRequest {
            repository: "a/b".into(),
            head: "develop".into(),
            base: "main".into(),
            status: Some(201),
            detail: "odd".into(),
        };
        assert_eq!(e.status_code(), 502);
    }

    #[test]
    fn missing_object_is_404() {
        let e = Diagram2TfError::StorageFetch {
            bucket: "in".into(),
            key: "diagram.png".into(),
            not_found: true,
            reason: "NoSuchKey".into(),
        };
        assert_eq!(e.status_code(), 404);
        assert!(e.to_string().contains("s3://in/diagram.png"));
    }

    #[test]
    fn invalid_event_is_400() {
        let e = Diagram2TfError::InvalidEvent("no records".into());
        assert_eq!(e.status_code(), 400);
    }
}
