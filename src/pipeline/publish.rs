//! Publishing: deliver the artifact to storage or to a pull request.
//!
//! ## Storage
//!
//! One unconditional `put`; the key is the source key without its
//! extension plus a fixed suffix (`diagram.png` → `diagram_terraform_code.tf`).
//!
//! ## Repository (probe → upsert → pull request)
//!
//! 1. **Probe** the file on the working branch. A 200 with a `sha` means
//!    *Found*; anything else (404, other status, transport error, missing
//!    sha) means *NotFound*. A failed probe is not an error.
//! 2. **Upsert** the content. The write carries `sha` only when the probe
//!    found one; the host rejects a create over an existing file and an
//!    update with a stale sha. A non-2xx answer aborts the run here and no
//!    pull request is attempted.
//! 3. **Open** a pull request from the working branch into the base branch,
//!    whether or not the content changed. An existing pull request for the
//!    same pair makes the host answer 422, which is reported as-is.
//!
//! Probe and upsert are only consistent when nothing else writes the same
//! path on the same branch in between. Concurrent runs against one branch
//! can race (the second write may carry a stale sha and be rejected); no
//! locking or re-probe is attempted.

use crate::config::VersionControlTarget;
use crate::error::Diagram2TfError;
use crate::output::PublishOutcome;
use crate::services::{FileUpsertRequest, ObjectStore, PullRequestRequest, RepositoryHost};
use serde_json::Value;
use tracing::{debug, info, warn};

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

// ── Storage ──────────────────────────────────────────────────────────────

/// Derive the destination key from the source key.
///
/// The extension of the last path segment is dropped (leading dots of a
/// segment are not an extension) and `suffix` appended.
pub fn derive_output_key(object_key: &str, suffix: &str) -> String {
    let name_start = object_key.rfind('/').map_or(0, |i| i + 1);
    let name = &object_key[name_start..];
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    let stem = match name[leading_dots..].rfind('.') {
        Some(dot) => &object_key[..name_start + leading_dots + dot],
        None => object_key,
    };
    format!("{stem}{suffix}")
}

/// Write `text` to `destination_bucket`, overwriting any existing object.
pub async fn publish_to_storage(
    store: &dyn ObjectStore,
    object_key: &str,
    destination_bucket: &str,
    suffix: &str,
    text: &str,
) -> Result<PublishOutcome, Diagram2TfError> {
    let key = derive_output_key(object_key, suffix);
    store
        .put_object(
            destination_bucket,
            &key,
            text.as_bytes().to_vec(),
            TEXT_CONTENT_TYPE,
        )
        .await?;
    info!("Terraform code saved to s3://{}/{}", destination_bucket, key);
    Ok(PublishOutcome::Stored {
        bucket: destination_bucket.to_string(),
        key,
    })
}

// ── Repository ───────────────────────────────────────────────────────────

/// Result of the metadata probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileProbe {
    Found { sha: String },
    NotFound,
}

impl FileProbe {
    pub fn sha(&self) -> Option<&str> {
        match self {
            FileProbe::Found { sha } => Some(sha),
            FileProbe::NotFound => None,
        }
    }
}

/// Look up the current content hash of the target file on the working branch.
pub async fn probe_file(host: &dyn RepositoryHost, target: &VersionControlTarget) -> FileProbe {
    let response = match host
        .get_file(&target.repository, &target.file_path, &target.branch)
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!("Could not read {} metadata, assuming new file: {}", target.file_path, e);
            return FileProbe::NotFound;
        }
    };

    match response.status {
        200 => match response.body.get("sha").and_then(Value::as_str) {
            Some(sha) if !sha.is_empty() => {
                debug!("{} exists on {} at {}", target.file_path, target.branch, sha);
                FileProbe::Found {
                    sha: sha.to_string(),
                }
            }
            _ => {
                warn!(
                    "{} metadata on {} has no sha (is it a directory?); treating as new file",
                    target.file_path, target.branch
                );
                FileProbe::NotFound
            }
        },
        404 => {
            debug!("{} not present on {}", target.file_path, target.branch);
            FileProbe::NotFound
        }
        status => {
            warn!(
                "Metadata probe of {} returned HTTP {} ({}); treating as new file",
                target.file_path,
                status,
                response.detail()
            );
            FileProbe::NotFound
        }
    }
}

/// Shape the contents write from the probe result.
pub fn build_upsert(target: &VersionControlTarget, text: &str, probe: &FileProbe) -> FileUpsertRequest {
    FileUpsertRequest {
        path: target.file_path.clone(),
        content: text.as_bytes().to_vec(),
        message: target.commit_message.clone(),
        branch: target.branch.clone(),
        existing_sha: probe.sha().map(str::to_string),
    }
}

pub fn build_pull_request(target: &VersionControlTarget) -> PullRequestRequest {
    PullRequestRequest {
        title: target.pull_request_title(),
        head: target.branch.clone(),
        base: target.base_branch.clone(),
        body: target.pull_request_body(),
    }
}

/// Probe, upsert, then open a pull request. Stops at the first failure.
pub async fn publish_to_repository(
    host: &dyn RepositoryHost,
    target: &VersionControlTarget,
    text: &str,
) -> Result<PublishOutcome, Diagram2TfError> {
    // ── Probe ────────────────────────────────────────────────────────────
    let probe = probe_file(host, target).await;
    let created = matches!(probe, FileProbe::NotFound);

    // ── Upsert ───────────────────────────────────────────────────────────
    let upsert = build_upsert(target, text, &probe);
    let written = host.put_file(&target.repository, &upsert).await?;
    if !written.is_success() {
        return Err(Diagram2TfError::VersionControlWrite {
            repository: target.repository.clone(),
            path: target.file_path.clone(),
            status: Some(written.status),
            detail: written.detail(),
        });
    }
    let commit_sha = written
        .body
        .pointer("/commit/sha")
        .and_then(Value::as_str)
        .map(str::to_string);
    info!(
        "{} {} on {}/{}",
        if created { "Created" } else { "Updated" },
        target.file_path,
        target.repository,
        target.branch
    );

    // ── Pull request ─────────────────────────────────────────────────────
    let pr = build_pull_request(target);
    let opened = host.create_pull_request(&target.repository, &pr).await?;
    if !opened.is_success() {
        return Err(Diagram2TfError::PullRequest {
            repository: target.repository.clone(),
            head: pr.head,
            base: pr.base,
            status: Some(opened.status),
            detail: opened.detail(),
        });
    }
    let pull_number = opened.body.get("number").and_then(Value::as_u64);
    let pull_url = opened
        .body
        .get("html_url")
        .and_then(Value::as_str)
        .map(str::to_string);
    info!(
        "Opened pull request {} → {}{}",
        pr.head,
        pr.base,
        pull_url.as_deref().map(|u| format!(": {u}")).unwrap_or_default()
    );

    Ok(PublishOutcome::PullRequestOpened {
        repository: target.repository.clone(),
        path: target.file_path.clone(),
        branch: target.branch.clone(),
        base_branch: target.base_branch.clone(),
        created,
        commit_sha,
        pull_number,
        pull_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::HostResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn derive_strips_extension() {
        assert_eq!(derive_output_key("diagram1.png", "_terraform_code.tf"), "diagram1_terraform_code.tf");
        assert_eq!(derive_output_key("diagram.png", "_terraform_code.tf"), "diagram_terraform_code.tf");
    }

    #[test]
    fn derive_only_touches_last_segment() {
        let s = "_terraform_code.tf";
        assert_eq!(derive_output_key("uploads/v1.2/net.jpeg", s), "uploads/v1.2/net_terraform_code.tf");
        assert_eq!(derive_output_key("uploads.d/diagram", s), "uploads.d/diagram_terraform_code.tf");
        assert_eq!(derive_output_key("archive.tar.gz", s), "archive.tar_terraform_code.tf");
        assert_eq!(derive_output_key(".hidden", s), ".hidden_terraform_code.tf");
        assert_eq!(derive_output_key("dir/..png", s), "dir/..png_terraform_code.tf");
    }

    #[test]
    fn derive_is_deterministic() {
        let a = derive_output_key("diagram1.png", "_terraform_code.tf");
        let b = derive_output_key("diagram1.png", "_terraform_code.tf");
        assert_eq!(a, b);
    }

    #[test]
    fn upsert_carries_sha_only_when_found() {
        let t = VersionControlTarget::new("acme/infra", "tok");
        let found = build_upsert(&t, "x", &FileProbe::Found { sha: "abc123".into() });
        assert_eq!(found.existing_sha.as_deref(), Some("abc123"));
        assert_eq!(found.wire_body()["sha"], "abc123");

        let new = build_upsert(&t, "x", &FileProbe::NotFound);
        assert_eq!(new.existing_sha, None);
        assert!(new.wire_body().get("sha").is_none());
        assert_eq!(new.branch, "develop");
        assert_eq!(new.path, "main.tf");
    }

    #[test]
    fn pull_request_is_develop_into_main() {
        let pr = build_pull_request(&VersionControlTarget::new("acme/infra", "tok"));
        assert_eq!(pr.head, "develop");
        assert_eq!(pr.base, "main");
        assert_eq!(pr.title, "Merge develop into main");
    }

    /// Scripted host: answers are fixed up front, calls are recorded.
    struct ScriptedHost {
        probe: Result<HostResponse, ()>,
        put: HostResponse,
        pull: HostResponse,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedHost {
        fn new(probe: Result<HostResponse, ()>, put: HostResponse, pull: HostResponse) -> Self {
            Self {
                probe,
                put,
                pull,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn resp(status: u16, body: Value) -> HostResponse {
        HostResponse { status, body }
    }

    #[async_trait]
    impl RepositoryHost for ScriptedHost {
        async fn get_file(&self, _: &str, _: &str, git_ref: &str) -> Result<HostResponse, Diagram2TfError> {
            self.calls.lock().unwrap().push(format!("get ref={git_ref}"));
            self.probe
                .clone()
                .map_err(|_| Diagram2TfError::Internal("connection reset".into()))
        }

        async fn put_file(&self, _: &str, req: &FileUpsertRequest) -> Result<HostResponse, Diagram2TfError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("put sha={}", req.existing_sha.as_deref().unwrap_or("-")));
            Ok(self.put.clone())
        }

        async fn create_pull_request(&self, _: &str, req: &PullRequestRequest) -> Result<HostResponse, Diagram2TfError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("pull {}->{}", req.head, req.base));
            Ok(self.pull.clone())
        }
    }

    #[tokio::test]
    async fn probe_found_uses_sha() {
        let host = ScriptedHost::new(
            Ok(resp(200, json!({"sha": "abc123", "path": "main.tf"}))),
            resp(200, json!({"commit": {"sha": "c0ffee"}})),
            resp(201, json!({"number": 7, "html_url": "https://github.com/acme/infra/pull/7"})),
        );
        let t = VersionControlTarget::new("acme/infra", "tok");
        let out = publish_to_repository(&host, &t, "terraform").await.unwrap();
        assert_eq!(host.calls(), vec!["get ref=develop", "put sha=abc123", "pull develop->main"]);
        match out {
            PublishOutcome::PullRequestOpened {
                created,
                commit_sha,
                pull_number,
                ..
            } => {
                assert!(!created);
                assert_eq!(commit_sha.as_deref(), Some("c0ffee"));
                assert_eq!(pull_number, Some(7));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn probe_failures_are_not_fatal() {
        for probe in [
            Ok(resp(404, json!({"message": "Not Found"}))),
            Ok(resp(403, json!({"message": "rate limited"}))),
            Ok(resp(200, json!([{"name": "a.tf"}]))),
            Ok(resp(200, json!({"sha": ""}))),
            Err(()),
        ] {
            let host = ScriptedHost::new(probe, resp(201, json!({})), resp(201, json!({})));
            let t = VersionControlTarget::new("acme/infra", "tok");
            publish_to_repository(&host, &t, "x").await.unwrap();
            assert_eq!(host.calls()[1], "put sha=-");
        }
    }

    #[tokio::test]
    async fn failed_upsert_skips_pull_request() {
        let host = ScriptedHost::new(
            Ok(resp(200, json!({"sha": "stale"}))),
            resp(409, json!({"message": "main.tf does not match stale"})),
            resp(201, json!({})),
        );
        let t = VersionControlTarget::new("acme/infra", "tok");
        let err = publish_to_repository(&host, &t, "x").await.unwrap_err();
        assert_eq!(err.status_code(), 409);
        assert!(err.to_string().contains("does not match"));
        assert_eq!(host.calls().len(), 2);
    }

    #[tokio::test]
    async fn existing_pull_request_is_reported() {
        let host = ScriptedHost::new(
            Ok(resp(404, json!({}))),
            resp(201, json!({})),
            resp(422, json!({"message": "Validation Failed"})),
        );
        let t = VersionControlTarget::new("acme/infra", "tok");
        let err = publish_to_repository(&host, &t, "x").await.unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.stage_message(), "Failed to create pull request");
    }
}
