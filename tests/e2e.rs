//! End-to-end tests against real AWS services.
//!
//! These tests upload a diagram to a real bucket and make a live Bedrock
//! call. They are gated behind the `E2E_ENABLED` environment variable so
//! they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 E2E_SOURCE_BUCKET=my-diagrams E2E_DESTINATION_BUCKET=my-tf \
//!     cargo test --test e2e -- --nocapture
//!
//! `E2E_DIAGRAM` may point to a local image; otherwise
//! `test_cases/diagram.png` is used.

use diagram2tf::config::DEFAULT_OUTPUT_SUFFIX;
use diagram2tf::pipeline::publish::derive_output_key;
use diagram2tf::services::s3::S3ObjectStore;
use diagram2tf::services::ObjectStore;
use diagram2tf::{Pipeline, PipelineConfig, PublishTarget, TriggerEvent};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

struct LiveSetup {
    source_bucket: String,
    destination_bucket: String,
    diagram: PathBuf,
}

/// Skip this test unless E2E_ENABLED and both buckets are set and the
/// diagram exists.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let (Ok(source_bucket), Ok(destination_bucket)) = (
            std::env::var("E2E_SOURCE_BUCKET"),
            std::env::var("E2E_DESTINATION_BUCKET"),
        ) else {
            println!("SKIP: E2E_SOURCE_BUCKET and E2E_DESTINATION_BUCKET are required");
            return;
        };
        let diagram = std::env::var("E2E_DIAGRAM").map(PathBuf::from).unwrap_or_else(|_| {
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/diagram.png")
        });
        if !diagram.exists() {
            println!("SKIP: diagram not found: {}", diagram.display());
            return;
        }
        LiveSetup {
            source_bucket,
            destination_bucket,
            diagram,
        }
    }};
}

/// Assert the generated text looks like Terraform.
fn assert_terraform_quality(tf: &str, context: &str) {
    assert!(!tf.trim().is_empty(), "[{context}] Terraform is empty");
    assert!(
        tf.contains("resource \""),
        "[{context}] Expected at least one resource block"
    );
    assert!(
        !tf.lines().next().unwrap_or("").starts_with("```"),
        "[{context}] Output must not start with a code fence"
    );
    println!("[{context}] ✓  {} bytes", tf.len());
}

// ── Live run ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_live_storage_round_trip() {
    let setup = e2e_skip_unless_ready!();
    let key = format!("e2e/{}", setup.diagram.file_name().unwrap().to_string_lossy());

    let store = S3ObjectStore::from_env().await;
    let bytes = tokio::fs::read(&setup.diagram).await.expect("read diagram");
    store
        .put_object(&setup.source_bucket, &key, bytes, "image/png")
        .await
        .expect("upload diagram");

    let config = PipelineConfig::builder()
        .target(PublishTarget::storage(&setup.destination_bucket))
        .max_tokens(4000)
        .clean_output(true)
        .build()
        .expect("valid config");
    let pipeline = Pipeline::from_config(config).await.expect("pipeline");

    let out = pipeline
        .run(&TriggerEvent::new(&setup.source_bucket, &key))
        .await
        .expect("run should succeed");

    assert!(!out.stats.degraded, "model returned no text part");
    assert_terraform_quality(&out.artifact, "storage");

    let result_key = derive_output_key(&key, DEFAULT_OUTPUT_SUFFIX);
    let stored = store
        .get_object(&setup.destination_bucket, &result_key)
        .await
        .expect("result object");
    assert_eq!(stored.as_slice(), out.artifact.as_bytes());
    println!(
        "tokens: {} in / {} out, {}ms",
        out.stats.input_tokens, out.stats.output_tokens, out.stats.total_duration_ms
    );
}

#[tokio::test]
async fn test_live_missing_object_is_404() {
    let setup = e2e_skip_unless_ready!();

    let config = PipelineConfig::builder()
        .target(PublishTarget::storage(&setup.destination_bucket))
        .build()
        .expect("valid config");
    let pipeline = Pipeline::from_config(config).await.expect("pipeline");

    let result = pipeline
        .handle(&TriggerEvent::new(&setup.source_bucket, "e2e/definitely-not-here.png"))
        .await;
    assert_eq!(result.status_code, 404);
}
