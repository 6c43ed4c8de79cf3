//! # diagram2tf
//!
//! Turn an uploaded architecture diagram into Terraform using a multimodal
//! model, then deliver the code to a bucket or as a pull request.
//!
//! ## Pipeline Overview
//!
//! ```text
//! storage notification
//!  │
//!  ├─ 1. Ingest     fetch the image object, base64-encode it
//!  ├─ 2. Interpret  one InvokeModel call: image + instruction
//!  ├─ 3. Extract    first text part, or the raw response as a diagnostic
//!  ├─ 4. Polish     optional Terraform cleanup (fences, line endings)
//!  └─ 5. Publish    S3 object, or GitHub file upsert + pull request
//! ```
//!
//! Every run ends in an [`InvocationResult`]: `200` with a summary, or the
//! failing stage's status and message.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use diagram2tf::{Pipeline, PipelineConfig, TriggerEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // DESTINATION_BUCKET, or GITHUB_REPO + GITHUB_TOKEN
//!     let config = PipelineConfig::from_env()?;
//!     let pipeline = Pipeline::from_config(config).await?;
//!     let result = pipeline
//!         .handle(&TriggerEvent::new("diagrams", "network.png"))
//!         .await;
//!     println!("{} {}", result.status_code, result.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `diagram2tf` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Collaborators
//!
//! Storage, inference and the repository host are traits in [`services`];
//! tests substitute in-memory fakes through [`Pipeline::new`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod services;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    MediaTypePolicy, PipelineConfig, PipelineConfigBuilder, PublishTarget, VersionControlTarget,
};
pub use error::Diagram2TfError;
pub use event::TriggerEvent;
pub use handler::Pipeline;
pub use model::ImageMediaType;
pub use output::{InvocationResult, PublishOutcome, RunOutput, RunStats};
pub use pipeline::extract::Extraction;
pub use prompts::PromptProfile;
