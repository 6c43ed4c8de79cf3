//! Invocation entry points.
//!
//! [`Pipeline::run`] drives one event through the stages and returns the
//! typed result; [`Pipeline::handle`] wraps it into the coarse
//! [`InvocationResult`] the invoker sees. Each stage either hands a value to
//! the next or fails the whole invocation; a failed stage is never retried
//! and nothing is rolled back.

use crate::config::{PipelineConfig, PublishTarget};
use crate::error::Diagram2TfError;
use crate::event::TriggerEvent;
use crate::output::{InvocationResult, RunOutput, RunStats};
use crate::pipeline::extract::{extract, Extraction};
use crate::pipeline::{ingest, interpret, postprocess, publish};
use crate::services::bedrock::BedrockInference;
use crate::services::github::GitHubClient;
use crate::services::s3::S3ObjectStore;
use crate::services::{InferenceClient, ObjectStore, RepositoryHost};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// A configured pipeline with its collaborators.
///
/// Cheap to clone; collaborators are shared.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    store: Arc<dyn ObjectStore>,
    inference: Arc<dyn InferenceClient>,
    host: Option<Arc<dyn RepositoryHost>>,
}

impl Pipeline {
    /// The repository host is created from the target on first use unless
    /// one is supplied with [`with_repository_host`](Self::with_repository_host).
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn ObjectStore>,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            config,
            store,
            inference,
            host: None,
        }
    }

    pub fn with_repository_host(mut self, host: Arc<dyn RepositoryHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Production wiring: S3, Bedrock, and GitHub when the target needs it.
    pub async fn from_config(config: PipelineConfig) -> Result<Self, Diagram2TfError> {
        let store = Arc::new(S3ObjectStore::from_env().await);
        let inference = Arc::new(BedrockInference::from_config(&config).await);
        let host = match &config.target {
            PublishTarget::VersionControl(target) => Some(GitHubClient::for_target(target)?),
            PublishTarget::Storage { .. } => None,
        };
        let pipeline = Self::new(config, store, inference);
        Ok(match host {
            Some(h) => pipeline.with_repository_host(Arc::new(h)),
            None => pipeline,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run all stages for one event.
    pub async fn run(&self, event: &TriggerEvent) -> Result<RunOutput, Diagram2TfError> {
        let total_start = Instant::now();
        info!(
            "Processing s3://{}/{}",
            event.source_bucket, event.object_key
        );

        // ── Step 1: Ingest ───────────────────────────────────────────────
        let image = ingest::ingest(self.store.as_ref(), event, &self.config.media_type).await?;
        let image_bytes = image.source_len;

        // ── Step 2: Interpret ────────────────────────────────────────────
        let llm_start = Instant::now();
        let response = interpret::interpret(self.inference.as_ref(), image, &self.config).await?;
        let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

        // ── Step 3: Extract ──────────────────────────────────────────────
        let extraction = extract(&response);
        let degraded = extraction.is_degraded();
        let artifact = match extraction {
            Extraction::Generated(text) if self.config.clean_output => {
                postprocess::clean_terraform(&text)
            }
            other => other.into_string(),
        };
        debug!("Artifact is {} bytes (degraded: {})", artifact.len(), degraded);

        // ── Step 4: Publish ──────────────────────────────────────────────
        let outcome = match &self.config.target {
            PublishTarget::Storage {
                destination_bucket,
                suffix,
            } => {
                publish::publish_to_storage(
                    self.store.as_ref(),
                    &event.object_key,
                    destination_bucket,
                    suffix,
                    &artifact,
                )
                .await?
            }
            PublishTarget::VersionControl(target) => {
                let host: Arc<dyn RepositoryHost> = match &self.host {
                    Some(h) => Arc::clone(h),
                    None => Arc::new(GitHubClient::for_target(target)?),
                };
                publish::publish_to_repository(host.as_ref(), target, &artifact).await?
            }
        };

        let usage = response.usage().unwrap_or_default();
        let stats = RunStats {
            image_bytes,
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            stop_reason: response.stop_reason().map(str::to_string),
            degraded,
            llm_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };
        info!(
            "Done in {}ms: {}",
            stats.total_duration_ms,
            outcome.summary()
        );

        Ok(RunOutput {
            artifact,
            outcome,
            stats,
        })
    }

    /// Run one event and fold the result into an [`InvocationResult`].
    pub async fn handle(&self, event: &TriggerEvent) -> InvocationResult {
        match self.run(event).await {
            Ok(output) => InvocationResult::ok(output.outcome.summary()),
            Err(e) => {
                error!("{}: {}", e.stage_message(), e);
                InvocationResult::from_error(&e)
            }
        }
    }

    /// Handle the first record of a raw storage notification.
    pub async fn handle_notification(&self, notification: &serde_json::Value) -> InvocationResult {
        match TriggerEvent::from_notification(notification) {
            Ok(event) => self.handle(&event).await,
            Err(e) => {
                error!("{}: {}", e.stage_message(), e);
                InvocationResult::from_error(&e)
            }
        }
    }

    /// Handle every record of a raw storage notification.
    ///
    /// A notification that cannot be read yields a single failed result.
    pub async fn handle_notification_batch(
        &self,
        notification: &serde_json::Value,
        concurrency: usize,
    ) -> Vec<InvocationResult> {
        match TriggerEvent::all_from_notification(notification) {
            Ok(events) => self.handle_batch(&events, concurrency).await,
            Err(e) => {
                error!("{}: {}", e.stage_message(), e);
                vec![InvocationResult::from_error(&e)]
            }
        }
    }

    /// Handle several events with at most `concurrency` in flight.
    ///
    /// Results are returned in input order. Events are independent: one
    /// failure does not stop the others.
    pub async fn handle_batch(
        &self,
        events: &[TriggerEvent],
        concurrency: usize,
    ) -> Vec<InvocationResult> {
        info!(
            "Processing {} events, concurrency {}",
            events.len(),
            concurrency
        );
        stream::iter(events.iter().map(|event| self.handle(event)))
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}
