//! Model interaction: build the vision request and call the service once.
//!
//! Instruction text lives in [`crate::prompts`] and transport in
//! [`crate::services`]. There is no retry here; a failed call fails the
//! invocation.

use crate::config::PipelineConfig;
use crate::error::Diagram2TfError;
use crate::model::{ContentPart, ImageSource, InferenceRequest, InferenceResponse, Message};
use crate::pipeline::ingest::EncodedImage;
use crate::services::InferenceClient;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Build the single-message request.
///
/// ## Message Layout
///
/// One `user` message containing, in order:
/// 1. the diagram as a base64 image part
/// 2. the instruction as a text part
pub fn build_request(image: EncodedImage, config: &PipelineConfig) -> InferenceRequest {
    InferenceRequest {
        anthropic_version: config.anthropic_version.clone(),
        max_tokens: config.max_tokens,
        messages: vec![Message {
            role: "user".to_string(),
            content: vec![
                ContentPart::Image {
                    source: ImageSource {
                        encoding: "base64".to_string(),
                        media_type: image.media_type.as_str().to_string(),
                        data: image.data,
                    },
                },
                ContentPart::Text {
                    text: config.instruction_text().to_string(),
                },
            ],
        }],
    }
}

/// Send the diagram to the model and wait for the full response.
///
/// The encoded image is consumed; it is not needed after the call.
pub async fn interpret(
    client: &dyn InferenceClient,
    image: EncodedImage,
    config: &PipelineConfig,
) -> Result<InferenceResponse, Diagram2TfError> {
    let start = Instant::now();
    let request = build_request(image, config);

    info!("Invoking {}", client.model_id());
    let response = client.invoke(&request).await?;

    if let Some(usage) = response.usage() {
        debug!(
            "{} input tokens, {} output tokens, {:?}",
            usage.input_tokens,
            usage.output_tokens,
            start.elapsed()
        );
    }
    if response.stop_reason() == Some("max_tokens") {
        warn!(
            "Model stopped at max_tokens ({}); generated Terraform is likely truncated",
            config.max_tokens
        );
    }

    Ok(response)
}
