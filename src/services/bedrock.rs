//! Bedrock runtime adapter for [`InferenceClient`].
//!
//! One `InvokeModel` call per request, JSON in and JSON out. The SDK's own
//! retry and timeout defaults apply; nothing is layered on top.

use super::InferenceClient;
use crate::config::PipelineConfig;
use crate::error::Diagram2TfError;
use crate::model::{InferenceRequest, InferenceResponse};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::config::Region;
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use tracing::debug;

#[derive(Clone)]
pub struct BedrockInference {
    client: Client,
    model_id: String,
}

impl BedrockInference {
    pub fn new(client: Client, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    /// Client pinned to `config.inference_region`, credentials from the
    /// default chain.
    pub async fn from_config(config: &PipelineConfig) -> Self {
        let aws_config = aws_config::from_env()
            .region(Region::new(config.inference_region.clone()))
            .load()
            .await;
        Self::new(Client::new(&aws_config), config.model_id.clone())
    }
}

#[async_trait]
impl InferenceClient for BedrockInference {
    async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceResponse, Diagram2TfError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| Diagram2TfError::Internal(format!("request serialisation: {e}")))?;
        debug!("InvokeModel {} ({} byte body)", self.model_id, body.len());

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| Diagram2TfError::Inference {
                model: self.model_id.clone(),
                status: e.raw_response().map(|r| r.status().as_u16()),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        Ok(InferenceResponse::from_body(output.body().as_ref()))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
