//! Image ingest: storage object → base64 `EncodedImage`.
//!
//! The multimodal API takes images inline in the JSON body, so the bytes
//! are encoded with the RFC 4648 standard alphabet, padded, no line breaks.

use crate::config::MediaTypePolicy;
use crate::error::Diagram2TfError;
use crate::event::TriggerEvent;
use crate::model::ImageMediaType;
use crate::services::ObjectStore;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, info};

/// A diagram ready to embed in an inference request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub media_type: ImageMediaType,
    /// Size of the original object in bytes.
    pub source_len: usize,
}

/// Encode raw image bytes, choosing the declared media type per `policy`.
pub fn encode_image(bytes: &[u8], policy: &MediaTypePolicy) -> EncodedImage {
    let data = STANDARD.encode(bytes);
    let media_type = policy.resolve(bytes);
    debug!(
        "Encoded image → {} bytes base64 as {}",
        data.len(),
        media_type.as_str()
    );
    EncodedImage {
        data,
        media_type,
        source_len: bytes.len(),
    }
}

/// Fetch the object named by `event` and encode it.
pub async fn ingest(
    store: &dyn ObjectStore,
    event: &TriggerEvent,
    policy: &MediaTypePolicy,
) -> Result<EncodedImage, Diagram2TfError> {
    info!("Fetching s3://{}/{}", event.source_bucket, event.object_key);
    let bytes = store
        .get_object(&event.source_bucket, &event.object_key)
        .await?;
    Ok(encode_image(&bytes, policy))
}
