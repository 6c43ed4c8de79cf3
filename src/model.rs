//! Wire types for the multimodal inference service.
//!
//! The request side is fully typed and serialised with serde. The response
//! side is parsed leniently: the body is kept verbatim as a
//! [`serde_json::Value`] (needed for the diagnostic fallback) and its
//! `content` array is classified into [`ResponsePart`]s, so callers match on
//! a closed enum instead of probing maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Request ──────────────────────────────────────────────────────────────

/// Body of a single messages-API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub anthropic_version: String,
    pub max_tokens: usize,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// One tagged unit of a request message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Image { source: ImageSource },
    Text { text: String },
}

/// Inline image payload. `encoding` is always `"base64"` for this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub encoding: String,
    pub media_type: String,
    pub data: String,
}

/// Image formats accepted by the vision model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageMediaType {
    #[default]
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl ImageMediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageMediaType::Jpeg => "image/jpeg",
            ImageMediaType::Png => "image/png",
            ImageMediaType::Gif => "image/gif",
            ImageMediaType::Webp => "image/webp",
        }
    }

    /// Identify the format from its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(ImageMediaType::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(ImageMediaType::Jpeg)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(ImageMediaType::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(ImageMediaType::Webp)
        } else {
            None
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────

/// One element of the response `content` array.
///
/// A `"type": "text"` element without a string `text` field is classified
/// as [`ResponsePart::Other`]; it carries nothing publishable.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    Text(String),
    Other { kind: Option<String> },
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// A parsed inference response plus the untouched raw body.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResponse {
    parts: Vec<ResponsePart>,
    raw: Value,
}

impl InferenceResponse {
    /// Classify the `content` array of an already-decoded body.
    ///
    /// A missing or non-array `content` yields zero parts.
    pub fn from_value(raw: Value) -> Self {
        let parts = raw
            .get("content")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(classify_part).collect())
            .unwrap_or_default();
        Self { parts, raw }
    }

    /// Decode a response body. Bodies that are not JSON are kept as a JSON
    /// string so they still reach the diagnostic artifact.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Self::from_value(value),
            Err(e) => {
                tracing::warn!("Inference response is not JSON ({}); keeping raw text", e);
                Self::from_value(Value::String(String::from_utf8_lossy(body).into_owned()))
            }
        }
    }

    pub fn parts(&self) -> &[ResponsePart] {
        &self.parts
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn usage(&self) -> Option<TokenUsage> {
        let usage = self.raw.get("usage")?;
        Some(TokenUsage {
            input_tokens: usage.get("input_tokens").and_then(Value::as_u64).unwrap_or(0),
            output_tokens: usage.get("output_tokens").and_then(Value::as_u64).unwrap_or(0),
        })
    }

    pub fn stop_reason(&self) -> Option<&str> {
        self.raw.get("stop_reason").and_then(Value::as_str)
    }

    /// Pretty JSON of the whole raw body, four-space indented, non-ASCII kept.
    pub fn to_diagnostic_json(&self) -> String {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        match self.raw.serialize(&mut ser) {
            Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| self.raw.to_string()),
            Err(_) => self.raw.to_string(),
        }
    }
}

fn classify_part(item: &Value) -> ResponsePart {
    let kind = item.get("type").and_then(Value::as_str);
    match (kind, item.get("text").and_then(Value::as_str)) {
        (Some("text"), Some(text)) => ResponsePart::Text(text.to_string()),
        _ => ResponsePart::Other {
            kind: kind.map(str::to_string),
        },
    }
}
