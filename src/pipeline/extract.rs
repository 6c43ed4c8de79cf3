//! Response extraction: pick the generated text out of a multi-part answer.
//!
//! The first text part, in sequence order, is the artifact. Later text
//! parts are ignored, never concatenated. When the response has no text
//! part at all (empty content, only non-text parts, or a body that was not
//! the expected shape) the whole raw response is serialised instead and
//! published as a diagnostic, so the failure can be inspected where the
//! Terraform would have landed.

use crate::model::{InferenceResponse, ResponsePart};
use tracing::warn;

/// What the extract stage produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Text of the first text part.
    Generated(String),
    /// Pretty JSON of the raw response; no text part was found.
    Diagnostic(String),
}

impl Extraction {
    pub fn as_str(&self) -> &str {
        match self {
            Extraction::Generated(s) | Extraction::Diagnostic(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Extraction::Generated(s) | Extraction::Diagnostic(s) => s,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Extraction::Diagnostic(_))
    }
}

/// Return the first text part, or a diagnostic serialisation of `response`.
pub fn extract(response: &InferenceResponse) -> Extraction {
    for part in response.parts() {
        match part {
            ResponsePart::Text(text) => return Extraction::Generated(text.clone()),
            ResponsePart::Other { .. } => continue,
        }
    }

    let kinds: Vec<&str> = response
        .parts()
        .iter()
        .map(|p| match p {
            ResponsePart::Text(_) => "text",
            ResponsePart::Other { kind } => kind.as_deref().unwrap_or("?"),
        })
        .collect();
    warn!(
        "No text part in inference response (parts: {:?}); publishing raw response instead",
        kinds
    );
    Extraction::Diagnostic(response.to_diagnostic_json())
}
