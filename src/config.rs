//! Configuration types for a diagram-to-Terraform run.
//!
//! Everything the pipeline needs from its environment is captured once in
//! [`PipelineConfig`] and handed to [`crate::handler::Pipeline::new`]. No
//! stage reads environment variables; [`PipelineConfig::from_env`] is the
//! only place that does.

use crate::error::Diagram2TfError;
use crate::model::ImageMediaType;
use crate::prompts::PromptProfile;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";
pub const DEFAULT_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
pub const DEFAULT_INFERENCE_REGION: &str = "us-east-1";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_terraform_code.tf";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Configuration for one pipeline instance.
///
/// Built via [`PipelineConfig::builder()`] or [`PipelineConfig::from_env()`].
///
/// # Example
/// ```rust
/// use diagram2tf::{PipelineConfig, PublishTarget};
///
/// let config = PipelineConfig::builder()
///     .max_tokens(2000)
///     .target(PublishTarget::storage("terraform-out"))
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 2000);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Inference model identifier. Default: [`DEFAULT_MODEL_ID`].
    pub model_id: String,

    /// Messages-API version string sent in every request.
    pub anthropic_version: String,

    /// Maximum tokens the model may generate. Default: 1000.
    ///
    /// Larger diagrams can exceed this; a truncated answer is logged when the
    /// service reports `stop_reason = "max_tokens"`.
    pub max_tokens: usize,

    /// Region hosting the inference endpoint. Default: `us-east-1`.
    pub inference_region: String,

    /// How the image media type is chosen. Default: fixed JPEG.
    pub media_type: MediaTypePolicy,

    /// Built-in instruction profile used when `instruction` is `None`.
    pub prompt: PromptProfile,

    /// Custom instruction text, replacing the profile.
    pub instruction: Option<String>,

    /// Run the Terraform cleanup rules on generated text. Default: false.
    ///
    /// When off, the published bytes are exactly what the model produced.
    /// Diagnostic artifacts are never cleaned.
    pub clean_output: bool,

    /// Where the result is delivered.
    pub target: PublishTarget,
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("model_id", &self.model_id)
            .field("anthropic_version", &self.anthropic_version)
            .field("max_tokens", &self.max_tokens)
            .field("inference_region", &self.inference_region)
            .field("media_type", &self.media_type)
            .field("prompt", &self.prompt)
            .field("instruction", &self.instruction.as_ref().map(|s| s.len()))
            .field("clean_output", &self.clean_output)
            .field("target", &self.target)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder. The target defaults to an empty storage bucket
    /// and must be set before `build()` succeeds.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self {
                model_id: DEFAULT_MODEL_ID.to_string(),
                anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
                max_tokens: 1000,
                inference_region: DEFAULT_INFERENCE_REGION.to_string(),
                media_type: MediaTypePolicy::default(),
                prompt: PromptProfile::default(),
                instruction: None,
                clean_output: false,
                target: PublishTarget::storage(""),
            },
        }
    }

    /// Read configuration from the process environment.
    ///
    /// `GITHUB_REPO` + `GITHUB_TOKEN` select the pull-request target;
    /// otherwise `DESTINATION_BUCKET` selects the storage target.
    pub fn from_env() -> Result<Self, Diagram2TfError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Diagram2TfError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let target = match (get("GITHUB_REPO"), get("GITHUB_TOKEN"), get("DESTINATION_BUCKET")) {
            (Some(repository), Some(token), _) => {
                let mut t = VersionControlTarget::new(repository, token);
                if let Some(v) = get("GITHUB_BRANCH") {
                    t.branch = v;
                }
                if let Some(v) = get("GITHUB_BASE_BRANCH") {
                    t.base_branch = v;
                }
                if let Some(v) = get("GITHUB_FILE_PATH") {
                    t.file_path = v;
                }
                if let Some(v) = get("GITHUB_API_URL") {
                    t.api_base = v;
                }
                PublishTarget::VersionControl(t)
            }
            (Some(_), None, _) => {
                return Err(Diagram2TfError::InvalidConfig(
                    "GITHUB_REPO is set but GITHUB_TOKEN is missing".into(),
                ))
            }
            (None, _, Some(bucket)) => PublishTarget::storage(bucket),
            (None, _, None) => {
                return Err(Diagram2TfError::InvalidConfig(
                    "Set DESTINATION_BUCKET, or GITHUB_REPO and GITHUB_TOKEN".into(),
                ))
            }
        };

        let mut builder = Self::builder().target(target);
        if let Some(model) = get("DIAGRAM2TF_MODEL") {
            builder = builder.model_id(model);
        }
        if let Some(region) = get("DIAGRAM2TF_INFERENCE_REGION") {
            builder = builder.inference_region(region);
        }
        if let Some(n) = get("DIAGRAM2TF_MAX_TOKENS") {
            let n = n.trim().parse::<usize>().map_err(|e| {
                Diagram2TfError::InvalidConfig(format!("DIAGRAM2TF_MAX_TOKENS '{n}': {e}"))
            })?;
            builder = builder.max_tokens(n);
        }
        builder.build()
    }

    /// The instruction actually sent to the model.
    pub fn instruction_text(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or_else(|| self.prompt.instruction())
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn model_id(mut self, model: impl Into<String>) -> Self {
        self.config.model_id = model.into();
        self
    }

    pub fn anthropic_version(mut self, version: impl Into<String>) -> Self {
        self.config.anthropic_version = version.into();
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn inference_region(mut self, region: impl Into<String>) -> Self {
        self.config.inference_region = region.into();
        self
    }

    pub fn media_type(mut self, policy: MediaTypePolicy) -> Self {
        self.config.media_type = policy;
        self
    }

    pub fn prompt(mut self, profile: PromptProfile) -> Self {
        self.config.prompt = profile;
        self
    }

    pub fn instruction(mut self, text: impl Into<String>) -> Self {
        self.config.instruction = Some(text.into());
        self
    }

    pub fn clean_output(mut self, v: bool) -> Self {
        self.config.clean_output = v;
        self
    }

    pub fn target(mut self, target: PublishTarget) -> Self {
        self.config.target = target;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Diagram2TfError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(Diagram2TfError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.model_id.trim().is_empty() {
            return Err(Diagram2TfError::InvalidConfig("model id must not be empty".into()));
        }
        if matches!(&c.instruction, Some(s) if s.trim().is_empty()) {
            return Err(Diagram2TfError::InvalidConfig("instruction must not be empty".into()));
        }
        c.target.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Media type declared for the image part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaTypePolicy {
    /// Always declare this type, whatever the bytes are.
    Fixed(ImageMediaType),
    /// Sniff the magic bytes; use the fallback when unrecognised.
    Detect { fallback: ImageMediaType },
}

impl Default for MediaTypePolicy {
    fn default() -> Self {
        MediaTypePolicy::Fixed(ImageMediaType::Jpeg)
    }
}

impl MediaTypePolicy {
    pub fn resolve(&self, bytes: &[u8]) -> ImageMediaType {
        match self {
            MediaTypePolicy::Fixed(t) => *t,
            MediaTypePolicy::Detect { fallback } => ImageMediaType::sniff(bytes).unwrap_or(*fallback),
        }
    }
}

/// Destination of the generated Terraform text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    /// Write one object; key is the source key's stem plus `suffix`.
    Storage {
        destination_bucket: String,
        suffix: String,
    },
    /// Create or update a file on a branch and open a pull request.
    VersionControl(VersionControlTarget),
}

impl PublishTarget {
    pub fn storage(destination_bucket: impl Into<String>) -> Self {
        PublishTarget::Storage {
            destination_bucket: destination_bucket.into(),
            suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }

    fn validate(&self) -> Result<(), Diagram2TfError> {
        match self {
            PublishTarget::Storage {
                destination_bucket,
                suffix,
            } => {
                if destination_bucket.trim().is_empty() {
                    return Err(Diagram2TfError::InvalidConfig(
                        "destination bucket must not be empty".into(),
                    ));
                }
                if suffix.is_empty() {
                    return Err(Diagram2TfError::InvalidConfig(
                        "output key suffix must not be empty".into(),
                    ));
                }
                Ok(())
            }
            PublishTarget::VersionControl(t) => t.validate(),
        }
    }
}

/// Repository, branches and credentials for the pull-request flow.
#[derive(Clone, PartialEq, Eq)]
pub struct VersionControlTarget {
    /// `owner/name`.
    pub repository: String,
    /// Path of the file inside the repository. Default: `main.tf`.
    pub file_path: String,
    /// Working branch the file is written to. Default: `develop`.
    pub branch: String,
    /// Branch the pull request merges into. Default: `main`.
    pub base_branch: String,
    /// Bearer token passed through to the host API.
    pub auth_token: String,
    pub commit_message: String,
    /// REST API root. Default: [`DEFAULT_GITHUB_API`].
    pub api_base: String,
}

impl fmt::Debug for VersionControlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionControlTarget")
            .field("repository", &self.repository)
            .field("file_path", &self.file_path)
            .field("branch", &self.branch)
            .field("base_branch", &self.base_branch)
            .field("auth_token", &"<redacted>")
            .field("commit_message", &self.commit_message)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl VersionControlTarget {
    pub fn new(repository: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            file_path: "main.tf".to_string(),
            branch: "develop".to_string(),
            base_branch: "main".to_string(),
            auth_token: auth_token.into(),
            commit_message: "Add generated Terraform code from Bedrock".to_string(),
            api_base: DEFAULT_GITHUB_API.to_string(),
        }
    }

    pub fn pull_request_title(&self) -> String {
        format!("Merge {} into {}", self.branch, self.base_branch)
    }

    pub fn pull_request_body(&self) -> String {
        format!(
            "This PR merges the generated Terraform code into the {} branch.",
            self.base_branch
        )
    }

    fn validate(&self) -> Result<(), Diagram2TfError> {
        let invalid = |msg: String| Err(Diagram2TfError::InvalidConfig(msg));
        match self.repository.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {}
            _ => return invalid(format!("repository must be owner/name, got '{}'", self.repository)),
        }
        if self.auth_token.trim().is_empty() {
            return invalid("auth token must not be empty".into());
        }
        if self.file_path.trim().is_empty() {
            return invalid("file path must not be empty".into());
        }
        if self.branch.trim().is_empty() || self.base_branch.trim().is_empty() {
            return invalid("branch names must not be empty".into());
        }
        if self.branch == self.base_branch {
            return invalid(format!(
                "working branch and base branch are both '{}'",
                self.branch
            ));
        }
        Ok(())
    }
}
