//! Pipeline stages for diagram-to-Terraform conversion.
//!
//! Each submodule implements exactly one step. Stages run strictly in
//! order for one event; nothing here spawns or shares state.
//!
//! ## Data Flow
//!
//! ```text
//! ingest ──▶ interpret ──▶ extract ──▶ [postprocess] ──▶ publish
//! (S3+b64)    (model)      (1st text)   (opt-in)          (S3 | PR)
//! ```
//!
//! 1. [`ingest`]: fetch the diagram bytes and base64-encode them
//! 2. [`interpret`]: build the one-message request and call the model once
//! 3. [`extract`]: first text part, or the raw response as a diagnostic
//! 4. [`postprocess`]: deterministic Terraform cleanup, only when enabled
//! 5. [`publish`]: write the object, or probe/upsert/open a pull request

pub mod extract;
pub mod ingest;
pub mod interpret;
pub mod postprocess;
pub mod publish;
