//! CLI binary for diagram2tf.
//!
//! A thin shim over the library crate: reads a storage notification (or a
//! bucket/key pair), maps flags to `PipelineConfig`, runs the pipeline and
//! prints the invocation result as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use diagram2tf::{
    event, Diagram2TfError, ImageMediaType, InvocationResult, MediaTypePolicy, Pipeline,
    PipelineConfig, PromptProfile, PublishTarget, TriggerEvent, VersionControlTarget,
};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process a saved S3 notification, write the result to a bucket
  diagram2tf --destination-bucket terraform-out event.json

  # Notification on stdin
  cat event.json | diagram2tf --destination-bucket terraform-out -

  # No notification: name the object directly, open a pull request
  diagram2tf --bucket diagrams --key network.png \
             --github-repo acme/infra --github-token "$GITHUB_TOKEN"

  # Every record of a multi-record notification, 4 at a time
  diagram2tf --all-records --concurrency 4 --destination-bucket out event.json

ENVIRONMENT VARIABLES:
  DESTINATION_BUCKET           Bucket for generated Terraform (storage mode)
  GITHUB_REPO                  owner/name (pull-request mode, wins over storage)
  GITHUB_TOKEN                 Token for the GitHub REST API
  GITHUB_BRANCH                Working branch (default: develop)
  GITHUB_BASE_BRANCH           Pull-request base (default: main)
  GITHUB_FILE_PATH             File written in the repository (default: main.tf)
  GITHUB_API_URL               REST API root (default: https://api.github.com)
  DIAGRAM2TF_MODEL             Model id
  DIAGRAM2TF_MAX_TOKENS        Generation limit (default: 1000)
  DIAGRAM2TF_INFERENCE_REGION  Region of the inference endpoint (default: us-east-1)
  AWS_REGION, AWS_PROFILE, …   Standard AWS credential chain for S3 and Bedrock
  RUST_LOG                     Overrides -v/-q log filtering
"#;

/// Generate Terraform from architecture diagrams with a vision model.
#[derive(Parser, Debug)]
#[command(
    name = "diagram2tf",
    version,
    about = "Generate Terraform from architecture diagrams with a vision model",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// S3 notification JSON file, or "-" for stdin.
    #[arg(conflicts_with_all = ["bucket", "key"])]
    event: Option<PathBuf>,

    /// Source bucket (instead of a notification).
    #[arg(long, requires = "key")]
    bucket: Option<String>,

    /// Source object key (instead of a notification).
    #[arg(long, requires = "bucket")]
    key: Option<String>,

    /// Write the result to this bucket.
    #[arg(long, env = "DESTINATION_BUCKET")]
    destination_bucket: Option<String>,

    /// Repository (owner/name) to open the pull request against.
    #[arg(long, env = "GITHUB_REPO")]
    github_repo: Option<String>,

    /// GitHub token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Working branch for the generated file.
    #[arg(long, env = "GITHUB_BRANCH", default_value = "develop")]
    branch: String,

    /// Branch the pull request merges into.
    #[arg(long, env = "GITHUB_BASE_BRANCH", default_value = "main")]
    base_branch: String,

    /// Path of the generated file in the repository.
    #[arg(long, env = "GITHUB_FILE_PATH", default_value = "main.tf")]
    file_path: String,

    /// GitHub REST API root.
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Model id.
    #[arg(long, env = "DIAGRAM2TF_MODEL")]
    model: Option<String>,

    /// Max tokens the model may generate.
    #[arg(long, env = "DIAGRAM2TF_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// Region of the inference endpoint.
    #[arg(long, env = "DIAGRAM2TF_INFERENCE_REGION")]
    region: Option<String>,

    /// Built-in instruction profile.
    #[arg(long, value_enum, default_value = "conventions")]
    prompt: PromptArg,

    /// Text file with a custom instruction, replacing --prompt.
    #[arg(long)]
    instruction_file: Option<PathBuf>,

    /// Declare the media type sniffed from the image bytes instead of JPEG.
    #[arg(long)]
    detect_media_type: bool,

    /// Strip code fences and normalise whitespace in generated Terraform.
    #[arg(long)]
    clean_output: bool,

    /// Process every record of the notification, not just the first.
    #[arg(long)]
    all_records: bool,

    /// Events processed at once with --all-records.
    #[arg(short, long, default_value_t = 4)]
    concurrency: usize,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PromptArg {
    Basic,
    Conventions,
}

impl From<PromptArg> for PromptProfile {
    fn from(v: PromptArg) -> Self {
        match v {
            PromptArg::Basic => PromptProfile::Basic,
            PromptArg::Conventions => PromptProfile::Conventions,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config and pipeline ────────────────────────────────────────
    let config = build_config(&cli).await?;
    let pipeline = Pipeline::from_config(config)
        .await
        .context("Failed to set up collaborators")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let results = match (&cli.bucket, &cli.key) {
        (Some(bucket), Some(key)) => vec![pipeline.handle(&TriggerEvent::new(bucket, key)).await],
        _ => match read_event(cli.event.as_ref()).await {
            Ok(notification) if cli.all_records => {
                pipeline
                    .handle_notification_batch(&notification, cli.concurrency)
                    .await
            }
            Ok(notification) => vec![pipeline.handle_notification(&notification).await],
            Err(e) => {
                tracing::error!("{}", e);
                vec![InvocationResult::from_error(&e)]
            }
        },
    };

    // ── Report ───────────────────────────────────────────────────────────
    let json = if results.len() == 1 {
        serde_json::to_string_pretty(&results[0])
    } else {
        serde_json::to_string_pretty(&results)
    }
    .context("Failed to serialise result")?;
    println!("{json}");

    Ok(if results.iter().all(InvocationResult::is_success) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Read the notification from a file, or stdin for `-` / no argument.
async fn read_event(path: Option<&PathBuf>) -> Result<serde_json::Value, Diagram2TfError> {
    match path {
        Some(p) if p.as_os_str() != "-" => event::read_notification(p).await,
        _ => {
            let text = tokio::task::spawn_blocking(|| {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf).map(|_| buf)
            })
            .await
            .map_err(|e| Diagram2TfError::Internal(format!("stdin reader: {e}")))?
            .map_err(|e| Diagram2TfError::InvalidEvent(format!("stdin: {e}")))?;
            serde_json::from_str(&text)
                .map_err(|e| Diagram2TfError::InvalidEvent(format!("stdin: {e}")))
        }
    }
}

/// Blank values (e.g. `GITHUB_REPO=""`) count as unset.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let target = match (
        present(&cli.github_repo),
        present(&cli.github_token),
        present(&cli.destination_bucket),
    ) {
        (Some(repo), Some(token), _) => {
            let mut t = VersionControlTarget::new(repo, token);
            t.branch = cli.branch.clone();
            t.base_branch = cli.base_branch.clone();
            t.file_path = cli.file_path.clone();
            if let Some(ref url) = cli.api_url {
                t.api_base = url.clone();
            }
            PublishTarget::VersionControl(t)
        }
        (Some(_), None, _) => bail!("--github-repo needs --github-token (or GITHUB_TOKEN)"),
        (None, _, Some(bucket)) => PublishTarget::storage(bucket),
        (None, _, None) => {
            bail!("Set --destination-bucket, or --github-repo and --github-token")
        }
    };

    let mut builder = PipelineConfig::builder()
        .target(target)
        .max_tokens(cli.max_tokens)
        .prompt(cli.prompt.clone().into())
        .clean_output(cli.clean_output);

    if let Some(ref model) = cli.model {
        builder = builder.model_id(model);
    }
    if let Some(ref region) = cli.region {
        builder = builder.inference_region(region);
    }
    if cli.detect_media_type {
        builder = builder.media_type(MediaTypePolicy::Detect {
            fallback: ImageMediaType::Jpeg,
        });
    }
    if let Some(ref path) = cli.instruction_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(text);
    }

    builder.build().context("Invalid configuration")
}
