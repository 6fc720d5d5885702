use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flowsmith_core::{NodeIdGenerator, UserGuide, analyze, validate_structure};
use flowsmith_llm::{
    GenerateError, GeneratedResult, LlmConfig, generate_fallback, generate_workflow, user_prompt,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const PROMPT_PREVIEW_CHARS: usize = 500;

// ── CLI ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "flowsmith",
    about = "Generate n8n workflows from natural-language requirements"
)]
struct Cli {
    /// Directory for JSON log files
    #[arg(long, global = true, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a workflow with the model service
    Generate {
        requirement: String,

        #[command(flatten)]
        llm: LlmArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Build a template workflow from keywords alone, without a model call
    Fallback {
        requirement: String,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Check the structure of a workflow JSON file
    Validate {
        /// Workflow file, or `-` for stdin
        path: PathBuf,
    },
    /// Show the keyword analysis, user guide and prompt for a requirement
    Analyze { requirement: String },
}

#[derive(Args)]
struct LlmArgs {
    /// API key (overrides OPENAI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Base URL of an OpenAI-compatible service (overrides OPENAI_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Model name (overrides OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Write the result here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Emit only the workflow instead of the full result
    #[arg(long)]
    workflow_only: bool,
}

// ── Logging ─────────────────────────────────────────────────────

/// Console logs go to stderr so stdout stays clean JSON.
fn init_tracing(log_dir: &Path) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("flowsmith")
        .filename_suffix("txt")
        .build(log_dir)
        .context("Failed to create log file appender")?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_filter = EnvFilter::new("trace");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(
            fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(file_filter),
        )
        .init();

    Ok(guard)
}

// ── Commands ────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli.log_dir)?;

    match cli.command {
        Command::Generate {
            requirement,
            llm,
            output,
        } => {
            let mut config = LlmConfig::from_env();
            if let Some(base_url) = llm.base_url {
                config.base_url = base_url;
            }
            if let Some(model) = llm.model {
                config.model = model;
            }
            let result = generate_workflow(&requirement, llm.api_key.as_deref(), config)
                .await
                .map_err(report)?;
            write_result(&result, &output)
        }
        Command::Fallback {
            requirement,
            output,
        } => {
            let result =
                generate_fallback(&requirement, &NodeIdGenerator::new()).map_err(report)?;
            write_result(&result, &output)
        }
        Command::Validate { path } => validate(&path),
        Command::Analyze { requirement } => {
            let analysis = analyze(&requirement);
            let guide = UserGuide::from_analysis(&requirement, &analysis);
            let prompt: String = user_prompt(&requirement, &analysis)
                .chars()
                .take(PROMPT_PREVIEW_CHARS)
                .collect();
            let summary = serde_json::json!({
                "analysis": analysis,
                "userGuide": guide,
                "promptPreview": prompt,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
    }
}

/// Print the remediation hint, if any, before the error itself is reported.
fn report(err: GenerateError) -> anyhow::Error {
    if let Some(hint) = err.suggestion() {
        eprintln!("hint: {hint}");
    }
    anyhow::Error::new(err)
}

fn write_result(result: &GeneratedResult, output: &OutputArgs) -> Result<()> {
    let json = if output.workflow_only {
        serde_json::to_string_pretty(&result.workflow)?
    } else {
        serde_json::to_string_pretty(result)?
    };

    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    for issue in &result.validation.issues {
        eprintln!("issue: {issue}");
    }

    match &output.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Workflow written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let content = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };
    let candidate: serde_json::Value =
        serde_json::from_str(&content).context("Failed to parse workflow JSON")?;

    let report = validate_structure(&candidate);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_valid {
        anyhow::bail!("Workflow has {} structural issue(s)", report.issues.len());
    }
    Ok(())
}
