mod classifier;
mod config;
mod document;
mod errors;
mod extraction;
mod features;
mod llm_client;
mod pipeline;
mod scoring;
mod state;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::document::reader::DocumentFormat;
use crate::errors::ExtractionError;
use crate::state::AppState;

/// Extracts shortlisting features from a resume and scores it against a job description.
#[derive(Parser)]
#[command(name = "screener", version, long_about = None)]
#[command(group(ArgGroup::new("jd").required(true).args(["job_description", "job_description_file"])))]
struct Cli {
    /// Resume document (.pdf or .txt), or `-` to read it from stdin
    #[arg(long)]
    resume: PathBuf,

    /// Format of a resume read from stdin
    #[arg(long, value_enum, default_value = "pdf")]
    stdin_format: StdinFormat,

    /// Job description text
    #[arg(long)]
    job_description: Option<String>,

    /// File holding the job description
    #[arg(long)]
    job_description_file: Option<PathBuf>,

    /// Processing date used for "present" (YYYY-MM-DD, default today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StdinFormat {
    Pdf,
    Txt,
}

impl From<StdinFormat> for DocumentFormat {
    fn from(format: StdinFormat) -> Self {
        match format {
            StdinFormat::Pdf => DocumentFormat::Pdf,
            StdinFormat::Txt => DocumentFormat::PlainText,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr; stdout carries the JSON result.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    let job_description = match (&cli.job_description, &cli.job_description_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job description from {}", path.display()))?,
        (None, None) => anyhow::bail!("a job description is required"),
    };
    let today = cli.as_of.unwrap_or_else(|| Local::now().date_naive());

    let source = if cli.resume.as_os_str() == "-" {
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read resume from stdin")?;
        Source::Upload(bytes, cli.stdin_format.into())
    } else {
        Source::File(cli.resume.clone())
    };

    let outcome = run(&config, source, &job_description, today).await;
    let (rendered, code) = match outcome {
        Ok(result) => (pipeline::render(&result, cli.pretty)?, ExitCode::SUCCESS),
        Err(e) => {
            let code = if e.is_input_error() { 2 } else { 1 };
            let envelope = e.to_envelope();
            let rendered = if cli.pretty {
                serde_json::to_string_pretty(&envelope)?
            } else {
                serde_json::to_string(&envelope)?
            };
            (rendered, ExitCode::from(code))
        }
    };
    println!("{rendered}");

    Ok(code)
}

enum Source {
    File(PathBuf),
    Upload(Vec<u8>, DocumentFormat),
}

async fn run(
    config: &Config,
    source: Source,
    job_description: &str,
    today: NaiveDate,
) -> Result<pipeline::ScreeningResult, ExtractionError> {
    let state = AppState::initialize(config).await?;
    match source {
        Source::File(path) => pipeline::screen_file(&state, &path, job_description, today).await,
        Source::Upload(bytes, format) => {
            pipeline::screen_upload(&state, &bytes, format, job_description, today).await
        }
    }
}
