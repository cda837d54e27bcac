// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR Werk: scanned-document text extraction
//
// Entry point. Initialises logging, builds a document processor from the
// settings file and flags, and runs one extraction with Ctrl-C cancellation.
// Text goes to stdout, progress and errors to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{debug, info, warn};

use ocrwerk_core::cancel::CancellationToken;
use ocrwerk_core::config::{OcrwerkConfig, PipelineConfig};
use ocrwerk_core::error::{OcrwerkError, Result};
use ocrwerk_core::human_errors::user_facing_error;
use ocrwerk_core::types::{Profile, ProgressUpdate, SourceKind};
use ocrwerk_document::{DocumentProcessor, EngineLauncher, TesseractLauncher, detect_source_kind};

/// Exit status for a run stopped with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[derive(Debug, Parser)]
#[command(name = "ocrwerk", version, about = "Extract text from scanned images and PDFs")]
struct Cli {
    /// JSON settings file. Missing fields take their defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// How to treat the input bytes.
    #[arg(long, value_enum, default_value_t = SourceArg::Auto)]
    source: SourceArg,

    /// One-based page of a PDF to read.
    #[arg(long, value_name = "N", conflicts_with = "all_pages")]
    page: Option<usize>,

    /// Read every page of a PDF.
    #[arg(long)]
    all_pages: bool,

    #[arg(long, value_enum, default_value_t = EngineArg::Tesseract)]
    engine: EngineArg,

    /// Override the preprocessing profile for both images and pages.
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Path to the tesseract executable.
    #[arg(long, value_name = "PATH")]
    tesseract: Option<PathBuf>,

    /// Directory holding the ocrs detection and recognition models.
    #[arg(long, value_name = "DIR")]
    models: Option<PathBuf>,

    /// Debug-level logging (unless RUST_LOG is set).
    #[arg(short, long)]
    verbose: bool,

    /// Image or scanned PDF to read.
    input: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    Image,
    Page,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineArg {
    Tesseract,
    Ocrs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProfileArg {
    Standard,
    Enhanced,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Standard => Profile::Standard,
            ProfileArg::Enhanced => Profile::Enhanced,
        }
    }
}

/// Which document call a run maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Document(SourceKind),
    Page(usize),
    AllPages,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        Err(err) => match user_facing_error(&err) {
            None => {
                info!("Run cancelled");
                ExitCode::from(EXIT_CANCELLED)
            }
            Some(human) => {
                debug!(%err, kind = human.label, "Run failed");
                eprintln!("error: {}", human.message);
                eprintln!("  {}", human.suggestion);
                ExitCode::FAILURE
            }
        },
    }
}

async fn run(cli: Cli) -> Result<String> {
    let config = load_config(&cli)?;
    let launcher = build_launcher(&cli)?;
    let processor = DocumentProcessor::new(config, launcher)?;

    let input = tokio::fs::read(&cli.input).await?;
    let job = plan_job(&cli, &input)?;
    info!(input = %cli.input.display(), ?job, "Starting extraction");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let outcome = tokio::task::spawn_blocking(move || {
        let mut progress =
            |update: ProgressUpdate| eprintln!("[{:>3}%] {}", update.percent, update.label);
        match job {
            Job::Document(source) => {
                processor.process_document(&input, source, &cancel, &mut progress)
            }
            Job::Page(index) => processor.process_page(&input, index, &cancel, &mut progress),
            Job::AllPages => processor.process_all_pages(&input, &cancel, &mut progress),
        }
    })
    .await;
    watcher.abort();

    outcome.map_err(|join_err| OcrwerkError::Io(std::io::Error::other(join_err.to_string())))?
}

/// Settings file (or defaults) with the `--profile` override applied.
fn load_config(cli: &Cli) -> Result<OcrwerkConfig> {
    let mut config = match &cli.config {
        Some(path) => OcrwerkConfig::load(path)?,
        None => OcrwerkConfig::default(),
    };
    if let Some(profile) = cli.profile {
        let pipeline = PipelineConfig::for_profile(profile.into());
        config.image_pipeline = pipeline;
        config.page_pipeline = pipeline;
    }
    Ok(config)
}

fn build_launcher(cli: &Cli) -> Result<Box<dyn EngineLauncher>> {
    match cli.engine {
        EngineArg::Tesseract => {
            let launcher = match &cli.tesseract {
                Some(binary) => TesseractLauncher::with_binary(binary),
                None => TesseractLauncher::new(),
            };
            Ok(Box::new(launcher))
        }
        EngineArg::Ocrs => ocrs_launcher(cli),
    }
}

#[cfg(feature = "ocr")]
fn ocrs_launcher(cli: &Cli) -> Result<Box<dyn EngineLauncher>> {
    use ocrwerk_document::OcrsLauncher;

    let launcher = match &cli.models {
        Some(dir) => OcrsLauncher::from_model_dir(dir),
        None => OcrsLauncher::default(),
    };
    Ok(Box::new(launcher))
}

#[cfg(not(feature = "ocr"))]
fn ocrs_launcher(cli: &Cli) -> Result<Box<dyn EngineLauncher>> {
    if let Some(dir) = &cli.models {
        debug!(models = %dir.display(), "Ignoring model directory");
    }
    Err(OcrwerkError::EngineInitFailure(
        "this build has no ocrs engine; rebuild with `--features ocr`".into(),
    ))
}

/// Map flags and input bytes to a processor call.
fn plan_job(cli: &Cli, input: &[u8]) -> Result<Job> {
    let source = match cli.source {
        SourceArg::Image => SourceKind::Image,
        SourceArg::Page => SourceKind::RenderedPage,
        SourceArg::Auto => detect_source_kind(input)?,
    };

    let paged = cli.all_pages || cli.page.is_some();
    if paged && source == SourceKind::Image {
        return Err(OcrwerkError::UnsupportedInput(
            "--page and --all-pages need a PDF input".into(),
        ));
    }

    if cli.all_pages {
        return Ok(Job::AllPages);
    }
    match cli.page {
        Some(0) => Err(OcrwerkError::InvalidConfig(
            "page numbers start at 1".into(),
        )),
        Some(page) => Ok(Job::Page(page - 1)),
        None => Ok(Job::Document(source)),
    }
}
