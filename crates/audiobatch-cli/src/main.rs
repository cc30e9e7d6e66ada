//! audiobatch: convert video files to tagged audio files in one batch.
//!
//! Queues the given files, applies the same edits to each, converts them one
//! at a time and prints a line for every status change.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use audiobatch_core::defaults::VIDEO_EXTENSIONS;
use audiobatch_core::{paths, BatchConfig, Error, EventBus, JobField, QueueEvent};
use audiobatch_jobs::{
    BatchOrchestrator, ConversionBackend, FfmpegBackend, JobStore, NoOpBackend, UpdateOutcome,
};

#[derive(Parser)]
#[command(name = "audiobatch")]
#[command(author, version, about = "Batch video to audio conversion")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more video files
    Convert(ConvertArgs),

    /// Check that ffmpeg can be executed
    Probe,
}

#[derive(Args)]
struct ConvertArgs {
    /// Source video files, converted in the order given
    #[arg(required = true, num_args = 1..)]
    files: Vec<PathBuf>,

    /// Directory for the audio files (default: next to each source)
    #[arg(short, long)]
    output_dir: Option<String>,

    /// Output format: mp3, aac, wav or flac
    #[arg(short, long)]
    format: Option<String>,

    /// Artist tag for every file
    #[arg(short, long)]
    artist: Option<String>,

    /// Title tag and output name (default: source name without extension)
    #[arg(short, long)]
    title: Option<String>,

    /// Clip start as MM:SS
    #[arg(long)]
    start: Option<String>,

    /// Clip end as MM:SS
    #[arg(long)]
    end: Option<String>,

    /// Audio bitrate, e.g. 192k
    #[arg(long)]
    bitrate: Option<String>,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<String>,

    /// Channel count
    #[arg(long)]
    channels: Option<u32>,

    /// Run the batch without invoking ffmpeg
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_logging();

    let result = match cli.command {
        Commands::Convert(args) => cmd_convert(args).await,
        Commands::Probe => cmd_probe().await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize tracing with configurable output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
///   RUST_LOG    - standard env filter (default: "audiobatch=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "audiobatch=info,audiobatch_core=info,audiobatch_jobs=info".into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("audiobatch.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console output goes to stderr so stdout stays the status feed.
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

async fn cmd_convert(args: ConvertArgs) -> anyhow::Result<ExitCode> {
    let config = batch_config(&args)?;
    let bus = EventBus::default();
    let store = JobStore::new(bus.clone());

    let paths: Vec<String> = args
        .files
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    for path in &paths {
        if !has_video_extension(path) {
            warn!(path = %path, "File does not look like a supported video, queuing anyway");
        }
    }
    let ids = store.add_jobs(&paths).await?;

    if args.title.is_some() && ids.len() > 1 {
        warn!("Same title applied to several files; later outputs overwrite earlier ones");
    }
    for index in 0..ids.len() {
        apply_edits(&store, index, &args).await?;
    }

    let names: HashMap<Uuid, String> = store
        .snapshot()
        .await
        .into_iter()
        .map(|job| (job.id, job.display_name))
        .collect();
    for job in store.snapshot().await {
        println!(
            "{:<10} {} -> {}",
            job.status.label(),
            job.display_name,
            job.output_path(&config)
        );
    }

    let mut subscription = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Some(envelope) = subscription.recv().await {
            if let Some(line) = format_event(&envelope.payload, &names) {
                println!("{}", line);
            }
        }
    });

    let backend: Arc<dyn ConversionBackend> = if args.dry_run {
        Arc::new(NoOpBackend)
    } else {
        Arc::new(FfmpegBackend::from_env())
    };
    let orchestrator = BatchOrchestrator::new(store, backend);
    let selection: HashSet<Uuid> = ids.into_iter().collect();

    let result = orchestrator.run_batch(&selection, &config).await;

    // Closing every bus handle ends the printer once it has drained.
    drop(orchestrator);
    drop(bus);
    printer.await.context("event printer task panicked")?;

    match result {
        Ok(summary) if summary.all_succeeded() => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e @ Error::Validation { .. }) => {
            eprintln!("{}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

async fn cmd_probe() -> anyhow::Result<ExitCode> {
    let backend = FfmpegBackend::from_env();
    if backend.health_check().await? {
        println!("ffmpeg is available");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("ffmpeg could not be executed (set FFMPEG_PATH to override)");
        Ok(ExitCode::FAILURE)
    }
}

/// Environment config overridden by command-line flags.
fn batch_config(args: &ConvertArgs) -> anyhow::Result<BatchConfig> {
    let mut config = BatchConfig::from_env()?;
    if let Some(dir) = &args.output_dir {
        config = config.with_output_directory(dir.clone());
    }
    if let Some(bitrate) = &args.bitrate {
        config = config.with_bitrate(bitrate.clone());
    }
    if let Some(sample_rate) = &args.sample_rate {
        config = config.with_sample_rate(sample_rate.clone());
    }
    if let Some(channels) = args.channels {
        config = config.with_channels(channels);
    }
    Ok(config)
}

async fn apply_edits(store: &JobStore, index: usize, args: &ConvertArgs) -> anyhow::Result<()> {
    let edits = [
        (JobField::Title, &args.title),
        (JobField::Artist, &args.artist),
        (JobField::StartTime, &args.start),
        (JobField::EndTime, &args.end),
        (JobField::OutputFormat, &args.format),
    ];

    for (field, value) in edits {
        let Some(value) = value else { continue };
        if store.update_field(index, field, value).await? == UpdateOutcome::Rejected {
            bail!("invalid {} {:?}, expected MM:SS", field, value);
        }
    }
    Ok(())
}

fn has_video_extension(path: &str) -> bool {
    paths::split_extension(paths::file_name(path))
        .1
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// One status line for the events worth showing on a terminal.
fn format_event(event: &QueueEvent, names: &HashMap<Uuid, String>) -> Option<String> {
    let name = event
        .job_id()
        .and_then(|id| names.get(&id))
        .map(String::as_str)
        .unwrap_or("?");

    match event {
        QueueEvent::BatchStarted { batch_size } => {
            Some(format!("{:<10} converting {} file(s)", "Batch", batch_size))
        }
        QueueEvent::StatusChanged { to, .. } => Some(format!("{:<10} {}", to.label(), name)),
        QueueEvent::ConversionFailed { message, .. } => {
            Some(format!("{:<10} {}: {}", "Error", name, message))
        }
        QueueEvent::BatchFinished {
            succeeded,
            failed,
            skipped,
        } => Some(format!(
            "{:<10} finished: {} succeeded, {} failed, {} skipped",
            "Batch", succeeded, failed, skipped
        )),
        _ => None,
    }
}
