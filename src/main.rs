//! CLI entry point for transit_pulse.
//!
//! Captures pairs of vehicle-position snapshots, derives dwell times, probable
//! breakdowns and the busiest routes, and optionally publishes the results.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_pulse::{
    acquire::{FileSource, SnapshotSource, capture_with_timeout},
    analyzers::{
        failures::DEFAULT_FAILURE_THRESHOLD_SECS,
        pipeline::{DEFAULT_TOP_ROUTES, Pipeline, PipelineConfig},
        routes::rank_routes,
        types::PipelineResult,
    },
    config::Settings,
    infra::s3::S3Sink,
    output::{CsvSink, print_json},
    services::publish::{PublishSink, send_messages},
};

#[derive(Parser)]
#[command(name = "transit_pulse")]
#[command(about = "Dwell times, breakdowns and busiest routes from a GTFS-RT vehicle feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AnalysisArgs {
    /// Dwell (seconds) above which a vehicle is reported as failed
    #[arg(short = 't', long, default_value_t = DEFAULT_FAILURE_THRESHOLD_SECS)]
    failure_threshold: i64,

    /// Number of routes kept in the ranking (0 = all)
    #[arg(long, default_value_t = DEFAULT_TOP_ROUTES)]
    top: usize,

    /// Delay in milliseconds between the two captures of a pair
    #[arg(short, long, default_value_t = 1000)]
    interval_ms: u64,
}

#[derive(Args)]
struct SinkArgs {
    /// Directory to append per-topic CSV files to
    #[arg(long)]
    csv_dir: Option<String>,

    /// S3 bucket to publish results to (e.g., "my-bucket")
    #[arg(long)]
    s3_bucket: Option<String>,

    /// Key prefix for S3 objects
    #[arg(long, default_value = "transit_pulse")]
    s3_prefix: String,

    /// Gzip compress S3 objects
    #[arg(long, default_value_t = false)]
    gzip: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one snapshot pair
    Analyze {
        /// One source captured twice, or two sources (earlier, later).
        /// Defaults to FEED_URL.
        #[arg(value_name = "FILE_OR_URL", num_args = 0..=2)]
        sources: Vec<String>,

        #[command(flatten)]
        analysis: AnalysisArgs,

        #[command(flatten)]
        sink: SinkArgs,
    },
    /// Rank the routes of a single snapshot by vehicle count
    Routes {
        /// Path to file or URL to fetch (defaults to FEED_URL)
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,

        /// Number of routes to keep (0 = all)
        #[arg(long, default_value_t = 0)]
        top: usize,
    },
    /// Analyze a fresh snapshot pair at a fixed rate and publish each result
    Monitor {
        /// Sample rate: analyze a new pair every X seconds
        #[arg(short = 'r', long, default_value_t = 60)]
        sample_rate: u64,

        /// Number of samples to collect (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        num_samples: usize,

        #[command(flatten)]
        analysis: AnalysisArgs,

        #[command(flatten)]
        sink: SinkArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/transit_pulse.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_pulse.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Analyze {
            sources,
            analysis,
            sink,
        } => {
            let pipeline = Pipeline::new(
                settings.enrichment_client()?,
                pipeline_config(&analysis, &settings),
            );

            let result = match sources.as_slice() {
                [earlier, later] => {
                    let earlier = snapshot_source(&settings, earlier)?;
                    let later = snapshot_source(&settings, later)?;
                    let a = capture_with_timeout(&earlier, settings.capture_timeout).await?;
                    let b = capture_with_timeout(&later, settings.capture_timeout).await?;
                    pipeline.analyze(&a, &b).await
                }
                [source] => pipeline.process(&snapshot_source(&settings, source)?).await,
                _ => {
                    let source = snapshot_source(&settings, &settings.feed_url)?;
                    pipeline.process(&source).await
                }
            };

            report(result, &sink).await?;
        }
        Commands::Routes { source, top } => {
            let source = source.unwrap_or_else(|| settings.feed_url.clone());
            let snapshot =
                capture_with_timeout(&snapshot_source(&settings, &source)?, settings.capture_timeout)
                    .await?;
            let ranking = rank_routes(&snapshot, top, &settings.enrichment_client()?).await?;

            print_json(&ranking)?;
        }
        Commands::Monitor {
            sample_rate,
            num_samples,
            analysis,
            sink,
        } => {
            monitor(&settings, &analysis, &sink, sample_rate, num_samples).await?;
        }
    }

    Ok(())
}

fn pipeline_config(analysis: &AnalysisArgs, settings: &Settings) -> PipelineConfig {
    PipelineConfig {
        failure_threshold_secs: analysis.failure_threshold,
        top_routes: analysis.top,
        capture_interval: Duration::from_millis(analysis.interval_ms),
        capture_timeout: settings.capture_timeout,
        ..Default::default()
    }
}

/// Reads feed data from a local file path, or fetches it over HTTP.
fn snapshot_source(settings: &Settings, source: &str) -> Result<Box<dyn SnapshotSource>> {
    let source: Box<dyn SnapshotSource> = if source.starts_with("http") {
        Box::new(settings.http_source(source)?)
    } else {
        Box::new(FileSource::new(source))
    };
    Ok(source)
}

fn sinks(args: &SinkArgs) -> Vec<Box<dyn PublishSink>> {
    let mut sinks: Vec<Box<dyn PublishSink>> = Vec::new();
    if let Some(dir) = &args.csv_dir {
        sinks.push(Box::new(CsvSink::new(dir)));
    }
    if let Some(bucket) = &args.s3_bucket {
        info!(bucket = %bucket, gzip = args.gzip, "S3 publishing enabled");
        sinks.push(Box::new(S3Sink::new(bucket, &args.s3_prefix, args.gzip)));
    }
    sinks
}

/// Logs a pipeline result and publishes it to every configured sink.
async fn report(result: Option<PipelineResult>, args: &SinkArgs) -> Result<()> {
    let Some(result) = result else {
        warn!("No result for this snapshot pair");
        return Ok(());
    };

    print_json(&result)?;

    let batches = result.messages()?;
    for mut sink in sinks(args) {
        for (topic, messages) in &batches {
            send_messages(sink.as_mut(), topic, messages).await?;
        }
    }

    Ok(())
}

/// Analyzes a fresh snapshot pair every `sample_rate` seconds.
#[tracing::instrument(skip(settings, analysis, sink))]
async fn monitor(
    settings: &Settings,
    analysis: &AnalysisArgs,
    sink: &SinkArgs,
    sample_rate: u64,
    num_samples: usize,
) -> Result<()> {
    let source = snapshot_source(settings, &settings.feed_url)?;
    let pipeline = Pipeline::new(
        settings.enrichment_client()?,
        pipeline_config(analysis, settings),
    );

    if num_samples == 0 {
        info!(sample_rate, "Sampling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(num_samples, sample_rate, "Starting sample collection");
    }

    let mut sample_count = 0;

    loop {
        // Check if we've reached the sample limit (0 = infinite)
        if num_samples > 0 && sample_count >= num_samples {
            break;
        }

        sample_count += 1;
        info!(sample = sample_count, "Starting sample round");

        let result = pipeline.process(&source).await;
        if let Err(e) = report(result, sink).await {
            error!(error = %e, "Failed to publish results");
        }

        // If not the last sample, wait before next iteration
        if num_samples == 0 || sample_count < num_samples {
            info!(sample_rate, "Waiting before next sample");
            tokio::time::sleep(Duration::from_secs(sample_rate)).await;
        }
    }

    info!(samples = sample_count, "Finished monitoring");
    Ok(())
}
