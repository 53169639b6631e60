// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use technique_compare::comparison::ComparisonResult;
use technique_compare::media::{FfmpegSource, FfmpegTools, FrameEncoding, MediaSource};
use technique_compare::types::MediaBackend;
use technique_compare::{
    ComparisonOrchestrator, ComparisonSession, Config, FrameExtractor, HttpAnalysisClient,
    TimestampSet,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Compare a reference recording of a technique against a subject's attempt
#[derive(Debug, Parser)]
#[command(name = "technique-compare", version)]
struct Args {
    /// Reference recording (path or http(s) URL)
    reference: String,

    /// Subject recording (path or http(s) URL)
    subject: String,

    /// Configuration file; built-in defaults are used when it is missing
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Overrides `output.dir`
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logging needs the configured level, so the config is read first
    let config = Config::load_or_default(&args.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("🎾 Technique comparison starting");

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.dir));

    let fractions = TimestampSet::new(config.extraction.fractions.clone())
        .context("Invalid extraction.fractions")?;

    let client = HttpAnalysisClient::new(&config.analysis, &output_dir)?;
    info!("✓ Analysis service at {}", client.url());

    let orchestrator = ComparisonOrchestrator::new(
        FrameExtractor::from_config(&config.extraction),
        client,
        fractions,
    )
    .context("Invalid extraction.fractions")?;

    let mut session = ComparisonSession::new();
    session.set_reference(open_source(&args.reference, &config).await?);
    session.set_subject(open_source(&args.subject, &config).await?);

    let cancel = session.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling comparison");
            cancel.cancel();
        }
    });

    let outcome = session.run_comparison(&orchestrator).await.map(Clone::clone);

    let metrics = orchestrator.metrics().summary();
    info!(
        "📊 Metrics: {}",
        serde_json::to_string(&metrics).unwrap_or_default()
    );

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            error!("❌ {}", e);
            session.teardown();
            anyhow::bail!(e.user_message());
        }
    };

    print_result(&result);

    if config.output.save_results {
        let path = save_result(&result, &output_dir).await?;
        info!("💾 Result saved to {}", path.display());
    }

    session.teardown();
    Ok(())
}

async fn open_source(input: &str, config: &Config) -> Result<Box<dyn MediaSource>> {
    let encoding = FrameEncoding::from_config(&config.extraction);
    let is_remote = input.starts_with("http://") || input.starts_with("https://");

    match config.media.backend {
        MediaBackend::Ffmpeg => {
            let tools = FfmpegTools::locate(&config.media).await?;
            if is_remote {
                let http = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.media.fetch_timeout_secs))
                    .build()
                    .context("Failed to build HTTP client")?;
                let source = FfmpegSource::fetch(&http, input, tools, encoding)
                    .await
                    .with_context(|| format!("Failed to fetch {}", input))?;
                Ok(Box::new(source))
            } else {
                ensure_exists(input)?;
                Ok(Box::new(FfmpegSource::open(input, tools, encoding)))
            }
        }
        #[cfg(feature = "opencv")]
        MediaBackend::Opencv => {
            if is_remote {
                anyhow::bail!("The opencv backend only reads local files: {}", input);
            }
            ensure_exists(input)?;
            Ok(Box::new(technique_compare::media::OpenCvSource::open(
                input, encoding,
            )))
        }
        #[cfg(not(feature = "opencv"))]
        MediaBackend::Opencv => {
            anyhow::bail!("media.backend is `opencv` but this build lacks the `opencv` feature")
        }
    }
}

fn ensure_exists(input: &str) -> Result<()> {
    if !Path::new(input).is_file() {
        anyhow::bail!("Video not found: {}", input);
    }
    Ok(())
}

fn print_result(result: &ComparisonResult) {
    println!("\n{}", "=".repeat(70));
    println!("SUMMARY");
    println!("{}", "=".repeat(70));
    println!("{}", result.summary);
    match result.overall_score {
        Some(score) => println!("Overall score: {:.1}/10", score),
        None => println!("Overall score: n/a"),
    }

    for phase in &result.phases {
        println!("\n── {} ──", phase.phase);
        println!(
            "  reference @ {:.2}s: {}",
            phase.reference.timestamp_seconds, phase.reference.analysis
        );
        println!(
            "  subject   @ {:.2}s: {}",
            phase.subject.timestamp_seconds, phase.subject.analysis
        );
        for strength in &phase.subject.strengths {
            println!("    + {}", strength);
        }
        for weakness in &phase.subject.weaknesses {
            println!("    - {}", weakness);
        }
        if let Some(score) = phase.subject.score {
            println!("    score: {:.1}", score);
        }
    }

    if !result.recommendations.is_empty() {
        println!("\nRECOMMENDATIONS");
        for (i, rec) in result.recommendations.iter().enumerate() {
            println!("  {}. {}", i + 1, rec.recommendation);
            if let Some(drill) = &rec.drill {
                match &drill.practice_sets {
                    Some(sets) => println!("     drill: {} ({})", drill.title, sets),
                    None => println!("     drill: {}", drill.title),
                }
            }
        }
    }
    println!("{}\n", "=".repeat(70));
}

async fn save_result(result: &ComparisonResult, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(format!(
        "comparison_{}.json",
        chrono::Utc::now().format("%Y%m%d_%H%M%S")
    ));
    let json = serde_json::to_string_pretty(result)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
