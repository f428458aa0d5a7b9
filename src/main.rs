//! hebtts-chunker - chunked long-text synthesis from the command line.
//!
//! Plans the input into model-sized chunks, synthesizes them in order on a
//! single worker, and prints the response metadata as JSON on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use hebtts_chunker::audio::write_wav;
use hebtts_chunker::config::AppConfig;
use hebtts_chunker::pipeline::ChunkedPipeline;
use hebtts_chunker::tts::{ModelHandle, ToneSynthesizer};
use hebtts_chunker::worker::spawn_synthesis_worker;

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, cancelling after the current chunk...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, cancelling after the current chunk...");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config = AppConfig::from_args();

    // Respect RUST_LOG env var, fallback to verbose flag, default to info.
    // Logs go to stderr; stdout carries the JSON result.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .context("Invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🗣️  hebtts-chunker v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }
    config.log_config();

    let job = match config.load_job() {
        Ok(job) => job,
        Err(e) => {
            error!("❌ {:#}", e);
            std::process::exit(1);
        }
    };

    let pipeline = Arc::new(ChunkedPipeline::new(config.rules, config.estimator()?, config.failure_policy(), config.pauses())?);

    if config.plan_only {
        match pipeline.plan(&job) {
            Ok(plan) => {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(());
            }
            Err(e) => {
                error!("❌ {}", e);
                std::process::exit(1);
            }
        }
    }

    // Load the model once; the worker owns it from here on
    let sample_rate = config.sample_rate;
    let model = ModelHandle::load(|| ToneSynthesizer::new(sample_rate))?;

    let cancel = CancellationToken::new();
    let (worker, worker_task) = spawn_synthesis_worker(pipeline, model, cancel.clone(), config.queue_size);

    let signal_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            wait_for_shutdown().await;
            cancel.cancel();
        }
    });

    let result = worker.submit(job).await;

    // Stop the worker and release the model
    drop(worker);
    cancel.cancel();
    signal_task.abort();
    if let Err(e) = worker_task.await {
        debug!("Worker task ended abnormally: {}", e);
    }

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    if let Some(ref path) = config.output {
        write_wav(&response.track, path)?;
    }

    println!("{}", serde_json::to_string_pretty(&response.metadata)?);

    info!("✅ Done");
    Ok(())
}
