//! VOXCACHE Server Binary
//!
//! Runs the HTTP lookup facade, the command pipeline and the monitor until
//! Ctrl-C, an emergency-stop command, or the optional run time elapses.

use clap::Parser;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use voxcache::{
    Cache, Config, ModelConfig, MonitorConfig, PipelineConfig, Runtime, RuntimeConfig, Server,
};

/// VOXCACHE Server - concurrent cache with a voice-command pipeline
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Port number
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Name of the speech model instance
    #[arg(long, default_value = "voxcache-speech")]
    model_name: String,

    /// What the model is used for; a realtime purpose is flagged at startup
    #[arg(long, default_value = "Realtime command transcription")]
    purpose: String,

    /// Command queue capacity
    #[arg(long, default_value_t = 32)]
    queue_capacity: usize,

    /// Simulated firmware action time in milliseconds
    #[arg(long, default_value_t = 500)]
    action_ms: u64,

    /// Seconds between monitor heartbeats
    #[arg(long, default_value_t = 3)]
    heartbeat_secs: u64,

    /// Seconds tasks get to stop after shutdown is signalled
    #[arg(long, default_value_t = 5)]
    grace_secs: u64,

    /// Serve lookups only, without the producer/consumer pipeline
    #[arg(long)]
    no_pipeline: bool,

    /// Journal executed commands into the cache as cmd:<seq>
    #[arg(long)]
    journal: bool,

    /// Stop by itself after this many seconds
    #[arg(long)]
    run_for: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("voxcache=info".parse()?))
        .init();

    let args = Args::parse();
    let grace = Duration::from_secs(args.grace_secs);

    let pipeline = PipelineConfig::default()
        .with_queue_capacity(args.queue_capacity)
        .with_action_duration(Duration::from_millis(args.action_ms))
        .with_journal(args.journal);
    let mut config = RuntimeConfig::default()
        .with_model(ModelConfig::new(&args.model_name, &args.purpose))
        .with_pipeline(pipeline)
        .with_monitor(
            MonitorConfig::default().with_interval(Duration::from_secs(args.heartbeat_secs)),
        )
        .with_grace_period(grace);
    if args.no_pipeline {
        config = config.without_pipeline();
    }

    let cache = Cache::seeded_default();
    let mut runtime = Runtime::new(config, cache.clone());
    let metrics = runtime.metrics();
    let shutdown = runtime.shutdown_signal();

    let server_config = Config::default().with_bind(&args.bind).with_port(args.port);
    let server = Server::bind(&server_config, cache, metrics.clone()).await?;

    info!(
        "Starting VOXCACHE on {} (pipeline: {})",
        server_config.addr(),
        !args.no_pipeline
    );
    runtime.start()?;
    let serving = tokio::spawn(server.run(shutdown.clone()));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Ctrl-C received, shutting down");
        }
        _ = shutdown.cancelled() => info!("Shutdown requested by the pipeline"),
        _ = run_timer(args.run_for) => info!("Run time elapsed, shutting down"),
    }

    let stopped = tokio::task::spawn_blocking(move || runtime.shutdown()).await?;

    match tokio::time::timeout(grace, serving).await {
        Ok(result) => result??,
        Err(_) => warn!("Facade did not stop within {:?}", grace),
    }

    info!("{}", metrics.summary());

    if let Err(e) = stopped {
        error!("{}", e);
        return Err(e.into());
    }

    info!("Shutdown complete");
    Ok(())
}

async fn run_timer(secs: Option<u64>) {
    match secs {
        Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
        None => std::future::pending().await,
    }
}
