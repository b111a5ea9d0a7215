//! Blinder backend server.

use blinder::config::Config;
use blinder::create_app_with_state;
use blinder::gst::BlinderPipeline;
use blinder::host::MemoryGraphHost;
use blinder::state::AppState;
use blinder::switch::GainPushReport;
use blinder::topology::build_topology;
use blinder_types::SelectionChoice;
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Blinder - filler-source switching for live GStreamer mix buses
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the operator API
    #[arg(short, long)]
    port: Option<u16>,

    /// Filler source names, in pad order (comma separated)
    #[arg(long, value_delimiter = ',')]
    sources: Option<Vec<String>>,

    /// Also blind the secondary (slides) video bus
    #[arg(long)]
    slides: bool,

    /// Log level filter (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Selection to start with: "live", a filler ordinal or a filler name
    #[arg(long)]
    select: Option<SelectionChoice>,

    /// Keep gains in memory instead of running a GStreamer pipeline
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_figment(
        args.port,
        args.sources.clone(),
        args.slides.then_some(true),
        args.log_level.clone(),
    )?;
    let _log_guard = init_logging(&config)?;
    info!("Starting Blinder backend server...");

    let settings = config.settings();
    let topology = build_topology(&settings)?;
    let state = AppState::new(topology);
    info!(
        "{} configured with {} mix buses",
        state.controller(),
        state.controller().topology().buses.len()
    );

    if let Some(choice) = args.select {
        state.controller().select(choice)?;
    }

    let pipeline = if args.dry_run {
        info!("Dry run: gains are kept in memory");
        let host = MemoryGraphHost::from_topology(state.controller().topology());
        log_report(&state.controller().attach(Arc::new(host)));
        None
    } else {
        gstreamer::init()?;
        info!("GStreamer initialized");

        let mut pipeline =
            BlinderPipeline::standalone(state.controller().topology(), &settings)?;
        pipeline.start()?;
        log_report(&state.controller().attach(pipeline.host()));
        Some(pipeline)
    };

    run_server(state.clone(), config.port)?;

    state.controller().detach();
    if let Some(mut pipeline) = pipeline {
        pipeline.stop()?;
    }
    info!("Blinder stopped");
    Ok(())
}

/// Initialize logging: stdout always, plus a non-blocking file writer when
/// `logging.log_file` is set. The returned guard must live until exit.
fn init_logging(config: &Config) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = match &config.log_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let (file_layer, guard) = match &config.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn log_report(report: &GainPushReport) {
    if report.is_complete() {
        info!("Blinder state applied to {} buses", report.applied.len());
    } else {
        warn!(
            "Blinder state applied to {} buses, {} could not be resolved",
            report.applied.len(),
            report.missing.len()
        );
    }
}

#[tokio::main]
async fn run_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_app_with_state(state);

    // Bind to 0.0.0.0 to be accessible from all interfaces
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}
