use anyhow::Context;
use clap::Parser;
use nutrirank_api::{AppState, RestApi};
use nutrirank_engine::{EngineConfig, Recommender, DEFAULT_CANDIDATE_COUNT, DEFAULT_MAX_RESULTS};
use nutrirank_storage::ArtifactLoader;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Health-weighted product recommendation server
#[derive(Parser, Debug)]
#[command(name = "nutrirank")]
#[command(about = "Health-weighted product recommendations", long_about = None)]
struct Args {
    /// Directory holding manifest.json and the model artifacts
    #[arg(short, long, default_value = "./ml_models")]
    model_dir: PathBuf,

    /// HTTP API port
    #[arg(long, default_value_t = 8080)]
    http_port: u16,

    /// Candidates requested from the ANN index per query
    #[arg(long, default_value_t = DEFAULT_CANDIDATE_COUNT)]
    candidates: usize,

    /// Maximum recommendations returned per request
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
    max_results: usize,

    /// Log level, overridden by RUST_LOG when set
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Run the REST API on its own actix system thread. The server's exit
/// status, bind failures included, comes back through the join handle.
fn spawn_http_server(state: Arc<AppState>, port: u16) -> JoinHandle<std::io::Result<()>> {
    std::thread::spawn(move || {
        info!("Starting HTTP server on port {}", port);
        let sys = actix_web::rt::System::new();
        sys.block_on(RestApi::start(state, port))
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting nutrirank v{}", env!("CARGO_PKG_VERSION"));
    info!("Model directory: {:?}", args.model_dir);

    let (context, summary) = match ArtifactLoader::new(&args.model_dir).load() {
        Ok(loaded) => loaded,
        Err(e) => {
            error!(stage = e.stage().as_str(), "failed to load artifacts: {}", e);
            return Err(e).context("loading model artifacts");
        }
    };

    let config = EngineConfig {
        candidate_count: args.candidates,
        max_results: args.max_results,
        ..EngineConfig::default()
    };
    let recommender = Recommender::new(Arc::new(context), config)?;
    let state = Arc::new(AppState {
        recommender,
        summary,
    });

    let http_port = args.http_port;
    let http_handle = spawn_http_server(state, http_port);

    info!("HTTP API: http://localhost:{}/", http_port);

    let http_result = tokio::task::spawn_blocking(move || http_handle.join());

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        joined = http_result => {
            match joined {
                Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
                Ok(Ok(Err(e))) => {
                    error!("HTTP server error: {}", e);
                    return Err(e).context(format!("serving HTTP on port {}", http_port));
                }
                Ok(Err(_)) | Err(_) => anyhow::bail!("HTTP server thread panicked"),
            }
        }
    }

    info!("Shutting down...");
    Ok(())
}
