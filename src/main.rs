use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::info;

use admissions_flow::config::AppConfig;
use admissions_flow::error::AppError;
use admissions_flow::telemetry;
use admissions_flow::workflows::admissions::{
    admissions_router, AdmissionsState, CompletionConfig, CompletionEvaluator, DraftService,
    MemoryStore, SubmissionCommitter,
};

#[derive(Parser, Debug)]
#[command(
    name = "admissions-flow",
    about = "Run the admissions draft and submission service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured bind host
    #[arg(long)]
    host: Option<String>,
    /// Override the configured bind port
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Clone)]
struct ServiceState {
    readiness: Arc<AtomicBool>,
    metrics: Arc<PrometheusHandle>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(args).await,
    }
}

async fn serve(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness = Arc::new(AtomicBool::new(false));
    let service_state = ServiceState {
        readiness: readiness.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(MemoryStore::new(
        config.admissions.application_id_prefix.clone(),
    ));
    let evaluator = Arc::new(CompletionEvaluator::new(CompletionConfig::admissions()));
    let admissions_state = AdmissionsState {
        drafts: Arc::new(DraftService::new(store.clone(), evaluator.clone())),
        committer: Arc::new(SubmissionCommitter::new(store.clone(), evaluator)),
        store,
    };

    let app = admissions_router(admissions_state)
        .merge(operational_routes(service_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admissions service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn operational_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/readyz", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn ready_handler(State(state): State<ServiceState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Acquire) {
        (StatusCode::OK, Json(json!({ "ready": true })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "ready": false })))
    }
}

async fn metrics_handler(State(state): State<ServiceState>) -> impl IntoResponse {
    state.metrics.render()
}
