use audio_upload_backend::config::{RunMode, UploadConfig};
use audio_upload_backend::infrastructure::storage;
use audio_upload_backend::services::retention::MemoryRetentionSlot;
use audio_upload_backend::services::worker::BackgroundWorker;
use audio_upload_backend::{AppState, create_app};
use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Service type to run (api, all)
    #[arg(short, long, value_enum, default_value_t = RunMode::All)]
    mode: RunMode,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment & logging
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "audio_upload_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting audio upload backend [Mode: {:?}]...", args.mode);

    // 2. Shared state
    let config = UploadConfig::from_env();
    info!(
        "🛡️  Upload Config: Max Size={} bytes, Max Name={} chars, Field='{}', Search={}",
        config.max_file_size,
        config.max_filename_length,
        config.field_name,
        if config.search_api_url.is_some() { "on" } else { "off" }
    );

    let storage_service = storage::setup_storage(&config).await?;
    let retention = Arc::new(MemoryRetentionSlot::new());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // 3. Orphan sweeper, sharing the API's slot
    if args.mode.runs_sweeper() {
        let worker = BackgroundWorker::new(
            storage_service.clone(),
            retention.clone(),
            config.orphan_max_age(),
            config.sweep_interval(),
            shutdown_rx.clone(),
        );
        tokio::spawn(worker.run());
        info!("👷 Worker service initialized.");
    }

    // 4. API
    let state = AppState::new(config.clone(), storage_service.clone(), retention.clone());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
            info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &axum::http::Response<_>,
             latency: std::time::Duration,
             _span: &tracing::Span| {
                info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    let app = create_app(state).layer(trace_layer);
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ API Server listening on: http://0.0.0.0:{}", args.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", args.port);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("❌ Server runtime error: {}", e);
        }
    });

    // 5. Wait for shutdown, then stop the worker
    shutdown_signal().await;
    let _ = shutdown_tx.send(true);

    info!("👋 Backend exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, initiating graceful shutdown...");
        },
    }
}
