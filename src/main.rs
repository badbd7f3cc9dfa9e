use camera_relay::api::middleware::request_id::request_id;
use camera_relay::config::{RelayConfig, StorageSettings};
use camera_relay::infrastructure::{database, staging, storage};
use camera_relay::services::metadata::{MetadataStore, SeaOrmMetadataStore};
use camera_relay::services::relay::RelayService;
use camera_relay::{AppState, create_app};
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
    /// Port for the HTTP server (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging (overrides DEBUG)
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initial Environment & Logging Setup
    dotenv().ok();
    let args = Args::parse();

    let mut config = RelayConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    config.debug |= args.debug;

    let default_filter = if config.debug {
        "camera_relay=debug,tower_http=debug"
    } else {
        "camera_relay=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting camera upload relay...");
    info!(
        "🛡️  Upload Config: Max Size={}MB, Field='{}', Prefix='{}', Remote Timeout={:?}",
        config.max_upload_size / 1024 / 1024,
        config.field_name,
        config.object_prefix,
        config.remote_timeout
    );

    // 2. Setup Infrastructure; any failure here stops the process
    staging::prepare_staging_dir(&config.staging_dir).await?;

    let storage_settings = StorageSettings::from_env()?;
    let storage_service = storage::setup_storage(&storage_settings, config.remote_timeout).await?;

    let metadata: Option<Arc<dyn MetadataStore>> = match &config.database_url {
        Some(url) => {
            let db = database::setup_database(url).await?;
            Some(Arc::new(SeaOrmMetadataStore::new(db)))
        }
        None => {
            info!("🗂️  DATABASE_URL not set, metadata index disabled");
            None
        }
    };

    // 3. Initialize API Service
    let relay = Arc::new(RelayService::new(
        storage_service,
        metadata,
        config.clone(),
    ));

    let state = AppState {
        relay,
        config: config.clone(),
        storage_connected: true,
    };

    // Configure tracing layer for HTTP requests
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request_id(request.headers());
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
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("✅ Relay listening on: http://0.0.0.0:{}", config.port);
    info!("📖 Swagger UI documentation: http://localhost:{}/swagger-ui", config.port);

    // 4. Serve until a shutdown signal; in-flight uploads finish first
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Server runtime error: {}", e);
        return Err(e.into());
    }

    info!("👋 Relay exited cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("❌ Failed to install SIGTERM handler: {}", e);
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
