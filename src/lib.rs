pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::RelayConfig;
use crate::services::relay::RelayService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::home,
        api::handlers::health::ping,
        api::handlers::health::health_check,
        api::handlers::files::upload_file,
        api::handlers::files::list_files,
    ),
    components(
        schemas(
            api::handlers::health::InfoResponse,
            api::handlers::health::PingResponse,
            api::handlers::health::HealthResponse,
            api::handlers::files::UploadResponse,
            api::handlers::files::UploadStatus,
            services::relay::RemoteObject,
        )
    ),
    tags(
        (name = "files", description = "Camera upload and listing endpoints"),
        (name = "system", description = "Liveness and server info")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayService>,
    pub config: RelayConfig,
    /// Whether object storage answered during startup
    pub storage_connected: bool,
}

pub fn create_app(state: AppState) -> Router {
    let upload = post(api::handlers::files::upload_file);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/", get(api::handlers::health::home))
        .route("/test", get(api::handlers::health::ping))
        .route("/health", get(api::handlers::health::health_check))
        .route("/upload", upload.clone())
        // Route name used by deployed camera firmware
        .route("/carga", upload)
        .route("/list-files", get(api::handlers::files::list_files))
        .layer(CatchPanicLayer::custom(api::error::panic_response))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(DefaultBodyLimit::max(state.config.max_upload_size))
        .with_state(state)
}
