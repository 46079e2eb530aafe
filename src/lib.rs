pub mod api;
pub mod config;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::UploadConfig;
use crate::services::retention::RetentionSlot;
use crate::services::search::SearchService;
use crate::services::storage::StorageService;
use crate::services::upload_service::UploadService;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart boundaries and headers on top of the file itself.
pub const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::upload::upload_file,
        api::handlers::upload::current_file,
        api::handlers::search::search,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::upload::UploadForm,
            api::handlers::upload::UploadResponse,
            api::handlers::upload::CurrentFileResponse,
            api::handlers::health::HealthResponse,
        )
    ),
    tags(
        (name = "upload", description = "Single-slot audio upload"),
        (name = "search", description = "Third-party search passthrough"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: UploadConfig,
    pub storage: Arc<dyn StorageService>,
    pub upload_service: Arc<UploadService>,
    pub search: SearchService,
}

impl AppState {
    pub fn new(
        config: UploadConfig,
        storage: Arc<dyn StorageService>,
        retention: Arc<dyn RetentionSlot>,
    ) -> Self {
        let upload_service = Arc::new(UploadService::new(storage.clone(), retention, &config));
        let search = SearchService::from_config(&config);

        Self {
            config,
            storage,
            upload_service,
            search,
        }
    }
}

fn cors_layer(config: &UploadConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.storage.root());
    let assets = ServeDir::new(&state.config.static_dir);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/api/upload", post(api::handlers::upload::upload_file))
        .route("/api/current", get(api::handlers::upload::current_file))
        .route("/api/search", get(api::handlers::search::search))
        .nest_service(&state.config.public_path, uploads)
        .fallback_service(assets)
        .layer(DefaultBodyLimit::max(
            state.config.max_file_size + MULTIPART_OVERHEAD,
        ))
        .layer(cors_layer(&state.config))
        .layer(from_fn(api::middleware::security::security_headers))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .with_state(state)
}
