use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use diesel::r2d2::{self, ConnectionManager};
use diesel::SqliteConnection;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod handlers {
    pub mod visitor_middleware;
    pub mod landing_dtos;
    pub mod gate_handlers;
    pub mod waitlist_handlers;
    pub mod navigation_handlers;
}
pub mod landing {
    pub mod access_gate;
    pub mod collaborators;
    pub mod navigation;
    pub mod transient_status;
    pub mod visitors;
    pub mod waitlist_flow;
}
pub mod api {
    pub mod document_store;
}
pub mod models {
    pub mod waitlist_models;
}
pub mod repositories {
    pub mod kv_repository;
}
pub mod config;
pub mod db;
pub mod error;
pub mod schema;

use config::AppConfig;
use handlers::{gate_handlers, navigation_handlers, waitlist_handlers};
use landing::{
    collaborators::{DocumentStore, LocalStore},
    visitors::Visitors,
};

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

pub struct AppState {
    pub config: AppConfig,
    pub local_store: Arc<dyn LocalStore>,
    pub visitors: Visitors,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        document_store: Arc<dyn DocumentStore>,
        local_store: Arc<dyn LocalStore>,
    ) -> Self {
        let visitors = Visitors::new(
            Arc::from(config.gate_secret.as_str()),
            document_store,
            local_store.clone(),
            config.status_clear_after,
        );
        Self {
            config,
            local_store,
            visitors,
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}

pub fn app_router(state: Arc<AppState>) -> Router {
    // Public landing page routes
    let public_routes = Router::new()
        .route("/api/health", get(health_check))
        .route("/api/gate/unlock", post(gate_handlers::unlock))
        .route("/api/gate/status", get(gate_handlers::gate_status))
        .route("/api/waitlist", post(waitlist_handlers::join_waitlist))
        .route("/api/waitlist/status", get(waitlist_handlers::waitlist_status))
        .route("/verify", get(navigation_handlers::go_to_verification))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::visitor_middleware::assign_caller,
        ));

    let admin_routes = Router::new()
        .route("/api/admin/waitlist/local", get(waitlist_handlers::get_local_waitlist))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::visitor_middleware::require_admin,
        ));

    let cors = match state.config.frontend_url.parse::<axum::http::HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(AllowOrigin::exact(origin)),
        Err(e) => {
            tracing::warn!("Invalid FRONTEND_URL, CORS disabled: {}", e);
            CorsLayer::new()
        }
    };

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            cors.allow_methods([axum::http::Method::GET, axum::http::Method::POST, axum::http::Method::OPTIONS])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::ACCEPT,
                    axum::http::header::ORIGIN,
                    axum::http::HeaderName::from_static(handlers::visitor_middleware::CLIENT_HEADER),
                ])
                .allow_credentials(true),
        )
        .with_state(state)
}
