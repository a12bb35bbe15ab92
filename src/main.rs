use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

use lernis::{
    api::document_store::HttpDocumentStore,
    app_router,
    config::AppConfig,
    db::{build_pool, run_migrations},
    repositories::kv_repository::KvRepository,
    AppState,
};

const VISITOR_IDLE_LIMIT: Duration = Duration::from_secs(60 * 60);
const VISITOR_PRUNE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lernis=debug,tower_http=info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let config = AppConfig::from_env()?;

    let _guard = config.sentry_dsn.as_deref().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.environment.clone().into()),
                ..Default::default()
            },
        ))
    });

    let pool = build_pool(&config.database_url)?;
    run_migrations(&pool)?;

    if config.document_store_url.is_none() {
        tracing::warn!("DOCUMENT_STORE_URL not set, waitlist entries will only be kept locally");
    }
    let document_store = HttpDocumentStore::new(
        config.document_store_url.clone(),
        config.document_store_api_key.clone(),
        config.document_store_timeout,
    )?;
    let local_store = KvRepository::new(pool);

    let port = config.port;
    let state = Arc::new(AppState::new(
        config,
        Arc::new(document_store),
        Arc::new(local_store),
    ));

    let state_for_pruning = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(VISITOR_PRUNE_INTERVAL);
        loop {
            interval.tick().await;
            let dropped = state_for_pruning.visitors.prune_idle(VISITOR_IDLE_LIMIT);
            if dropped > 0 {
                tracing::debug!("Pruned {} idle visitor sessions", dropped);
            }
        }
    });

    let app = app_router(state);

    tracing::info!("Starting server on port {}", port);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
