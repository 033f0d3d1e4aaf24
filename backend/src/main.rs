use axum::{
    routing::{get, post},
    Router,
};
use axum::http::{HeaderValue, Method};
use opengig::{
    get_db_pool, handlers,
    services::{PgStore, RpcChainClient},
    utils, Config,
};
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = opengig::db::DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    opengig::db::migrations::run_migrations(&pool).await?;

    let store = PgStore::new(pool);
    let chain = RpcChainClient::new(config.rpc_url.clone());

    let port = config.port;
    let app = create_router(store, chain, config);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(store: PgStore, chain: RpcChainClient, config: Config) -> Router {
    let cors_layer = create_cors_layer(&config);
    let app_state = (store, chain, config);

    Router::new()
        .route("/health", get(health_check))
        // Cached payment history (instant, never touches the chain)
        .route("/api/transfers", get(handlers::get_transfers))
        // User-triggered reconciliation scan
        .route("/api/transfers/refresh", post(handlers::refresh_transfers))
        .layer(cors_layer)
        .with_state(app_state)
}

fn create_cors_layer(_config: &Config) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // Check if ALLOWED_ORIGINS environment variable is set for multiple domains
    if let Ok(cors_origins) = std::env::var("ALLOWED_ORIGINS") {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        if !origins.is_empty() {
            cors = cors.allow_origin(origins);
        } else {
            // Fallback to permissive if parsing fails
            cors = cors.allow_origin(Any);
        }
    } else {
        // Default to permissive for development
        cors = cors.allow_origin(Any);
    }

    cors
}

async fn health_check() -> &'static str {
    "OK"
}
