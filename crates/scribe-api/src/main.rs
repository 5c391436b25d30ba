use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scribe_api::{
    config::Config,
    handlers::chat,
    middleware::logging,
    routes::health,
    state::AppState,
};
use scribe_persist::MongoStore;
use scribe_relay::RagClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    // Initialize logging
    init_logging(&config);

    tracing::info!("Starting Scribe API server");
    tracing::info!("Config loaded: {}:{}", config.server.host, config.server.port);

    // Initialize the RAG client
    let timeout = config.rag.timeout_secs.map(Duration::from_secs);
    let rag_client = RagClient::new(&config.rag.url, timeout)
        .map_err(|e| anyhow::anyhow!("Failed to create RAG client: {}", e))?;
    tracing::info!("RAG client configured for {}", config.rag.url);

    // Initialize persistence
    tracing::info!("Connecting to MongoDB");
    let store = MongoStore::connect(&config.mongodb_uri, &config.mongodb.database).await?;
    tracing::info!("MongoDB connected");

    // Create application state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(store),
        Arc::new(rag_client),
    ));

    // Build router
    let app = build_router(state.clone());

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    // No request timeout layer here: /chat holds the connection open for the
    // whole stream; the bound on a hung upstream is the RAG client timeout.
    Router::new()
        .route("/health", get(health::health_check))
        .route("/chat", post(chat::chat))
        .layer(middleware::from_fn(logging::log_request))
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let mut cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            for origin in &config.cors.origins {
                if let Ok(parsed_origin) = origin.parse::<axum::http::HeaderValue>() {
                    cors = cors.allow_origin(parsed_origin);
                }
            }
        }

        cors
    } else {
        CorsLayer::permissive()
    }
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
