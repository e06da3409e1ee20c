use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::get,
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use crate::{
    config::Config,
    errors::Result,
    routes::{api_router, health},
    state::AppState,
};

pub mod config;
pub mod consts;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod routes;
pub mod state;
pub mod utils;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));
    let cors = match state
        .config
        .cors_origin
        .as_deref()
        .map(HeaderValue::from_str)
    {
        Some(Ok(origin)) => cors.allow_origin(origin),
        Some(Err(e)) => {
            warn!("Invalid CORS_ORIGIN: {e}, allowing any origin");
            cors.allow_origin(Any)
        }
        None => cors.allow_origin(Any),
    };

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Initializing state...");
    let config = Config::load();
    let address = config.address();
    let state = AppState::init(config).await?;

    let listener = TcpListener::bind(&address).await?;
    info!("Serving relief coordination API at http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
