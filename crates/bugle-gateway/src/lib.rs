//! Bugle Gateway
//!
//! The long-lived fan-out process: subscribes to the broker's notifications
//! channel and re-emits each envelope to the WebSocket connections currently
//! joined to the matching organization room.

pub mod dispatcher;
pub mod registry;
pub mod state;
pub mod websocket;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use bugle_core::{Backoff, Config};
use bugle_redis::EventSubscriber;
use tokio::sync::mpsc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use state::AppState;

/// Capacity of the subscriber → dispatcher channel.
const ENVELOPE_BUFFER: usize = 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origin);

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin != "*" {
        match origin.parse::<HeaderValue>() {
            Ok(value) => {
                return CorsLayer::new()
                    .allow_origin(value)
                    .allow_methods(Any)
                    .allow_headers(Any);
            }
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "invalid CORS origin, allowing any");
            }
        }
    }
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Liveness probe for the hosting platform.
async fn health() -> &'static str {
    "ok"
}

/// Run the gateway.
///
/// The listener comes up first so health checks pass immediately; the broker
/// subscription is brought up in the background and retries on its own, so a
/// broker outage at startup delays live events rather than the service.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(config.clone());
    let app = create_router(state.clone());

    let (tx, rx) = mpsc::channel(ENVELOPE_BUFFER);
    tokio::spawn(dispatcher::run(state.registry.clone(), rx));

    let backoff = Backoff::new(config.reconnect_initial, config.reconnect_max);
    let subscriber = EventSubscriber::new(&config.redis_url, backoff)?;
    tokio::spawn(subscriber.run(tx));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}
