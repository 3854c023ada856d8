// Framework bootstrap for the vine server runtime.

use crate::domain::Tuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{
    despawn_enemy_handler, despawn_item_at_handler, despawn_item_handler, list_entities_handler,
    list_sessions_handler, set_mode_handler, spawn_enemy_handler, spawn_item_handler, ws_handler,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{SessionRegistry, SessionSettings};

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/sessions", get(list_sessions_handler))
        .route("/sessions/{id}/entities", get(list_entities_handler))
        .route("/sessions/{id}/enemies", post(spawn_enemy_handler))
        .route(
            "/sessions/{id}/enemies/{enemy_id}",
            delete(despawn_enemy_handler),
        )
        .route(
            "/sessions/{id}/items",
            post(spawn_item_handler).delete(despawn_item_at_handler),
        )
        .route("/sessions/{id}/items/{item_id}", delete(despawn_item_handler))
        .route("/sessions/{id}/mode", put(set_mode_handler))
        .with_state(state)
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let app = router(build_state());

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    let settings = SessionSettings {
        command_channel_capacity: config::COMMAND_CHANNEL_CAPACITY,
        listener_queue_capacity: config::LISTENER_QUEUE_CAPACITY,
        tick_interval: config::tick_interval(),
        max_spectators: config::max_spectators(),
        tuning: Tuning::default(),
    };
    tracing::debug!(
        tick_interval_ms = settings.tick_interval.as_millis(),
        max_spectators = settings.max_spectators,
        "session settings"
    );

    // The registry owns the set of running session drivers.
    Arc::new(AppState {
        registry: Arc::new(SessionRegistry::new(settings)),
    })
}
