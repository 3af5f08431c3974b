mod config;
mod event;
mod pixel;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::persistence::{self, CanvasStorage, FileStorage};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env();
    let storage: Arc<dyn CanvasStorage> = Arc::new(FileStorage::new(&config.canvas_file));
    let state = state::AppState::new(&config, Arc::clone(&storage));

    // Hydrate before accepting connections so the first `load` sees the saved canvas.
    persistence::hydrate(&state.canvas, storage.as_ref()).await;

    // Spawn background autosave task.
    let _autosave = persistence::spawn_autosave_task(Arc::clone(&state.canvas), storage, config.autosave_interval);

    let app = routes::app(state, &config.static_dir);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, canvas_file = %config.canvas_file.display(), "pixelboard listening");
    axum::serve(listener, app).await.expect("server failed");
}
