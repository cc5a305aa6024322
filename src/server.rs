use std::sync::Arc;

use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::api::routes::create_router;
use crate::config::AppConfig;
use crate::kv::{ProofsTable, RootsTable};
use crate::lifecycle::TreeLifecycle;
use crate::object_store::ObjectStore;
use crate::read::ReadPath;

/// Shared application state, handed to every handler through an
/// `Extension`.
pub struct AppState {
    pub lifecycle: TreeLifecycle,
    pub read: ReadPath,
    pub config: AppConfig,
}

/// Build the CORS layer from configuration.
fn build_cors_layer(config: &AppConfig) -> CorsLayer {
    if config.cors.allow_all_origins {
        return CorsLayer::permissive();
    }

    let mut layer = CorsLayer::new();
    for origin in &config.cors.allowed_origins {
        if let Ok(value) = origin.parse::<axum::http::HeaderValue>() {
            layer = layer.allow_origin(value);
        }
    }
    let methods: Vec<axum::http::Method> = config
        .cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    layer = layer.allow_methods(methods);
    layer = layer.allow_headers(
        config
            .cors
            .allowed_headers
            .iter()
            .filter_map(|h| h.parse::<axum::http::HeaderName>().ok())
            .collect::<Vec<_>>(),
    );
    layer
}

/// Construct application state and serve the HTTP API until a shutdown
/// signal arrives.
pub async fn start_server(
    object_store: Arc<dyn ObjectStore>,
    roots: Arc<dyn RootsTable>,
    proofs: Arc<dyn ProofsTable>,
    config: AppConfig,
) -> eyre::Result<()> {
    let lifecycle = TreeLifecycle::new(
        config.s3_bucket_name.clone(),
        object_store,
        roots.clone(),
        proofs.clone(),
    );
    let read = ReadPath::new(roots, proofs);
    let cors_layer = build_cors_layer(&config);

    let addr = config.listen_addr;
    let state = Arc::new(AppState {
        lifecycle,
        read,
        config,
    });

    let app = create_router(state).layer(cors_layer);

    info!("merkle-whitelist-service listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or, on Unix, SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, shutting down");
}
