//! Router construction and server startup.

use axum::{
    Router,
    routing::{get, post, put},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::handlers;
use crate::auth::Authenticator;
use crate::config::Config;
use crate::db::Database;
use crate::lifecycle::TaskLifecycle;
use crate::query::QueryBuilder;
use crate::stats::StatsAggregator;
use crate::store::TaskStore;

/// Engine components shared across handlers. All of them hold the same
/// injected store handle.
#[derive(Clone)]
pub struct AppState {
    pub queries: QueryBuilder,
    pub stats: StatsAggregator,
    pub lifecycle: TaskLifecycle,
    pub auth: Authenticator,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        let store: Arc<dyn TaskStore> = Arc::new(db.clone());
        Self {
            queries: QueryBuilder::new(store.clone(), config.paging),
            stats: StatsAggregator::new(store.clone()),
            lifecycle: TaskLifecycle::new(store),
            auth: Authenticator::new(db, config.auth.clone()),
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route(
            "/api/task",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route("/api/task/filter", post(handlers::filter_tasks))
        .route("/api/task/stats", get(handlers::task_stats))
        .route(
            "/api/task/{id}",
            put(handlers::update_task).delete(handlers::delete_task),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server in the background.
///
/// Returns a oneshot sender that signals shutdown, and the address the
/// server is bound to (useful when binding port 0).
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Task API listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Task API shutting down");
            })
            .await
        {
            tracing::error!("Task API server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}

/// Serve in the foreground until Ctrl-C.
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Task API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl-C, shutting down");
        })
        .await?;
    Ok(())
}
