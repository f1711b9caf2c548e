//! Router construction and the server loop.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::types::reply;
use super::{auth, expenses, users};
use crate::config::Config;
use crate::context::ServiceContext;
use crate::error::ServiceError;

async fn index() -> &'static str {
    "Expense tracker API is running"
}

async fn health() -> impl IntoResponse {
    reply(
        StatusCode::OK,
        "OK",
        serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }),
    )
}

async fn not_found() -> ServiceError {
    ServiceError::NotFound("Route")
}

pub fn router(ctx: Arc<ServiceContext>) -> Router {
    let protected = Router::new()
        .route("/api/users", get(users::me).delete(users::delete_me))
        .route("/api/users/budget", get(users::get_budget).put(users::update_budget))
        .route("/api/users/balance", get(users::balance))
        .route("/api/expenses", post(expenses::create).get(expenses::list))
        .route("/api/expenses/categorize", post(expenses::categorize))
        .route(
            "/api/expenses/:id",
            get(expenses::get)
                .put(expenses::update)
                .delete(expenses::delete),
        )
        .route_layer(middleware::from_fn_with_state(Arc::clone(&ctx), auth::require_auth));

    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .merge(protected)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Bind to the configured address and serve until Ctrl-C.
pub async fn serve(config: &Config, ctx: ServiceContext) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, router(Arc::new(ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
