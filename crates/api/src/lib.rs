//! HTTP API server with observability for the order engine.
//!
//! Provides REST endpoints for cart mutations, order reads and payment
//! settlement, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post};
use domain::OrderService;
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders/items", post(routes::orders::add_item::<S>))
        .route(
            "/orders/items/{item_id}",
            patch(routes::orders::update_item::<S>).delete(routes::orders::remove_item::<S>),
        )
        .route("/orders/current", get(routes::orders::current::<S>))
        .route("/orders/history", get(routes::orders::history::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/payments/{id}/confirm", post(routes::payments::confirm::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over the given store.
pub fn create_state<S: Store + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        order_service: OrderService::new(store),
    })
}
