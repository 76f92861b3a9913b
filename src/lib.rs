pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod docs;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod schemas;
pub mod services;
pub mod utils;
pub mod validation;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::services::{HubHandle, TransactionEngine};
use crate::utils::signature::SignatureVerifier;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TransactionEngine>,
    pub hub: HubHandle,
    pub verifier: SignatureVerifier,
    /// Read deadline for realtime observers.
    pub ws_idle_timeout: Duration,
}

pub fn create_app(state: AppState) -> Router {
    let signed = Router::new()
        .route("/api/v1/qr/generate", post(handlers::qr::generate_qr))
        .route("/api/v1/qr/payment", post(handlers::qr::payment_callback))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::signature::signature_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/transactions",
            get(handlers::transactions::list_transactions),
        )
        .route("/ws", get(handlers::ws::ws_handler))
        .merge(signed)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
