//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST routes for balances, withdrawals and re-verification
//! - Authentication middleware
//! - JSON error responses for payout failures

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use kiosk_core::payout::SettlementEngine;
use kiosk_shared::JwtService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Settlement engine behind every payout route.
    pub engine: Arc<SettlementEngine>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
