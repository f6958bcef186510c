//! JSON error responses.
//!
//! Every failure is rendered as `{error, message}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kiosk_core::payout::PayoutError;
use kiosk_shared::AppError;
use serde_json::json;
use tracing::{error, warn};

/// Converts a payout error into an `{error, message}` JSON response.
///
/// Server-side failures are logged here; their detail never reaches the
/// client.
pub fn payout_error_response(e: &PayoutError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_server_error() {
        if e.is_transient() {
            warn!(error = %e, code = e.error_code(), "Payout request failed transiently");
        } else {
            error!(error = %e, code = e.error_code(), "Payout request failed");
        }
    }

    (
        status,
        Json(json!({
            "error": e.error_code(),
            "message": e.user_message()
        })),
    )
        .into_response()
}

/// Converts a request-level error into an `{error, message}` JSON response.
pub fn app_error_response(e: &AppError) -> Response {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    (
        status,
        Json(json!({
            "error": e.error_code(),
            "message": e.to_string()
        })),
    )
        .into_response()
}
