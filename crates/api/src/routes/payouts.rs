//! Payout routes: balance, withdrawal history, withdrawal requests and
//! manual re-verification.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

use crate::{
    AppState,
    error::{app_error_response, payout_error_response},
    middleware::AuthUser,
};
use kiosk_core::payout::{OrganizationBalance, WithdrawalOutcome, WithdrawalRequest};
use kiosk_shared::AppError;
use kiosk_shared::types::OrganizationId;

/// Creates the payout routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/organizations/{org_id}/balance", get(get_balance))
        .route(
            "/organizations/{org_id}/withdrawals",
            get(list_withdrawals).post(request_withdrawal),
        )
        .route(
            "/organizations/{org_id}/withdrawals/{reference}/verify",
            post(reverify_withdrawal),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a withdrawal.
#[derive(Debug, Deserialize)]
pub struct WithdrawalRequestBody {
    /// Amount in major units, as a decimal string.
    pub amount: String,
    /// Optional notes attached to the transfer.
    pub notes: Option<String>,
}

/// Balance of an organization.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Derived balance.
    #[serde(flatten)]
    pub balance: OrganizationBalance,
    /// Amount that can be requested right now.
    pub withdrawable_amount: Decimal,
}

/// A withdrawal record with its user-facing outcome.
#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    /// Stored record.
    #[serde(flatten)]
    pub withdrawal: WithdrawalRequest,
    /// Outcome class.
    pub outcome: WithdrawalOutcome,
    /// Message for the requesting user.
    pub message: &'static str,
    /// Whether a manual re-verification is offered.
    pub can_reverify: bool,
}

impl From<WithdrawalRequest> for WithdrawalResponse {
    fn from(withdrawal: WithdrawalRequest) -> Self {
        let outcome = WithdrawalOutcome::of(&withdrawal);
        Self {
            withdrawal,
            outcome,
            message: outcome.message(),
            can_reverify: outcome.can_reverify(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/organizations/{org_id}/balance` - Current balance.
async fn get_balance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Response {
    let organization_id = OrganizationId::from_uuid(org_id);

    match state
        .engine
        .get_balance(organization_id, auth.user_id())
        .await
    {
        Ok(balance) => {
            let withdrawable_amount = balance.withdrawable();
            (
                StatusCode::OK,
                Json(BalanceResponse {
                    balance,
                    withdrawable_amount,
                }),
            )
                .into_response()
        }
        Err(e) => payout_error_response(&e),
    }
}

/// GET `/organizations/{org_id}/withdrawals` - Withdrawal history, newest first.
async fn list_withdrawals(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
) -> Response {
    let organization_id = OrganizationId::from_uuid(org_id);

    match state
        .engine
        .list_withdrawals(organization_id, auth.user_id())
        .await
    {
        Ok(records) => {
            let items: Vec<WithdrawalResponse> =
                records.into_iter().map(WithdrawalResponse::from).collect();
            (StatusCode::OK, Json(json!({ "data": items }))).into_response()
        }
        Err(e) => payout_error_response(&e),
    }
}

/// POST `/organizations/{org_id}/withdrawals` - Request a withdrawal.
async fn request_withdrawal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(org_id): Path<Uuid>,
    Json(payload): Json<WithdrawalRequestBody>,
) -> Response {
    let organization_id = OrganizationId::from_uuid(org_id);

    let Ok(amount) = Decimal::from_str(payload.amount.trim()) else {
        return app_error_response(&AppError::Validation(format!(
            "Invalid amount format: {}",
            payload.amount
        )));
    };

    match state
        .engine
        .request_withdrawal(organization_id, amount, payload.notes, auth.user_id())
        .await
    {
        Ok(record) => {
            info!(
                organization_id = %organization_id,
                reference = %record.external_reference,
                status = %record.status,
                "Withdrawal request handled"
            );
            (StatusCode::CREATED, Json(WithdrawalResponse::from(record))).into_response()
        }
        Err(e) => payout_error_response(&e),
    }
}

/// POST `/organizations/{org_id}/withdrawals/{reference}/verify` - Re-verify a
/// withdrawal with the payout provider.
async fn reverify_withdrawal(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((org_id, reference)): Path<(Uuid, String)>,
) -> Response {
    let organization_id = OrganizationId::from_uuid(org_id);

    match state
        .engine
        .reverify(organization_id, &reference, auth.user_id())
        .await
    {
        Ok(record) => (StatusCode::OK, Json(WithdrawalResponse::from(record))).into_response(),
        Err(e) => payout_error_response(&e),
    }
}
