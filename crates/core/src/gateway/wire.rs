//! Provider request and response bodies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::payout::types::{PayoutCustomer, PayoutDestination, ProviderStatus, TransferInstruction};

/// Body of `POST /transfers`.
#[derive(Debug, Serialize)]
pub struct InitiateTransferBody<'a> {
    /// Amount in major units, serialized as a string.
    pub amount: Decimal,
    /// ISO 4217 code.
    pub currency: &'static str,
    /// Recipient contact details.
    pub customer: &'a PayoutCustomer,
    /// Recipient account.
    pub destination: &'a PayoutDestination,
    /// Metadata echoed back by the provider.
    pub metadata: &'a BTreeMap<String, String>,
}

impl<'a> From<&'a TransferInstruction> for InitiateTransferBody<'a> {
    fn from(instruction: &'a TransferInstruction) -> Self {
        Self {
            amount: instruction.amount,
            currency: instruction.currency.code(),
            customer: &instruction.customer,
            destination: &instruction.destination,
            metadata: &instruction.metadata,
        }
    }
}

/// Response of `POST /transfers`.
#[derive(Debug, Deserialize)]
pub struct InitiateTransferResponse {
    /// Provider reference of the new transfer.
    pub reference: String,
}

/// Response of `GET /transfers/{reference}`.
#[derive(Debug, Deserialize)]
pub struct TransferStatusResponse {
    /// Provider status string.
    pub status: String,
    /// When the provider accepted the transfer.
    #[serde(default)]
    pub initiated_at: Option<DateTime<Utc>>,
    /// When the provider finished processing.
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

/// Error body returned by the provider on 4xx/5xx.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderErrorBody {
    /// Human-readable reason.
    #[serde(default)]
    pub message: Option<String>,
}

/// Parses a provider status string.
///
/// Providers disagree on spelling; both `success`/`successful` and
/// `cancelled`/`canceled` are accepted.
#[must_use]
pub fn parse_provider_status(raw: &str) -> Option<ProviderStatus> {
    match raw.trim().to_lowercase().as_str() {
        "success" | "successful" => Some(ProviderStatus::Success),
        "initiated" => Some(ProviderStatus::Initiated),
        "pending" => Some(ProviderStatus::Pending),
        "failed" => Some(ProviderStatus::Failed),
        "cancelled" | "canceled" => Some(ProviderStatus::Cancelled),
        _ => None,
    }
}
