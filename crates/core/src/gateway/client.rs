//! HTTP client for the payout provider.
//!
//! - `POST {base_url}/transfers` starts a transfer and returns its reference.
//! - `GET {base_url}/transfers/{reference}` returns its current status.
//!
//! Requests carry the secret key as a bearer token. Nothing is retried here.

use std::time::Duration;

use async_trait::async_trait;
use kiosk_shared::config::GatewayConfig;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::{debug, warn};

use crate::gateway::error::GatewayError;
use crate::gateway::wire::{
    InitiateTransferBody, InitiateTransferResponse, ProviderErrorBody, TransferStatusResponse,
    parse_provider_status,
};
use crate::payout::ports::PayoutGateway;
use crate::payout::types::{TransferInstruction, TransferVerification};

/// reqwest-backed [`PayoutGateway`].
#[derive(Debug, Clone)]
pub struct HttpPayoutGateway {
    client: Client,
    base_url: Url,
    secret_key: String,
}

impl HttpPayoutGateway {
    /// Builds a client from configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| GatewayError::Configuration(format!("invalid base_url: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            secret_key: config.secret_key.clone(),
        })
    }

    fn transfers_url(&self, reference: Option<&str>) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                GatewayError::Configuration("base_url cannot carry a path".to_string())
            })?;
            segments.pop_if_empty().push("transfers");
            if let Some(reference) = reference {
                segments.push(reference);
            }
        }
        Ok(url)
    }

    async fn check_status(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status.is_server_error()
            || status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::REQUEST_TIMEOUT
        {
            return Err(GatewayError::Unavailable(format!(
                "provider returned {status}"
            )));
        }

        let body: ProviderErrorBody = response.json().await.unwrap_or_default();
        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message: body
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("rejected").to_string()),
        })
    }
}

fn transport_error(err: &reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl PayoutGateway for HttpPayoutGateway {
    async fn initiate(&self, instruction: &TransferInstruction) -> Result<String, GatewayError> {
        let url = self.transfers_url(None)?;
        debug!(amount = %instruction.amount, currency = %instruction.currency, "Initiating transfer");

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.secret_key)
            .json(&InitiateTransferBody::from(instruction))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let response = Self::check_status(response).await.inspect_err(|e| {
            warn!(error = %e, "Transfer initiation failed");
        })?;

        let body: InitiateTransferResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        if body.reference.trim().is_empty() {
            return Err(GatewayError::Malformed("empty transfer reference".to_string()));
        }
        Ok(body.reference)
    }

    async fn verify(&self, reference: &str) -> Result<TransferVerification, GatewayError> {
        let url = self.transfers_url(Some(reference))?;
        debug!(reference = %reference, "Verifying transfer");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let response = Self::check_status(response).await.inspect_err(|e| {
            warn!(reference = %reference, error = %e, "Transfer verification failed");
        })?;

        let body: TransferStatusResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        let status = parse_provider_status(&body.status).ok_or_else(|| {
            GatewayError::Malformed(format!("unknown transfer status '{}'", body.status))
        })?;

        Ok(TransferVerification {
            status,
            initiated_at: body.initiated_at,
            processed_at: body.processed_at,
        })
    }
}
