//! Kiosk payout server.
//!
//! Main entry point for the withdrawal settlement service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kiosk_api::{AppState, create_router};
use kiosk_core::gateway::HttpPayoutGateway;
use kiosk_core::payout::{SettlementConfig, SettlementEngine, SettlementPorts};
use kiosk_db::{OrganizationRepository, SalesRepository, WithdrawalRepository, connect_with};
use kiosk_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiosk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_with(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let gateway = HttpPayoutGateway::new(&config.gateway)?;
    let settlement = SettlementConfig::from_app(&config.payout, &config.gateway)?;
    info!(
        currency = %settlement.currency,
        platform_share = %settlement.share_ratio.platform(),
        gateway = %config.gateway.base_url,
        "Settlement engine configured"
    );

    let engine = SettlementEngine::new(
        SettlementPorts {
            store: Arc::new(WithdrawalRepository::new(db.clone())),
            sales: Arc::new(SalesRepository::new(db.clone())),
            directory: Arc::new(OrganizationRepository::new(db)),
            gateway: Arc::new(gateway),
        },
        settlement,
    );

    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        ..JwtConfig::default()
    });

    let state = AppState {
        engine: Arc::new(engine),
        jwt_service: Arc::new(jwt_service),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
