//! External payout provider client.
//!
//! # Modules
//!
//! - `client` - reqwest-based [`HttpPayoutGateway`]
//! - `error` - Gateway error taxonomy
//! - `wire` - Provider request and response bodies

pub mod client;
pub mod error;
pub mod wire;

pub use client::HttpPayoutGateway;
pub use error::GatewayError;
