//! Core business logic for Kiosk payouts.
//!
//! This crate holds the withdrawal settlement domain with ZERO database or
//! web-framework dependencies. Persistence, sales data and identity are
//! reached through the ports in [`payout::ports`].
//!
//! # Modules
//!
//! - `payout` - Balance ledger, withdrawal state machine, settlement engine
//! - `gateway` - HTTP client for the external payout provider

pub mod gateway;
pub mod payout;
