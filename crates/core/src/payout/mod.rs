//! Withdrawal settlement for publisher organizations.
//!
//! # Modules
//!
//! - `types` - Withdrawal records, provider statuses, transfer instructions
//! - `error` - Payout error taxonomy
//! - `balance` - Pure balance derivation
//! - `state` - Withdrawal status state machine
//! - `ports` - Store, sales, directory and gateway interfaces
//! - `guard` - Per-reference reconciliation guard
//! - `cache` - Derived balance cache
//! - `engine` - Settlement engine
//! - `memory` - In-process port implementations

pub mod balance;
pub mod cache;
pub mod engine;
pub mod error;
pub mod guard;
pub mod memory;
pub mod ports;
pub mod state;
pub mod types;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod state_props;

pub use balance::{BalanceAnomaly, BalanceLedger, OrganizationBalance, ShareRatio};
pub use cache::BalanceCache;
pub use engine::{SettlementConfig, SettlementEngine, SettlementPorts};
pub use error::PayoutError;
pub use guard::{ReconciliationGuard, ReconciliationPermit};
pub use ports::{OrganizationDirectory, PayoutGateway, SalesLedger, WithdrawalStore};
pub use state::WithdrawalStateMachine;
pub use types::{
    InitiatedTransfer, NewWithdrawal, PayoutCustomer, PayoutDestination, PayoutRecipient,
    ProviderStatus, RevenueSummary, TransferInstruction, TransferVerification, WithdrawalOutcome,
    WithdrawalRequest, WithdrawalStatus, WithdrawalTotals, WithdrawalVersion,
};
