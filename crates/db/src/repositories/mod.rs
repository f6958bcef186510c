//! Repository abstractions for data access.
//!
//! Each repository implements one of the payout ports, hiding the `SeaORM`
//! details from the settlement engine.

pub mod organization;
pub mod sales;
pub mod withdrawal;

pub use organization::{OrganizationRepository, PAYOUT_MANAGER_ROLES};
pub use sales::{PAID_ORDER_STATUS, SalesRepository};
pub use withdrawal::WithdrawalRepository;
