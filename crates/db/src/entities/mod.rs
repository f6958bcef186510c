//! `SeaORM` entity definitions.
//!
//! `withdrawals` is owned by this crate. The other tables are read models
//! populated by the storefront and membership subsystems.

pub mod orders;
pub mod organization_payout_accounts;
pub mod organization_users;
pub mod sea_orm_active_enums;
pub mod withdrawals;
