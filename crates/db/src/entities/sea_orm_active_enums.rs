//! `SeaORM` active enums mapped to PostgreSQL enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `withdrawal_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "withdrawal_status")]
pub enum WithdrawalStatus {
    /// Verification unavailable after initiation.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Transfer in flight.
    #[sea_orm(string_value = "processing")]
    Processing,
    /// Transfer confirmed.
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Transfer failed.
    #[sea_orm(string_value = "failed")]
    Failed,
    /// Transfer cancelled.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}
