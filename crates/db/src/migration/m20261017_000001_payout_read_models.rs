//! Read models consumed by the payout adapters.
//!
//! Creates `organization_users`, `organization_payout_accounts` and `orders`.
//! These tables are written by the membership and storefront subsystems;
//! the payout engine only reads them.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrganizationUsers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(OrganizationUsers::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(OrganizationUsers::UserId).uuid().not_null())
                    .col(ColumnDef::new(OrganizationUsers::Role).string_len(32).not_null())
                    .col(
                        ColumnDef::new(OrganizationUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(OrganizationUsers::OrganizationId)
                            .col(OrganizationUsers::UserId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrganizationPayoutAccounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrganizationPayoutAccounts::OrganizationId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrganizationPayoutAccounts::AccountName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationPayoutAccounts::Email)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationPayoutAccounts::Phone)
                            .string_len(32)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationPayoutAccounts::Channel)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationPayoutAccounts::AccountNumber)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationPayoutAccounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(OrganizationPayoutAccounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Orders::OrganizationId).uuid().not_null())
                    .col(ColumnDef::new(Orders::CustomerId).uuid().null())
                    .col(ColumnDef::new(Orders::Amount).decimal_len(19, 4).not_null())
                    .col(ColumnDef::new(Orders::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Orders::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Orders::PaidAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Revenue aggregation filters by organization and status
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_org_status")
                    .table(Orders::Table)
                    .col(Orders::OrganizationId)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(OrganizationPayoutAccounts::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(OrganizationUsers::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum OrganizationUsers {
    Table,
    OrganizationId,
    UserId,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrganizationPayoutAccounts {
    Table,
    OrganizationId,
    AccountName,
    Email,
    Phone,
    Channel,
    AccountNumber,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OrganizationId,
    CustomerId,
    Amount,
    Currency,
    Status,
    PaidAt,
    CreatedAt,
}
