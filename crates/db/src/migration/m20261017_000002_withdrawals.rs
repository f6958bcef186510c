//! Withdrawals migration.
//!
//! Creates the `withdrawal_status` enum, the `withdrawals` table and a
//! trigger that keeps terminal records immutable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(WITHDRAWALS_SQL).await?;
        db.execute_unprepared(TERMINAL_GUARD_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            r"
DROP TABLE IF EXISTS withdrawals CASCADE;
DROP FUNCTION IF EXISTS prevent_terminal_withdrawal_modification();
DROP TYPE IF EXISTS withdrawal_status;
",
        )
        .await?;
        Ok(())
    }
}

const WITHDRAWALS_SQL: &str = r"
CREATE TYPE withdrawal_status AS ENUM (
    'pending',
    'processing',
    'completed',
    'failed',
    'cancelled'
);

CREATE TABLE withdrawals (
    id UUID PRIMARY KEY,
    organization_id UUID NOT NULL,
    requested_by UUID NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    notes TEXT,
    status withdrawal_status NOT NULL,
    external_reference VARCHAR(128) NOT NULL,
    requested_at TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_withdrawal_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_withdrawal_completed_at CHECK (
        (status IN ('completed', 'failed', 'cancelled')) = (completed_at IS NOT NULL)
    )
);

-- One record per external transfer
CREATE UNIQUE INDEX uq_withdrawals_external_reference ON withdrawals(external_reference);

-- Organization history, newest first
CREATE INDEX idx_withdrawals_org_requested ON withdrawals(organization_id, requested_at DESC);
";

const TERMINAL_GUARD_SQL: &str = r"
CREATE OR REPLACE FUNCTION prevent_terminal_withdrawal_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status IN ('completed', 'failed', 'cancelled') THEN
        RAISE EXCEPTION 'Cannot modify withdrawal in terminal status %', OLD.status;
    END IF;

    IF NEW.amount <> OLD.amount
        OR NEW.organization_id <> OLD.organization_id
        OR NEW.external_reference <> OLD.external_reference THEN
        RAISE EXCEPTION 'Withdrawal amount, organization and reference are immutable';
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_terminal_withdrawal_mod
BEFORE UPDATE ON withdrawals
FOR EACH ROW
EXECUTE FUNCTION prevent_terminal_withdrawal_modification();
";
