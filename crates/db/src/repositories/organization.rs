//! Organization repository for payout authorization and destinations.

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};

use kiosk_core::payout::{
    OrganizationDirectory, PayoutCustomer, PayoutDestination, PayoutError, PayoutRecipient,
};
use kiosk_shared::types::{OrganizationId, UserId};

use crate::entities::{organization_payout_accounts, organization_users};

/// Membership roles allowed to withdraw an organization's earnings.
pub const PAYOUT_MANAGER_ROLES: [&str; 2] = ["owner", "admin"];

/// Organization repository backed by `organization_users` and
/// `organization_payout_accounts`.
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    db: DatabaseConnection,
}

impl OrganizationRepository {
    /// Creates a new organization repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the membership of a user in an organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_membership(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<Option<organization_users::Model>, DbErr> {
        organization_users::Entity::find_by_id((
            organization_id.into_inner(),
            user_id.into_inner(),
        ))
        .one(&self.db)
        .await
    }
}

fn recipient_from(account: organization_payout_accounts::Model) -> PayoutRecipient {
    PayoutRecipient {
        customer: PayoutCustomer {
            name: account.account_name,
            email: account.email,
            phone: account.phone,
        },
        destination: PayoutDestination {
            channel: account.channel,
            account_number: account.account_number,
        },
    }
}

#[async_trait]
impl OrganizationDirectory for OrganizationRepository {
    async fn can_manage_payouts(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
    ) -> Result<bool, PayoutError> {
        let membership = self
            .find_membership(organization_id, user_id)
            .await
            .map_err(|e| PayoutError::Database(e.to_string()))?;

        Ok(membership.is_some_and(|m| PAYOUT_MANAGER_ROLES.contains(&m.role.as_str())))
    }

    async fn payout_recipient(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Option<PayoutRecipient>, PayoutError> {
        let account = organization_payout_accounts::Entity::find_by_id(organization_id.into_inner())
            .one(&self.db)
            .await
            .map_err(|e| PayoutError::Database(e.to_string()))?;

        Ok(account.map(recipient_from))
    }
}
