//! Derived balance caching using Moka.
//!
//! Each cached balance carries the [`WithdrawalVersion`] read from the store
//! before it was computed. A lookup only hits when the caller presents the
//! store's current version, so a reconciliation in any process sharing the
//! store makes older entries unreachable. Entries are bounded by the moka
//! capacity and TTL.

use std::sync::Arc;
use std::time::Duration;

use kiosk_shared::types::OrganizationId;
use moka::future::Cache;

use crate::payout::balance::OrganizationBalance;
use crate::payout::types::WithdrawalVersion;

/// Default cache capacity (number of organizations).
const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Default time-to-live for cache entries (1 minute).
const DEFAULT_TTL_SECS: u64 = 60;

#[derive(Clone)]
struct CachedBalance {
    version: WithdrawalVersion,
    balance: Arc<OrganizationBalance>,
}

/// Cache for derived organization balances.
#[derive(Clone)]
pub struct BalanceCache {
    cache: Cache<OrganizationId, CachedBalance>,
}

impl BalanceCache {
    /// Creates a cache with default settings.
    ///
    /// Default: 10,000 entries max, 1 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom configuration.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    /// Returns the cached balance if it was computed at `version`.
    pub async fn get(
        &self,
        organization_id: OrganizationId,
        version: WithdrawalVersion,
    ) -> Option<Arc<OrganizationBalance>> {
        self.cache
            .get(&organization_id)
            .await
            .filter(|entry| entry.version == version)
            .map(|entry| entry.balance)
    }

    /// Stores a balance computed after `version` was read.
    pub async fn insert(
        &self,
        organization_id: OrganizationId,
        version: WithdrawalVersion,
        balance: Arc<OrganizationBalance>,
    ) {
        self.cache
            .insert(organization_id, CachedBalance { version, balance })
            .await;
    }

    /// Drops the cached balance of an organization.
    pub async fn invalidate(&self, organization_id: OrganizationId) {
        self.cache.invalidate(&organization_id).await;
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new()
    }
}
