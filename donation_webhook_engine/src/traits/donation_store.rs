use async_trait::async_trait;
use dwg_common::Money;
use thiserror::Error;

use crate::db_types::{Donation, DonationId, DonationStatus};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Donation #{0} does not exist.")]
    DonationNotFound(DonationId),
    #[error("Subscription #{0} does not exist.")]
    SubscriptionNotFound(crate::db_types::SubscriptionId),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

/// Lookup and mutation operations for donation records.
///
/// Mutating methods are the donation's own update operations from the engine's point of view: `update_donation_status`
/// changes the lifecycle status, `add_donation_log` appends to the audit log, `set_donation_meta` writes a metadata
/// key with overwrite semantics, and `process_refund` applies the entity's internal refund logic (including whatever
/// status change that entails).
#[async_trait]
pub trait DonationStore: Clone + Send + Sync {
    async fn fetch_donation(&self, id: DonationId) -> Result<Option<Donation>, StoreError>;

    /// Look up a donation by the transaction id the gateway assigned to its payment.
    async fn fetch_donation_by_transaction_id(&self, txn_id: &str) -> Result<Option<Donation>, StoreError>;

    /// Set the donation's lifecycle status. Returns the updated record.
    async fn update_donation_status(&self, id: DonationId, status: DonationStatus) -> Result<Donation, StoreError>;

    /// Apply a refund of `amount` with a human-readable `reason`. The resulting status is internal to the entity.
    async fn process_refund(&self, id: DonationId, amount: Money, reason: &str) -> Result<Donation, StoreError>;

    async fn set_gateway_transaction_id(&self, id: DonationId, txn_id: &str) -> Result<(), StoreError>;

    /// Write a metadata entry. Writing the same key twice overwrites; it never duplicates.
    async fn set_donation_meta(&self, id: DonationId, key: &str, value: &str) -> Result<(), StoreError>;

    /// Append a message to the donation's audit log. The log is append-only.
    async fn add_donation_log(&self, id: DonationId, message: &str) -> Result<(), StoreError>;
}
