use async_trait::async_trait;

use crate::{
    db_types::{Donation, DonationStatus, RecurringDonation, SubscriptionId},
    traits::{DonationStore, StoreError},
};

/// Recurring-donation behaviour on top of [`DonationStore`].
#[async_trait]
pub trait SubscriptionStore: DonationStore {
    async fn fetch_subscription(&self, id: SubscriptionId) -> Result<Option<RecurringDonation>, StoreError>;

    /// Look up a subscription by the identifier the gateway assigned to it.
    async fn fetch_subscription_by_gateway_id(&self, gw_id: &str)
        -> Result<Option<RecurringDonation>, StoreError>;

    /// Materialise a new donation from the subscription, with the given initial status. This is the only path by
    /// which the engine causes a donation to come into existence.
    async fn create_renewal_donation(
        &self,
        subscription: &RecurringDonation,
        status: DonationStatus,
    ) -> Result<Donation, StoreError>;

    /// Activate the subscription (mark it renewed). Returns the updated record.
    async fn renew_subscription(&self, id: SubscriptionId) -> Result<RecurringDonation, StoreError>;

    async fn set_gateway_subscription_id(&self, id: SubscriptionId, gw_id: &str) -> Result<(), StoreError>;

    /// Write a metadata entry against the subscription. Same overwrite semantics as donation meta.
    async fn set_subscription_meta(&self, id: SubscriptionId, key: &str, value: &str) -> Result<(), StoreError>;

    /// Append a message to the subscription's own audit log.
    async fn add_subscription_log(&self, id: SubscriptionId, message: &str) -> Result<(), StoreError>;
}
