//! A reference in-memory backend.
//!
//! `MemoryStore` implements [`DonationStore`] and [`SubscriptionStore`] on top of a mutex-guarded map. It backs the
//! demo server and the test suites; real deployments are expected to bring their own storage engine. The seed and
//! query helpers below the trait impls exist so that tests can set up and inspect entity state directly.
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use dwg_common::Money;

use crate::{
    db_types::{Donation, DonationId, DonationStatus, RecurringDonation, SubscriptionId, SubscriptionStatus},
    traits::{DonationStore, StoreError, SubscriptionStore},
};

#[derive(Default)]
struct MemoryStoreInner {
    donations: HashMap<DonationId, Donation>,
    subscriptions: HashMap<SubscriptionId, RecurringDonation>,
    donation_logs: HashMap<DonationId, Vec<String>>,
    donation_meta: HashMap<DonationId, HashMap<String, String>>,
    subscription_logs: HashMap<SubscriptionId, Vec<String>>,
    subscription_meta: HashMap<SubscriptionId, HashMap<String, String>>,
    refunds: HashMap<DonationId, Vec<(Money, String)>>,
    next_donation_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        // A poisoned lock only means another thread panicked mid-write; recover the data rather than cascading.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn seed_donation(&self, donation: Donation) {
        let mut inner = self.lock();
        inner.next_donation_id = inner.next_donation_id.max(donation.id.0);
        inner.donations.insert(donation.id, donation);
    }

    pub fn seed_subscription(&self, subscription: RecurringDonation) {
        self.lock().subscriptions.insert(subscription.id, subscription);
    }

    pub fn donation(&self, id: DonationId) -> Option<Donation> {
        self.lock().donations.get(&id).cloned()
    }

    pub fn subscription(&self, id: SubscriptionId) -> Option<RecurringDonation> {
        self.lock().subscriptions.get(&id).cloned()
    }

    pub fn donation_logs(&self, id: DonationId) -> Vec<String> {
        self.lock().donation_logs.get(&id).cloned().unwrap_or_default()
    }

    pub fn donation_meta(&self, id: DonationId) -> HashMap<String, String> {
        self.lock().donation_meta.get(&id).cloned().unwrap_or_default()
    }

    pub fn subscription_logs(&self, id: SubscriptionId) -> Vec<String> {
        self.lock().subscription_logs.get(&id).cloned().unwrap_or_default()
    }

    pub fn subscription_meta(&self, id: SubscriptionId) -> HashMap<String, String> {
        self.lock().subscription_meta.get(&id).cloned().unwrap_or_default()
    }

    pub fn refunds(&self, id: DonationId) -> Vec<(Money, String)> {
        self.lock().refunds.get(&id).cloned().unwrap_or_default()
    }

    pub fn donation_count(&self) -> usize {
        self.lock().donations.len()
    }
}

#[async_trait]
impl DonationStore for MemoryStore {
    async fn fetch_donation(&self, id: DonationId) -> Result<Option<Donation>, StoreError> {
        Ok(self.lock().donations.get(&id).cloned())
    }

    async fn fetch_donation_by_transaction_id(&self, txn_id: &str) -> Result<Option<Donation>, StoreError> {
        Ok(self.lock().donations.values().find(|d| d.gateway_transaction_id.as_deref() == Some(txn_id)).cloned())
    }

    async fn update_donation_status(&self, id: DonationId, status: DonationStatus) -> Result<Donation, StoreError> {
        let mut inner = self.lock();
        let donation = inner.donations.get_mut(&id).ok_or(StoreError::DonationNotFound(id))?;
        donation.status = status;
        donation.updated_at = Utc::now();
        Ok(donation.clone())
    }

    async fn process_refund(&self, id: DonationId, amount: Money, reason: &str) -> Result<Donation, StoreError> {
        let mut inner = self.lock();
        let donation = inner.donations.get_mut(&id).ok_or(StoreError::DonationNotFound(id))?;
        donation.status = DonationStatus::Refunded;
        donation.updated_at = Utc::now();
        let donation = donation.clone();
        inner.refunds.entry(id).or_default().push((amount, reason.to_string()));
        Ok(donation)
    }

    async fn set_gateway_transaction_id(&self, id: DonationId, txn_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let donation = inner.donations.get_mut(&id).ok_or(StoreError::DonationNotFound(id))?;
        donation.gateway_transaction_id = Some(txn_id.to_string());
        donation.updated_at = Utc::now();
        Ok(())
    }

    async fn set_donation_meta(&self, id: DonationId, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.donations.contains_key(&id) {
            return Err(StoreError::DonationNotFound(id));
        }
        inner.donation_meta.entry(id).or_default().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn add_donation_log(&self, id: DonationId, message: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.donations.contains_key(&id) {
            return Err(StoreError::DonationNotFound(id));
        }
        inner.donation_logs.entry(id).or_default().push(message.to_string());
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn fetch_subscription(&self, id: SubscriptionId) -> Result<Option<RecurringDonation>, StoreError> {
        Ok(self.lock().subscriptions.get(&id).cloned())
    }

    async fn fetch_subscription_by_gateway_id(
        &self,
        gw_id: &str,
    ) -> Result<Option<RecurringDonation>, StoreError> {
        Ok(self.lock().subscriptions.values().find(|s| s.gateway_subscription_id.as_deref() == Some(gw_id)).cloned())
    }

    async fn create_renewal_donation(
        &self,
        subscription: &RecurringDonation,
        status: DonationStatus,
    ) -> Result<Donation, StoreError> {
        let mut inner = self.lock();
        if !inner.subscriptions.contains_key(&subscription.id) {
            return Err(StoreError::SubscriptionNotFound(subscription.id));
        }
        inner.next_donation_id += 1;
        let mut donation = Donation::new(DonationId(inner.next_donation_id), status, subscription.amount);
        donation.subscription_id = Some(subscription.id);
        inner.donations.insert(donation.id, donation.clone());
        Ok(donation)
    }

    async fn renew_subscription(&self, id: SubscriptionId) -> Result<RecurringDonation, StoreError> {
        let mut inner = self.lock();
        let subscription = inner.subscriptions.get_mut(&id).ok_or(StoreError::SubscriptionNotFound(id))?;
        subscription.status = SubscriptionStatus::Active;
        subscription.updated_at = Utc::now();
        Ok(subscription.clone())
    }

    async fn set_gateway_subscription_id(&self, id: SubscriptionId, gw_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let subscription = inner.subscriptions.get_mut(&id).ok_or(StoreError::SubscriptionNotFound(id))?;
        subscription.gateway_subscription_id = Some(gw_id.to_string());
        subscription.updated_at = Utc::now();
        Ok(())
    }

    async fn set_subscription_meta(&self, id: SubscriptionId, key: &str, value: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.subscriptions.contains_key(&id) {
            return Err(StoreError::SubscriptionNotFound(id));
        }
        inner.subscription_meta.entry(id).or_default().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn add_subscription_log(&self, id: SubscriptionId, message: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.subscriptions.contains_key(&id) {
            return Err(StoreError::SubscriptionNotFound(id));
        }
        inner.subscription_logs.entry(id).or_default().push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn meta_writes_overwrite_instead_of_duplicating() {
        let store = MemoryStore::new();
        let id = DonationId(1);
        store.seed_donation(Donation::new(id, DonationStatus::Pending, Money::from(500)));
        store.set_donation_meta(id, "_stripe_event_id", "evt_1").await.unwrap();
        store.set_donation_meta(id, "_stripe_event_id", "evt_2").await.unwrap();
        let meta = store.donation_meta(id);
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.get("_stripe_event_id").map(String::as_str), Some("evt_2"));
    }

    #[tokio::test]
    async fn renewal_donations_get_fresh_ids() {
        let store = MemoryStore::new();
        store.seed_donation(Donation::new(DonationId(42), DonationStatus::Completed, Money::from(1500)));
        let sub = RecurringDonation::new(SubscriptionId(9), SubscriptionStatus::Active, Money::from(1500));
        store.seed_subscription(sub.clone());
        let renewal = store.create_renewal_donation(&sub, DonationStatus::Completed).await.unwrap();
        assert_eq!(renewal.id, DonationId(43));
        assert_eq!(renewal.subscription_id, Some(SubscriptionId(9)));
        assert_eq!(renewal.status, DonationStatus::Completed);
        assert_eq!(store.donation_count(), 2);
    }

    #[tokio::test]
    async fn missing_entities_are_reported() {
        let store = MemoryStore::new();
        let err = store.update_donation_status(DonationId(1), DonationStatus::Completed).await.unwrap_err();
        assert!(matches!(err, StoreError::DonationNotFound(_)));
        let err = store.renew_subscription(SubscriptionId(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::SubscriptionNotFound(_)));
    }

    #[tokio::test]
    async fn transaction_id_lookup() {
        let store = MemoryStore::new();
        let id = DonationId(5);
        store.seed_donation(Donation::new(id, DonationStatus::Pending, Money::from(100)));
        store.set_gateway_transaction_id(id, "ch_123").await.unwrap();
        let found = store.fetch_donation_by_transaction_id("ch_123").await.unwrap();
        assert_eq!(found.map(|d| d.id), Some(id));
        assert!(store.fetch_donation_by_transaction_id("ch_999").await.unwrap().is_none());
    }
}
