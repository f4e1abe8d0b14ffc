//! Behaviour that entity backends need to expose in order to be driven by the webhook engine.
//!
//! The engine never persists donations or subscriptions itself. All mutation goes through these traits, so that the
//! state machine in [`crate::processors`] stays agnostic of the storage engine. Any concurrency-safety guarantees
//! (row locking, optimistic concurrency, transaction-id deduplication) are the backend's responsibility; each webhook
//! delivery is processed as one independent request-response cycle.
//!
//! * [`DonationStore`] covers lookup and mutation of single donations.
//! * [`SubscriptionStore`] extends it with recurring-donation behaviour, including materialising renewal donations.
mod donation_store;
mod subscription_store;

pub use donation_store::{DonationStore, StoreError};
pub use subscription_store::SubscriptionStore;
