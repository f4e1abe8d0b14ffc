//! The webhook state machines.
//!
//! A processor takes an interpreter's canonical view of one gateway event and drives the donation / subscription
//! state machine against a backing store, producing exactly one [`WebhookResponse`] per run. Processors are
//! stateless across requests; each request gets a freshly built processor from its receiver.
//!
//! [`SubscriptionProcessor`] composes a [`DonationProcessor`] for the event types the two share, rather than
//! inheriting from it.
mod donation;
mod subscription;

use async_trait::async_trait;
pub use donation::DonationProcessor;
pub use subscription::SubscriptionProcessor;

use crate::hooks::WebhookHooks;

pub const MSG_DONATION_NOT_MATCHED: &str = "Donation Webhook: Event could not be matched to a valid donation.";
pub const MSG_REFUND: &str = "Donation Webhook: Refund processed";
pub const MSG_FAILED: &str = "Donation Webhook: Donation marked as failed.";
pub const MSG_COMPLETED: &str = "Donation Webhook: Completed payment processed.";
pub const MSG_CANCELLED: &str = "Donation Webhook: Donation cancelled.";
pub const MSG_UPDATED: &str = "Donation Webhook: Donation updated.";
pub const MSG_DONATION_EXTENSION_HANDLED: &str = "Donation Webhook: Event was handled by an extension.";
pub const MSG_DONATION_NOT_HANDLED: &str = "Donation Webhook: Event was not handled.";
pub const MSG_DONATION_INTERNAL_ERROR: &str = "Donation Webhook: Internal error while processing event.";

pub const MSG_SUBSCRIPTION_NOT_MATCHED: &str =
    "Subscription Webhook: Event could not be matched to a valid subscription.";
pub const MSG_SUBSCRIPTION_DONATION_NOT_MATCHED: &str =
    "Subscription Webhook: Event could not be matched to a valid donation.";
pub const MSG_RENEWAL: &str = "Subscription Webhook: Renewal processed";
pub const MSG_FIRST_PAYMENT: &str = "Subscription Webhook: First payment processed";
pub const MSG_SUBSCRIPTION_EXTENSION_HANDLED: &str = "Subscription Webhook: Event was handled by an extension.";
pub const MSG_SUBSCRIPTION_NOT_HANDLED: &str = "Subscription Webhook: Event was not handled.";
pub const MSG_SUBSCRIPTION_INTERNAL_ERROR: &str = "Subscription Webhook: Internal error while processing event.";

/// Object-safe face of a processor, as seen by the dispatch entrypoint.
#[async_trait]
pub trait WebhookProcessor: Send {
    /// Run the state machine. Returns true if the event was processed by a built-in handler or claimed by an
    /// extension hook. The response descriptor is always set when this returns.
    async fn process(&mut self, hooks: &WebhookHooks) -> bool;

    fn response_status(&self) -> u16;

    fn response_message(&self) -> String;
}
