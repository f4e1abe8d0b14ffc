use async_trait::async_trait;
use log::*;

use crate::{
    db_types::{DonationStatus, EventType, RecurringDonation, SubscriptionId, WebhookResponse},
    helpers,
    hooks::WebhookHooks,
    interpreters::SubscriptionInterpreter,
    processors::{
        DonationProcessor,
        WebhookProcessor,
        MSG_FIRST_PAYMENT,
        MSG_RENEWAL,
        MSG_SUBSCRIPTION_DONATION_NOT_MATCHED,
        MSG_SUBSCRIPTION_EXTENSION_HANDLED,
        MSG_SUBSCRIPTION_INTERNAL_ERROR,
        MSG_SUBSCRIPTION_NOT_HANDLED,
        MSG_SUBSCRIPTION_NOT_MATCHED,
    },
    traits::{StoreError, SubscriptionStore},
};

/// Drives the subscription state machine for one webhook event.
///
/// The donation-level event types (completed payment, refund and friends) are delegated to an inner
/// [`DonationProcessor`] rather than re-implemented; this processor only adds the subscription pre-checks and the
/// `renewal` / `first_payment` handlers.
pub struct SubscriptionProcessor<B, I> {
    inner: DonationProcessor<B, I>,
    subscription: Option<RecurringDonation>,
}

impl<B, I> SubscriptionProcessor<B, I>
where
    B: SubscriptionStore,
    I: SubscriptionInterpreter,
{
    pub fn new(store: B, interpreter: I) -> Self {
        Self { inner: DonationProcessor::new(store, interpreter), subscription: None }
    }

    /// The recurring donation this run resolved, if any.
    pub fn recurring_donation(&self) -> Option<&RecurringDonation> {
        self.subscription.as_ref()
    }

    /// The donation this run resolved or created, if any.
    pub fn donation(&self) -> Option<&crate::db_types::Donation> {
        self.inner.donation()
    }

    pub fn interpreter(&self) -> &I {
        self.inner.interpreter()
    }

    pub fn response(&self) -> Option<&WebhookResponse> {
        self.inner.response()
    }

    /// Process the webhook event. Returns true if a built-in handler or an extension hook dealt with it.
    pub async fn run(&mut self, hooks: &WebhookHooks) -> bool {
        self.subscription = self.inner.interpreter.recurring_donation();

        // Without a recurring donation, there's nothing left to do.
        let Some(subscription) = self.subscription.clone() else {
            debug!("🪝️ Webhook event could not be matched to a subscription.");
            self.inner.set_response(MSG_SUBSCRIPTION_NOT_MATCHED, 200);
            return false;
        };

        // Also resolve the donation. Renewals are allowed to have no pre-existing donation.
        self.inner.donation = self.inner.interpreter.donation();
        if self.inner.donation.is_none() && !self.inner.interpreter.is_renewal() {
            debug!("🪝️ Subscription webhook event could not be matched to a donation.");
            self.inner.set_response(MSG_SUBSCRIPTION_DONATION_NOT_MATCHED, 200);
            return false;
        }

        let event = self.inner.interpreter.event_type();
        trace!("🪝️ Processing {event} event for {subscription}");
        let result = match &event {
            EventType::Renewal => self.process_renewal(&subscription).await,
            EventType::FirstPayment => self.process_first_payment(&subscription).await,
            EventType::Other(tag) => {
                let handled = match &hooks.on_unhandled_subscription_event {
                    Some(hook) => hook(false, &subscription, &self.inner.interpreter),
                    None => false,
                };
                if handled {
                    debug!("🪝️ Subscription event {tag} was claimed by an extension hook.");
                    self.inner.set_response(MSG_SUBSCRIPTION_EXTENSION_HANDLED, 200);
                } else {
                    warn!("🪝️ No handler for subscription event type {tag}. Event ignored.");
                    self.inner.set_response(MSG_SUBSCRIPTION_NOT_HANDLED, 200);
                }
                return handled;
            },
            _ => self.delegate_donation_event(&event).await,
        };
        match result {
            Ok(processed) => processed,
            Err(e) => {
                error!("🪝️ Could not process {event} event for subscription #{}. {e}", subscription.id);
                self.inner.set_response(MSG_SUBSCRIPTION_INTERNAL_ERROR, 500);
                false
            },
        }
    }

    /// A renewal charge: materialise a fresh donation from the subscription and adopt it for the rest of the run.
    async fn process_renewal(&mut self, subscription: &RecurringDonation) -> Result<bool, StoreError> {
        let donation =
            self.inner.store.create_renewal_donation(subscription, DonationStatus::Completed).await?;
        info!("🪝️ Created renewal donation #{} for subscription #{}.", donation.id, subscription.id);
        self.inner.donation = Some(donation.clone());
        self.save_gateway_subscription_data(subscription.id).await?;
        self.inner.save_gateway_transaction_data(donation.id).await?;
        self.inner.update_meta(donation.id).await?;
        self.inner.update_logs(donation.id).await?;
        self.inner
            .store
            .add_subscription_log(subscription.id, &format!("Renewal processed. Donation #{}", donation.id))
            .await?;
        self.inner.set_response(MSG_RENEWAL, 200);
        Ok(true)
    }

    /// The first charge of a new subscription: complete the initial donation and activate the subscription.
    async fn process_first_payment(&mut self, subscription: &RecurringDonation) -> Result<bool, StoreError> {
        let Some(donation) = self.inner.donation.clone() else {
            self.inner.set_response(MSG_SUBSCRIPTION_DONATION_NOT_MATCHED, 200);
            return Ok(false);
        };
        self.inner.process_completed_payment(donation.id).await?;
        self.inner.store.renew_subscription(subscription.id).await?;
        self.save_gateway_subscription_data(subscription.id).await?;
        self.inner.update_meta(donation.id).await?;
        self.inner.update_logs(donation.id).await?;
        self.inner.set_response(MSG_FIRST_PAYMENT, 200);
        Ok(true)
    }

    async fn delegate_donation_event(&mut self, event: &EventType) -> Result<bool, StoreError> {
        let Some(donation) = self.inner.donation.clone() else {
            // Only reachable for renewal-flagged events that carry a donation-level event type.
            self.inner.set_response(MSG_SUBSCRIPTION_DONATION_NOT_MATCHED, 200);
            return Ok(false);
        };
        match event {
            EventType::Refund => self.inner.process_refund(donation.id).await,
            EventType::FailedPayment => self.inner.process_failed_payment(donation.id).await,
            EventType::CompletedPayment => self.inner.process_completed_payment(donation.id).await,
            EventType::Cancellation => self.inner.process_cancellation(donation.id).await,
            EventType::UpdatedDonation => self.inner.process_updated_donation(&donation).await,
            // Renewal, FirstPayment and Other are handled by the caller.
            _ => Ok(false),
        }
    }

    /// Save the gateway subscription id and URL onto the recurring donation, if the payload carried them.
    async fn save_gateway_subscription_data(&self, id: SubscriptionId) -> Result<(), StoreError> {
        if let Some(gw_id) = self.inner.interpreter.gateway_subscription_id() {
            self.inner.store.set_gateway_subscription_id(id, &gw_id).await?;
        }
        helpers::set_gateway_subscription_url(
            &self.inner.store,
            id,
            self.inner.interpreter.gateway_subscription_url(),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl<B, I> WebhookProcessor for SubscriptionProcessor<B, I>
where
    B: SubscriptionStore + 'static,
    I: SubscriptionInterpreter + 'static,
{
    async fn process(&mut self, hooks: &WebhookHooks) -> bool {
        self.run(hooks).await
    }

    fn response_status(&self) -> u16 {
        self.inner.response().map(|r| r.status).unwrap_or(200)
    }

    fn response_message(&self) -> String {
        self.inner.response().map(|r| r.message.clone()).unwrap_or_default()
    }
}
