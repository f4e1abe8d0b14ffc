use async_trait::async_trait;
use log::*;

use crate::{
    db_types::{Donation, DonationId, DonationStatus, EventType, WebhookResponse},
    helpers,
    hooks::WebhookHooks,
    interpreters::DonationInterpreter,
    processors::{
        WebhookProcessor,
        MSG_CANCELLED,
        MSG_COMPLETED,
        MSG_DONATION_EXTENSION_HANDLED,
        MSG_DONATION_INTERNAL_ERROR,
        MSG_DONATION_NOT_HANDLED,
        MSG_DONATION_NOT_MATCHED,
        MSG_FAILED,
        MSG_REFUND,
        MSG_UPDATED,
    },
    traits::{DonationStore, StoreError},
};

/// Drives the donation state machine for one webhook event.
pub struct DonationProcessor<B, I> {
    pub(super) store: B,
    pub(super) interpreter: I,
    pub(super) donation: Option<Donation>,
    pub(super) response: Option<WebhookResponse>,
}

impl<B, I> DonationProcessor<B, I>
where
    B: DonationStore,
    I: DonationInterpreter,
{
    pub fn new(store: B, interpreter: I) -> Self {
        Self { store, interpreter, donation: None, response: None }
    }

    /// The donation this run resolved, if any.
    pub fn donation(&self) -> Option<&Donation> {
        self.donation.as_ref()
    }

    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    pub fn response(&self) -> Option<&WebhookResponse> {
        self.response.as_ref()
    }

    /// Set the response descriptor, honouring the interpreter's overrides. The override takes precedence
    /// independently for the message and the status; the handler's defaults apply otherwise.
    pub(super) fn set_response(&mut self, message: &str, status: u16) {
        let message = match self.interpreter.response_message().filter(|m| !m.is_empty()) {
            Some(m) => m,
            None => message.to_string(),
        };
        let status = self.interpreter.response_status().filter(|s| *s != 0).unwrap_or(status);
        self.response = Some(WebhookResponse::new(status, message));
    }

    /// Process the webhook event. Returns true if a built-in handler or an extension hook dealt with it.
    pub async fn run(&mut self, hooks: &WebhookHooks) -> bool {
        self.donation = self.interpreter.donation();

        // Without a donation, there's nothing left to do. 200 on purpose, to avoid gateway retry storms.
        let Some(donation) = self.donation.clone() else {
            debug!("🪝️ Webhook event could not be matched to a donation.");
            self.set_response(MSG_DONATION_NOT_MATCHED, 200);
            return false;
        };

        let event = self.interpreter.event_type();
        trace!("🪝️ Processing {event} event for {donation}");
        let result = match &event {
            EventType::Refund => self.process_refund(donation.id).await,
            EventType::FailedPayment => self.process_failed_payment(donation.id).await,
            EventType::CompletedPayment => self.process_completed_payment(donation.id).await,
            EventType::Cancellation => self.process_cancellation(donation.id).await,
            EventType::UpdatedDonation => self.process_updated_donation(&donation).await,
            other => {
                let handled = match &hooks.on_unhandled_donation_event {
                    Some(hook) => hook(false, &donation, &self.interpreter),
                    None => false,
                };
                if handled {
                    debug!("🪝️ Donation event {other} was claimed by an extension hook.");
                    self.set_response(MSG_DONATION_EXTENSION_HANDLED, 200);
                } else {
                    warn!("🪝️ No handler for donation event type {other}. Event ignored.");
                    self.set_response(MSG_DONATION_NOT_HANDLED, 200);
                }
                return handled;
            },
        };
        match result {
            Ok(processed) => processed,
            Err(e) => {
                error!("🪝️ Could not process {event} event for donation #{}. {e}", donation.id);
                self.set_response(MSG_DONATION_INTERNAL_ERROR, 500);
                false
            },
        }
    }

    pub(super) async fn process_refund(&mut self, id: DonationId) -> Result<bool, StoreError> {
        let amount = self.interpreter.refund_amount().unwrap_or_default();
        let reason = self.interpreter.refund_log_message().unwrap_or_default();
        self.store.process_refund(id, amount, &reason).await?;
        info!("🪝️ Refund of {amount} applied to donation #{id}.");
        self.save_gateway_transaction_data(id).await?;
        self.update_meta(id).await?;
        self.update_logs(id).await?;
        self.set_response(MSG_REFUND, 200);
        Ok(true)
    }

    pub(super) async fn process_failed_payment(&mut self, id: DonationId) -> Result<bool, StoreError> {
        self.store.update_donation_status(id, DonationStatus::Failed).await?;
        self.save_gateway_transaction_data(id).await?;
        self.update_meta(id).await?;
        self.update_logs(id).await?;
        self.set_response(MSG_FAILED, 200);
        Ok(true)
    }

    pub(super) async fn process_completed_payment(&mut self, id: DonationId) -> Result<bool, StoreError> {
        self.store.update_donation_status(id, DonationStatus::Completed).await?;
        self.save_gateway_transaction_data(id).await?;
        self.update_meta(id).await?;
        self.update_logs(id).await?;
        self.set_response(MSG_COMPLETED, 200);
        Ok(true)
    }

    pub(super) async fn process_cancellation(&mut self, id: DonationId) -> Result<bool, StoreError> {
        self.store.update_donation_status(id, DonationStatus::Cancelled).await?;
        self.save_gateway_transaction_data(id).await?;
        self.update_meta(id).await?;
        self.update_logs(id).await?;
        self.set_response(MSG_CANCELLED, 200);
        Ok(true)
    }

    /// The donation was updated in some way without the status necessarily changing.
    pub(super) async fn process_updated_donation(&mut self, donation: &Donation) -> Result<bool, StoreError> {
        if let Some(status) = self.interpreter.donation_status() {
            if status != donation.status {
                self.store.update_donation_status(donation.id, status).await?;
            }
        }
        self.update_meta(donation.id).await?;
        self.update_logs(donation.id).await?;
        self.set_response(MSG_UPDATED, 200);
        Ok(true)
    }

    /// Save the gateway transaction id and URL, if the payload carried them.
    pub(super) async fn save_gateway_transaction_data(&self, id: DonationId) -> Result<(), StoreError> {
        if let Some(txn_id) = self.interpreter.gateway_transaction_id() {
            self.store.set_gateway_transaction_id(id, &txn_id).await?;
        }
        helpers::set_gateway_transaction_url(&self.store, id, self.interpreter.gateway_transaction_url()).await?;
        Ok(())
    }

    pub(super) async fn update_meta(&self, id: DonationId) -> Result<(), StoreError> {
        for (key, value) in self.interpreter.meta() {
            self.store.set_donation_meta(id, &key, &value).await?;
        }
        Ok(())
    }

    pub(super) async fn update_logs(&self, id: DonationId) -> Result<(), StoreError> {
        for message in self.interpreter.logs() {
            self.store.add_donation_log(id, &message).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<B, I> WebhookProcessor for DonationProcessor<B, I>
where
    B: DonationStore + 'static,
    I: DonationInterpreter + 'static,
{
    async fn process(&mut self, hooks: &WebhookHooks) -> bool {
        self.run(hooks).await
    }

    fn response_status(&self) -> u16 {
        self.response.as_ref().map(|r| r.status).unwrap_or(200)
    }

    fn response_message(&self) -> String {
        self.response.as_ref().map(|r| r.message.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use dwg_common::Money;

    use super::*;
    use crate::{
        helpers::GATEWAY_TRANSACTION_URL_KEY,
        test_utils::StubInterpreter,
        MemoryStore,
    };

    fn store_with_donation(id: i64, status: DonationStatus) -> MemoryStore {
        let store = MemoryStore::new();
        store.seed_donation(Donation::new(DonationId(id), status, Money::from(2500)));
        store
    }

    #[tokio::test]
    async fn completed_payment_updates_status_meta_and_logs() {
        let _ = env_logger::try_init().ok();
        let store = store_with_donation(42, DonationStatus::Pending);
        let interpreter = StubInterpreter::new(EventType::CompletedPayment)
            .with_donation(store.donation(DonationId(42)).unwrap())
            .with_transaction("ch_1", "https://dashboard.stripe.com/payments/ch_1")
            .with_log("Payment confirmed by gateway.")
            .with_log("Second entry.")
            .with_meta("_stripe_event_id", "evt_9");
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        let processed = processor.run(&WebhookHooks::default()).await;
        assert!(processed);
        let donation = store.donation(DonationId(42)).unwrap();
        assert_eq!(donation.status, DonationStatus::Completed);
        assert_eq!(donation.gateway_transaction_id.as_deref(), Some("ch_1"));
        assert_eq!(
            store.donation_logs(DonationId(42)),
            vec!["Payment confirmed by gateway.".to_string(), "Second entry.".to_string()]
        );
        let meta = store.donation_meta(DonationId(42));
        assert_eq!(meta.get("_stripe_event_id").map(String::as_str), Some("evt_9"));
        assert_eq!(
            meta.get(GATEWAY_TRANSACTION_URL_KEY).map(String::as_str),
            Some("https://dashboard.stripe.com/payments/ch_1")
        );
        assert_eq!(processor.response(), Some(&WebhookResponse::ok(MSG_COMPLETED)));
    }

    #[tokio::test]
    async fn refund_applies_amount_and_message() {
        let store = store_with_donation(7, DonationStatus::Completed);
        let interpreter = StubInterpreter::new(EventType::Refund)
            .with_donation(store.donation(DonationId(7)).unwrap())
            .with_refund(Money::from(1200), "Refunded 12.00 via Stripe.");
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        assert!(processor.run(&WebhookHooks::default()).await);
        let refunds = store.refunds(DonationId(7));
        assert_eq!(refunds, vec![(Money::from(1200), "Refunded 12.00 via Stripe.".to_string())]);
        assert_eq!(processor.response(), Some(&WebhookResponse::ok(MSG_REFUND)));
    }

    #[tokio::test]
    async fn failed_and_cancelled_events_set_status() {
        for (event, status, message) in [
            (EventType::FailedPayment, DonationStatus::Failed, MSG_FAILED),
            (EventType::Cancellation, DonationStatus::Cancelled, MSG_CANCELLED),
        ] {
            let store = store_with_donation(1, DonationStatus::Pending);
            let interpreter =
                StubInterpreter::new(event).with_donation(store.donation(DonationId(1)).unwrap());
            let mut processor = DonationProcessor::new(store.clone(), interpreter);
            assert!(processor.run(&WebhookHooks::default()).await);
            assert_eq!(store.donation(DonationId(1)).unwrap().status, status);
            assert_eq!(processor.response(), Some(&WebhookResponse::ok(message)));
        }
    }

    #[tokio::test]
    async fn updated_donation_only_writes_on_change() {
        // The store has no donation record, so any status write would fail the run. An unchanged status must
        // therefore succeed without touching the store at all.
        let store = MemoryStore::new();
        let donation = Donation::new(DonationId(3), DonationStatus::Completed, Money::from(2500));
        let interpreter = StubInterpreter::new(EventType::UpdatedDonation)
            .with_donation(donation.clone())
            .with_donation_status(DonationStatus::Completed);
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        assert!(processor.run(&WebhookHooks::default()).await);
        assert_eq!(processor.response(), Some(&WebhookResponse::ok(MSG_UPDATED)));

        // Different status: the caller-supplied status is applied.
        let store = store_with_donation(3, DonationStatus::Completed);
        let interpreter = StubInterpreter::new(EventType::UpdatedDonation)
            .with_donation(store.donation(DonationId(3)).unwrap())
            .with_donation_status(DonationStatus::Cancelled);
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        assert!(processor.run(&WebhookHooks::default()).await);
        assert_eq!(store.donation(DonationId(3)).unwrap().status, DonationStatus::Cancelled);
    }

    #[tokio::test]
    async fn unmatched_donation_short_circuits_without_mutation() {
        let store = MemoryStore::new();
        let interpreter = StubInterpreter::new(EventType::CompletedPayment);
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        let processed = processor.run(&WebhookHooks::default()).await;
        assert!(!processed);
        assert_eq!(store.donation_count(), 0);
        assert_eq!(processor.response(), Some(&WebhookResponse::ok(MSG_DONATION_NOT_MATCHED)));
    }

    #[tokio::test]
    async fn interpreter_overrides_take_precedence_independently() {
        // Message override only.
        let store = store_with_donation(1, DonationStatus::Pending);
        let interpreter = StubInterpreter::new(EventType::CompletedPayment)
            .with_donation(store.donation(DonationId(1)).unwrap())
            .with_response_message("All good over here.");
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        assert!(processor.run(&WebhookHooks::default()).await);
        assert_eq!(processor.response(), Some(&WebhookResponse::ok("All good over here.")));

        // Status override only.
        let interpreter = StubInterpreter::new(EventType::CompletedPayment)
            .with_donation(store.donation(DonationId(1)).unwrap())
            .with_response_status(202);
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        assert!(processor.run(&WebhookHooks::default()).await);
        assert_eq!(processor.response(), Some(&WebhookResponse::new(202, MSG_COMPLETED)));

        // An empty message override does not shadow the default.
        let interpreter = StubInterpreter::new(EventType::CompletedPayment)
            .with_donation(store.donation(DonationId(1)).unwrap())
            .with_response_message("");
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        assert!(processor.run(&WebhookHooks::default()).await);
        assert_eq!(processor.response(), Some(&WebhookResponse::ok(MSG_COMPLETED)));
    }

    #[tokio::test]
    async fn unmapped_event_goes_to_the_fallback_hook() {
        let store = store_with_donation(5, DonationStatus::Pending);
        let interpreter = StubInterpreter::new(EventType::Other("charge.disputed".to_string()))
            .with_donation(store.donation(DonationId(5)).unwrap());

        // No hook registered: not processed, explicit default response.
        let mut processor = DonationProcessor::new(store.clone(), interpreter.clone());
        assert!(!processor.run(&WebhookHooks::default()).await);
        assert_eq!(processor.response(), Some(&WebhookResponse::ok(MSG_DONATION_NOT_HANDLED)));

        // Hook claims the event.
        let seen = Arc::new(AtomicBool::new(false));
        let seen_clone = Arc::clone(&seen);
        let mut hooks = WebhookHooks::default();
        hooks.on_unhandled_donation_event(move |handled, donation, interpreter| {
            assert!(!handled);
            assert_eq!(donation.id, DonationId(5));
            assert_eq!(interpreter.event_type(), EventType::Other("charge.disputed".to_string()));
            seen_clone.store(true, Ordering::SeqCst);
            true
        });
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        assert!(processor.run(&hooks).await);
        assert!(seen.load(Ordering::SeqCst));
        assert_eq!(processor.response(), Some(&WebhookResponse::ok(MSG_DONATION_EXTENSION_HANDLED)));
    }

    #[tokio::test]
    async fn store_failures_surface_as_internal_errors() {
        // The interpreter resolved a donation that the store no longer has.
        let store = MemoryStore::new();
        let ghost = Donation::new(DonationId(99), DonationStatus::Pending, Money::from(100));
        let interpreter = StubInterpreter::new(EventType::CompletedPayment).with_donation(ghost);
        let mut processor = DonationProcessor::new(store.clone(), interpreter);
        assert!(!processor.run(&WebhookHooks::default()).await);
        assert_eq!(processor.response(), Some(&WebhookResponse::new(500, MSG_DONATION_INTERNAL_ERROR)));
    }
}
