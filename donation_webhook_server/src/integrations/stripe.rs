//! Stripe webhook integration.
//!
//! Stripe pushes event envelopes (`{"id": "evt_...", "type": "charge.succeeded", "data": {"object": {...}}}`) and
//! signs the raw body. The receiver verifies the signature, decodes the envelope and resolves the donation and/or
//! subscription the event refers to; the interpreter then exposes everything through the engine's canonical
//! vocabulary. Donations are matched via the `donation_id` metadata entry Stripe mirrors back to us, falling back to
//! the gateway charge id; subscriptions likewise via `subscription_id` metadata or the gateway subscription id.
use std::collections::HashMap;

use async_trait::async_trait;
use donation_webhook_engine::{
    db_types::{Donation, DonationStatus, EventType, RecurringDonation, SubscriptionStatus, WebhookRequest},
    interpreters::{DonationInterpreter, SubscriptionInterpreter},
    processors::{DonationProcessor, SubscriptionProcessor, WebhookProcessor},
    traits::SubscriptionStore,
    ReceiverRegistry,
    WebhookReceiver,
};
use dwg_common::Money;
use log::*;
use serde::Deserialize;

use crate::{config::StripeConfig, helpers::calculate_hmac};

pub const STRIPE_SOURCE: &str = "stripe";
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";
/// Metadata key under which the Stripe event id is persisted against the donation.
pub const STRIPE_EVENT_ID_META_KEY: &str = "_stripe_event_id";

//--------------------------------------   Payload objects   ---------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: StripeObject,
}

/// The union of the charge / invoice / subscription fields the interpreter cares about. Stripe objects carry far
/// more; everything else is ignored on decode.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeObject {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Set on invoice objects: the charge that paid the invoice.
    #[serde(default)]
    pub charge: Option<String>,
    /// Set on invoice and charge objects belonging to a subscription.
    #[serde(default)]
    pub subscription: Option<String>,
    /// Set on invoice objects: why the invoice was created.
    #[serde(default)]
    pub billing_reason: Option<String>,
    #[serde(default)]
    pub amount_refunded: Option<i64>,
    #[serde(default)]
    pub receipt_url: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Map a Stripe event type onto the canonical vocabulary.
fn canonical_event_type(event: &StripeEvent) -> EventType {
    match event.event_type.as_str() {
        "charge.succeeded" => EventType::CompletedPayment,
        "charge.failed" => EventType::FailedPayment,
        "charge.refunded" => EventType::Refund,
        "charge.expired" => EventType::Cancellation,
        "charge.updated" => EventType::UpdatedDonation,
        "invoice.payment_succeeded" => {
            if event.data.object.billing_reason.as_deref() == Some("subscription_create") {
                EventType::FirstPayment
            } else {
                EventType::Renewal
            }
        },
        "invoice.payment_failed" => EventType::FailedPayment,
        other => EventType::Other(other.to_string()),
    }
}

/// True if the event concerns a subscription and must run through the subscription processor.
fn is_subscription_scoped(event: &StripeEvent) -> bool {
    event.event_type.starts_with("invoice.")
        || event.event_type.starts_with("customer.subscription.")
        || event.data.object.subscription.is_some()
        || event.data.object.metadata.contains_key("subscription_id")
}

//--------------------------------------     Interpreter     ---------------------------------------------------------

/// Canonical view over one decoded Stripe event, with the donation and subscription already resolved.
pub struct StripeInterpreter {
    event: StripeEvent,
    canonical: EventType,
    donation: Option<Donation>,
    subscription: Option<RecurringDonation>,
}

impl StripeInterpreter {
    /// Decode-side constructor: resolves the referenced entities against the store up front, so that the interpreter
    /// itself stays a pure, synchronous view.
    pub async fn resolve<B: SubscriptionStore>(event: StripeEvent, store: &B) -> Self {
        let canonical = canonical_event_type(&event);
        let donation = Self::resolve_donation(&event, store).await;
        let subscription = Self::resolve_subscription(&event, store).await;
        trace!(
            "💳️ Stripe event {} resolved to donation {:?} / subscription {:?}",
            event.id,
            donation.as_ref().map(|d| d.id),
            subscription.as_ref().map(|s| s.id)
        );
        Self { event, canonical, donation, subscription }
    }

    async fn resolve_donation<B: SubscriptionStore>(event: &StripeEvent, store: &B) -> Option<Donation> {
        if let Some(id) = event.data.object.metadata.get("donation_id").and_then(|v| v.parse::<i64>().ok()) {
            match store.fetch_donation(id.into()).await {
                Ok(Some(donation)) => return Some(donation),
                Ok(None) => debug!("💳️ Stripe metadata referenced donation #{id}, which does not exist."),
                Err(e) => warn!("💳️ Could not look up donation #{id}. {e}"),
            }
        }
        let txn_id = Self::transaction_id(event)?;
        match store.fetch_donation_by_transaction_id(&txn_id).await {
            Ok(donation) => donation,
            Err(e) => {
                warn!("💳️ Could not look up donation for transaction {txn_id}. {e}");
                None
            },
        }
    }

    async fn resolve_subscription<B: SubscriptionStore>(
        event: &StripeEvent,
        store: &B,
    ) -> Option<RecurringDonation> {
        if let Some(id) = event.data.object.metadata.get("subscription_id").and_then(|v| v.parse::<i64>().ok()) {
            match store.fetch_subscription(id.into()).await {
                Ok(Some(subscription)) => return Some(subscription),
                Ok(None) => debug!("💳️ Stripe metadata referenced subscription #{id}, which does not exist."),
                Err(e) => warn!("💳️ Could not look up subscription #{id}. {e}"),
            }
        }
        let gw_id = event.data.object.subscription.clone()?;
        match store.fetch_subscription_by_gateway_id(&gw_id).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!("💳️ Could not look up subscription for {gw_id}. {e}");
                None
            },
        }
    }

    pub fn subscription_scoped(&self) -> bool {
        is_subscription_scoped(&self.event)
    }

    /// The charge id behind this event: the object itself for charge events, the paying charge for invoices.
    fn transaction_id(event: &StripeEvent) -> Option<String> {
        if event.event_type.starts_with("charge.") {
            Some(event.data.object.id.clone())
        } else {
            event.data.object.charge.clone()
        }
    }
}

impl DonationInterpreter for StripeInterpreter {
    fn event_type(&self) -> EventType {
        self.canonical.clone()
    }

    fn donation(&self) -> Option<Donation> {
        self.donation.clone()
    }

    fn refund_amount(&self) -> Option<Money> {
        self.event.data.object.amount_refunded.map(Money::from_cents)
    }

    fn refund_log_message(&self) -> Option<String> {
        self.refund_amount().map(|amount| format!("Refunded {amount} via Stripe."))
    }

    fn donation_status(&self) -> Option<DonationStatus> {
        match self.event.data.object.status.as_deref() {
            Some("succeeded") => Some(DonationStatus::Completed),
            Some("failed") => Some(DonationStatus::Failed),
            Some("pending") => Some(DonationStatus::Pending),
            _ => None,
        }
    }

    fn gateway_transaction_id(&self) -> Option<String> {
        Self::transaction_id(&self.event)
    }

    fn gateway_transaction_url(&self) -> Option<String> {
        self.event
            .data
            .object
            .receipt_url
            .clone()
            .or_else(|| self.gateway_transaction_id().map(|id| format!("https://dashboard.stripe.com/payments/{id}")))
    }

    fn logs(&self) -> Vec<String> {
        vec![format!("Stripe webhook received: {} ({}).", self.event.event_type, self.event.id)]
    }

    fn meta(&self) -> HashMap<String, String> {
        [(STRIPE_EVENT_ID_META_KEY.to_string(), self.event.id.clone())].into_iter().collect()
    }
}

impl SubscriptionInterpreter for StripeInterpreter {
    fn recurring_donation(&self) -> Option<RecurringDonation> {
        self.subscription.clone()
    }

    fn is_renewal(&self) -> bool {
        self.canonical == EventType::Renewal
    }

    fn gateway_subscription_id(&self) -> Option<String> {
        self.event.data.object.subscription.clone()
    }

    fn gateway_subscription_url(&self) -> Option<String> {
        self.gateway_subscription_id().map(|id| format!("https://dashboard.stripe.com/subscriptions/{id}"))
    }

    fn subscription_status(&self) -> Option<SubscriptionStatus> {
        match self.event.event_type.as_str() {
            "customer.subscription.deleted" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }
}

//--------------------------------------      Receiver       ---------------------------------------------------------

pub struct StripeReceiver<B> {
    request: WebhookRequest,
    store: B,
    config: StripeConfig,
}

impl<B> StripeReceiver<B>
where B: SubscriptionStore + 'static
{
    pub fn new(request: WebhookRequest, store: B, config: StripeConfig) -> Self {
        Self { request, store, config }
    }

    /// Register the Stripe receiver factory under the `stripe` source.
    pub fn register(registry: &mut ReceiverRegistry, store: B, config: StripeConfig) {
        registry.register(STRIPE_SOURCE, move |request| {
            Some(Box::new(StripeReceiver::new(request, store.clone(), config.clone())) as Box<dyn WebhookReceiver>)
        });
    }
}

#[async_trait]
impl<B> WebhookReceiver for StripeReceiver<B>
where B: SubscriptionStore + 'static
{
    fn is_valid_webhook(&self) -> bool {
        if !self.config.hmac_checks {
            trace!("💳️ Stripe HMAC checks are disabled. Allowing request.");
            return true;
        }
        let Some(signature) = self.request.header(STRIPE_SIGNATURE_HEADER) else {
            warn!("💳️ No Stripe signature found in request. Denying access.");
            return false;
        };
        let expected = calculate_hmac(self.config.webhook_secret.reveal(), self.request.body());
        let valid = signature == expected;
        if !valid {
            warn!("💳️ Invalid Stripe signature found in request. Denying access.");
        }
        valid
    }

    async fn processor(&self) -> Option<Box<dyn WebhookProcessor>> {
        let event: StripeEvent = match self.request.json() {
            Ok(event) => event,
            Err(e) => {
                warn!("💳️ Could not decode Stripe event payload. {e}");
                return None;
            },
        };
        debug!("💳️ Stripe event {} ({}) received.", event.id, event.event_type);
        let interpreter = StripeInterpreter::resolve(event, &self.store).await;
        if interpreter.subscription_scoped() {
            Some(Box::new(SubscriptionProcessor::new(self.store.clone(), interpreter)))
        } else {
            Some(Box::new(DonationProcessor::new(self.store.clone(), interpreter)))
        }
    }

    fn invalid_response_status(&self) -> u16 {
        403
    }

    fn invalid_response_message(&self) -> String {
        "Invalid Stripe webhook signature.".to_string()
    }
}
