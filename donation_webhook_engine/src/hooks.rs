//! Extension hooks for the webhook pipeline.
//!
//! Hooks are plain closures, registered once at bootstrap and carried by value into the dispatcher. The engine does
//! not inspect the pre-dispatch hook's effect; the fallback hooks act as filters that may claim an event type the
//! processors have no built-in handler for, by returning an updated `handled` flag.
use std::sync::Arc;

use crate::{
    db_types::{Donation, RecurringDonation},
    interpreters::{DonationInterpreter, SubscriptionInterpreter},
};

/// Runs before the registry lookup for every inbound request, with the webhook source as argument.
pub type PreDispatchHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Fallback for donation event types without a built-in handler. Receives the current `handled` flag, the resolved
/// donation and the interpreter, and returns the possibly-updated flag.
pub type DonationFallbackHook = Arc<dyn Fn(bool, &Donation, &dyn DonationInterpreter) -> bool + Send + Sync>;

/// Fallback for subscription event types without a built-in handler. Note that this one receives the recurring
/// donation, not the donation.
pub type SubscriptionFallbackHook =
    Arc<dyn Fn(bool, &RecurringDonation, &dyn SubscriptionInterpreter) -> bool + Send + Sync>;

#[derive(Default, Clone)]
pub struct WebhookHooks {
    pub before_dispatch: Option<PreDispatchHook>,
    pub on_unhandled_donation_event: Option<DonationFallbackHook>,
    pub on_unhandled_subscription_event: Option<SubscriptionFallbackHook>,
}

impl WebhookHooks {
    pub fn before_dispatch<F>(&mut self, f: F) -> &mut Self
    where F: Fn(&str) + Send + Sync + 'static {
        self.before_dispatch = Some(Arc::new(f));
        self
    }

    pub fn on_unhandled_donation_event<F>(&mut self, f: F) -> &mut Self
    where F: Fn(bool, &Donation, &dyn DonationInterpreter) -> bool + Send + Sync + 'static {
        self.on_unhandled_donation_event = Some(Arc::new(f));
        self
    }

    pub fn on_unhandled_subscription_event<F>(&mut self, f: F) -> &mut Self
    where F: Fn(bool, &RecurringDonation, &dyn SubscriptionInterpreter) -> bool + Send + Sync + 'static {
        self.on_unhandled_subscription_event = Some(Arc::new(f));
        self
    }
}
