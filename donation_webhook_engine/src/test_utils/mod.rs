//! Test doubles for the webhook pipeline.
use std::collections::HashMap;

use dwg_common::Money;

use crate::{
    db_types::{Donation, DonationStatus, EventType, RecurringDonation, SubscriptionStatus},
    interpreters::{DonationInterpreter, SubscriptionInterpreter},
};

/// A canned interpreter. Implements both interpreter traits; every accessor returns whatever the builder put in.
#[derive(Clone)]
pub struct StubInterpreter {
    pub event: EventType,
    pub donation: Option<Donation>,
    pub subscription: Option<RecurringDonation>,
    pub is_renewal: bool,
    pub refund_amount: Option<Money>,
    pub refund_log_message: Option<String>,
    pub donation_status: Option<DonationStatus>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub gateway_transaction_id: Option<String>,
    pub gateway_transaction_url: Option<String>,
    pub gateway_subscription_id: Option<String>,
    pub gateway_subscription_url: Option<String>,
    pub log_messages: Vec<String>,
    pub meta_entries: HashMap<String, String>,
    pub response_message: Option<String>,
    pub response_status: Option<u16>,
}

impl StubInterpreter {
    pub fn new(event: EventType) -> Self {
        Self {
            event,
            donation: None,
            subscription: None,
            is_renewal: false,
            refund_amount: None,
            refund_log_message: None,
            donation_status: None,
            subscription_status: None,
            gateway_transaction_id: None,
            gateway_transaction_url: None,
            gateway_subscription_id: None,
            gateway_subscription_url: None,
            log_messages: Vec::new(),
            meta_entries: HashMap::new(),
            response_message: None,
            response_status: None,
        }
    }

    pub fn with_donation(mut self, donation: Donation) -> Self {
        self.donation = Some(donation);
        self
    }

    pub fn with_subscription(mut self, subscription: RecurringDonation) -> Self {
        self.subscription = Some(subscription);
        self
    }

    pub fn renewal(mut self) -> Self {
        self.is_renewal = true;
        self
    }

    pub fn with_refund(mut self, amount: Money, message: &str) -> Self {
        self.refund_amount = Some(amount);
        self.refund_log_message = Some(message.to_string());
        self
    }

    pub fn with_donation_status(mut self, status: DonationStatus) -> Self {
        self.donation_status = Some(status);
        self
    }

    pub fn with_transaction(mut self, id: &str, url: &str) -> Self {
        self.gateway_transaction_id = Some(id.to_string());
        if !url.is_empty() {
            self.gateway_transaction_url = Some(url.to_string());
        }
        self
    }

    pub fn with_gateway_subscription(mut self, id: &str, url: &str) -> Self {
        self.gateway_subscription_id = Some(id.to_string());
        if !url.is_empty() {
            self.gateway_subscription_url = Some(url.to_string());
        }
        self
    }

    pub fn with_log(mut self, message: &str) -> Self {
        self.log_messages.push(message.to_string());
        self
    }

    pub fn with_meta(mut self, key: &str, value: &str) -> Self {
        self.meta_entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_response_message(mut self, message: &str) -> Self {
        self.response_message = Some(message.to_string());
        self
    }

    pub fn with_response_status(mut self, status: u16) -> Self {
        self.response_status = Some(status);
        self
    }
}

impl DonationInterpreter for StubInterpreter {
    fn event_type(&self) -> EventType {
        self.event.clone()
    }

    fn donation(&self) -> Option<Donation> {
        self.donation.clone()
    }

    fn refund_amount(&self) -> Option<Money> {
        self.refund_amount
    }

    fn refund_log_message(&self) -> Option<String> {
        self.refund_log_message.clone()
    }

    fn donation_status(&self) -> Option<DonationStatus> {
        self.donation_status
    }

    fn gateway_transaction_id(&self) -> Option<String> {
        self.gateway_transaction_id.clone()
    }

    fn gateway_transaction_url(&self) -> Option<String> {
        self.gateway_transaction_url.clone()
    }

    fn logs(&self) -> Vec<String> {
        self.log_messages.clone()
    }

    fn meta(&self) -> HashMap<String, String> {
        self.meta_entries.clone()
    }

    fn response_message(&self) -> Option<String> {
        self.response_message.clone()
    }

    fn response_status(&self) -> Option<u16> {
        self.response_status
    }
}

impl SubscriptionInterpreter for StubInterpreter {
    fn recurring_donation(&self) -> Option<RecurringDonation> {
        self.subscription.clone()
    }

    fn is_renewal(&self) -> bool {
        self.is_renewal
    }

    fn gateway_subscription_id(&self) -> Option<String> {
        self.gateway_subscription_id.clone()
    }

    fn gateway_subscription_url(&self) -> Option<String> {
        self.gateway_subscription_url.clone()
    }

    fn subscription_status(&self) -> Option<SubscriptionStatus> {
        self.subscription_status
    }
}
