use std::{collections::HashMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use dwg_common::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------     DonationId      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DonationId(pub i64);

impl Display for DonationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for DonationId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------   SubscriptionId    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub i64);

impl Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubscriptionId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

//--------------------------------------   DonationStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    /// The donation has been created, but no payment confirmation has been received.
    Pending,
    /// The payment for this donation has been received in full.
    Completed,
    /// The gateway reported the payment as failed.
    Failed,
    /// The donation was cancelled by the donor or the gateway.
    Cancelled,
    /// The payment was refunded, in part or in full.
    Refunded,
}

impl Display for DonationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DonationStatus::Pending => write!(f, "pending"),
            DonationStatus::Completed => write!(f, "completed"),
            DonationStatus::Failed => write!(f, "failed"),
            DonationStatus::Cancelled => write!(f, "cancelled"),
            DonationStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct InvalidStatusError(String);

impl FromStr for DonationStatus {
    type Err = InvalidStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DonationStatus::Pending),
            "completed" => Ok(DonationStatus::Completed),
            "failed" => Ok(DonationStatus::Failed),
            "cancelled" => Ok(DonationStatus::Cancelled),
            "refunded" => Ok(DonationStatus::Refunded),
            _ => Err(InvalidStatusError(s.to_string())),
        }
    }
}

//-------------------------------------- SubscriptionStatus  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// The subscription has been created but the first payment has not been confirmed yet.
    Pending,
    /// The subscription is active and will spawn renewal donations.
    Active,
    /// The subscription has been cancelled. No further renewals are expected.
    Cancelled,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Pending => write!(f, "pending"),
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = InvalidStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            _ => Err(InvalidStatusError(s.to_string())),
        }
    }
}

//--------------------------------------     EventType       ---------------------------------------------------------
/// The canonical event vocabulary. Interpreters translate gateway payloads into one of these variants; the processors
/// dispatch on them. Anything a gateway sends that has no built-in handler lands in [`EventType::Other`] and is
/// routed to the fallback hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    Refund,
    FailedPayment,
    CompletedPayment,
    Cancellation,
    UpdatedDonation,
    Renewal,
    FirstPayment,
    Other(String),
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Refund => write!(f, "refund"),
            EventType::FailedPayment => write!(f, "failed_payment"),
            EventType::CompletedPayment => write!(f, "completed_payment"),
            EventType::Cancellation => write!(f, "cancellation"),
            EventType::UpdatedDonation => write!(f, "updated_donation"),
            EventType::Renewal => write!(f, "renewal"),
            EventType::FirstPayment => write!(f, "first_payment"),
            EventType::Other(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for EventType {
    fn from(value: &str) -> Self {
        match value {
            "refund" => EventType::Refund,
            "failed_payment" => EventType::FailedPayment,
            "completed_payment" => EventType::CompletedPayment,
            "cancellation" => EventType::Cancellation,
            "updated_donation" => EventType::UpdatedDonation,
            "renewal" => EventType::Renewal,
            "first_payment" => EventType::FirstPayment,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

//--------------------------------------      Donation       ---------------------------------------------------------
/// A single payment record. Owned by the backing store; the engine only ever mutates donations through
/// [`crate::traits::DonationStore`] and never constructs them itself, except indirectly via
/// [`crate::traits::SubscriptionStore::create_renewal_donation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub id: DonationId,
    pub status: DonationStatus,
    pub amount: Money,
    /// The subscription this donation belongs to, if it was spawned by a recurring donation.
    pub subscription_id: Option<SubscriptionId>,
    pub gateway_transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Donation {
    pub fn new(id: DonationId, status: DonationStatus, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id,
            status,
            amount,
            subscription_id: None,
            gateway_transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Display for Donation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Donation #{} ({}, {})", self.id, self.status, self.amount)
    }
}

//--------------------------------------  RecurringDonation  ---------------------------------------------------------
/// A recurring-payment agreement that periodically spawns renewal donations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringDonation {
    pub id: SubscriptionId,
    pub status: SubscriptionStatus,
    pub amount: Money,
    pub gateway_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringDonation {
    pub fn new(id: SubscriptionId, status: SubscriptionStatus, amount: Money) -> Self {
        let now = Utc::now();
        Self { id, status, amount, gateway_subscription_id: None, created_at: now, updated_at: now }
    }
}

impl Display for RecurringDonation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subscription #{} ({}, {})", self.id, self.status, self.amount)
    }
}

//--------------------------------------   WebhookRequest    ---------------------------------------------------------
/// The raw inbound notification, as handed to the engine by the HTTP layer. Header names are stored lower-cased so
/// that lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    source: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl WebhookRequest {
    pub fn new<S: Into<String>>(source: S, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let headers = headers.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect();
        Self { source: source.into(), headers, body }
    }

    /// The webhook source identifier, e.g. `stripe`. Used for the registry lookup.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|s| s.as_str())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decode the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

//--------------------------------------   WebhookResponse   ---------------------------------------------------------
/// The HTTP response descriptor a processor run produces. This is the sole output contract of a processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: u16,
    pub message: String,
}

impl WebhookResponse {
    pub fn new<S: Into<String>>(status: u16, message: S) -> Self {
        Self { status, message: message.into() }
    }

    pub fn ok<S: Into<String>>(message: S) -> Self {
        Self::new(200, message)
    }
}

impl Display for WebhookResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn event_type_round_trip() {
        for tag in ["refund", "failed_payment", "completed_payment", "cancellation", "updated_donation", "renewal",
            "first_payment"]
        {
            let event = EventType::from(tag);
            assert!(!matches!(event, EventType::Other(_)), "{tag} should have a dedicated variant");
            assert_eq!(event.to_string(), tag);
        }
        let event = EventType::from("charge.disputed");
        assert_eq!(event, EventType::Other("charge.disputed".to_string()));
        assert_eq!(event.to_string(), "charge.disputed");
    }

    #[test]
    fn donation_status_parsing() {
        assert_eq!("Completed".parse::<DonationStatus>().unwrap(), DonationStatus::Completed);
        assert_eq!(" refunded ".parse::<DonationStatus>().unwrap(), DonationStatus::Refunded);
        assert!("paid".parse::<DonationStatus>().is_err());
    }

    #[test]
    fn request_headers_are_case_insensitive() {
        let headers = [("Stripe-Signature".to_string(), "abc".to_string())].into_iter().collect();
        let req = WebhookRequest::new("stripe", headers, b"{}".to_vec());
        assert_eq!(req.header("stripe-signature"), Some("abc"));
        assert_eq!(req.header("STRIPE-SIGNATURE"), Some("abc"));
        assert_eq!(req.header("x-other"), None);
        assert_eq!(req.source(), "stripe");
    }
}
