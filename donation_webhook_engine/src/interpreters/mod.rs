//! Interpreter contracts.
//!
//! An interpreter is a per-gateway adapter that has already parsed a raw webhook payload and exposes it through a
//! fixed, gateway-agnostic vocabulary of pure query operations. Every accessor returns a value or `None`; an
//! interpreter never fails for a "not applicable" case. Entity resolution (matching a payload to a donation or
//! subscription record) happens while the interpreter is being built by its receiver, so that these accessors stay
//! synchronous and cheap.
//!
//! Isolating payload semantics behind this trait pair is what keeps the processors gateway-agnostic: supporting a new
//! payment gateway means writing a new interpreter (and receiver), nothing else.
use std::collections::HashMap;

use dwg_common::Money;

use crate::db_types::{Donation, DonationStatus, EventType, RecurringDonation, SubscriptionStatus};

/// The query vocabulary for donation webhooks.
pub trait DonationInterpreter: Send + Sync {
    /// The canonical event tag used for dispatch. Always present.
    fn event_type(&self) -> EventType;

    /// The donation this event was matched to, or `None` if the payload could not be matched.
    fn donation(&self) -> Option<Donation>;

    fn refund_amount(&self) -> Option<Money> {
        None
    }

    fn refund_log_message(&self) -> Option<String> {
        None
    }

    /// The donation status carried by the payload, for `updated_donation` events.
    fn donation_status(&self) -> Option<DonationStatus> {
        None
    }

    fn gateway_transaction_id(&self) -> Option<String> {
        None
    }

    fn gateway_transaction_url(&self) -> Option<String> {
        None
    }

    /// Human-readable messages to append to the entity's audit log, in order. Each call produces the sequence afresh.
    fn logs(&self) -> Vec<String> {
        Vec::new()
    }

    /// Metadata entries to persist verbatim against the donation. Insertion order is irrelevant; the store applies
    /// overwrite semantics per key.
    fn meta(&self) -> HashMap<String, String> {
        HashMap::new()
    }

    /// Optional override of the response message the processor would otherwise send.
    fn response_message(&self) -> Option<String> {
        None
    }

    /// Optional override of the response status the processor would otherwise send.
    fn response_status(&self) -> Option<u16> {
        None
    }
}

/// The query vocabulary for subscription webhooks.
pub trait SubscriptionInterpreter: DonationInterpreter {
    /// The recurring donation this event was matched to, or `None` if the payload could not be matched.
    fn recurring_donation(&self) -> Option<RecurringDonation>;

    /// True if this event represents a renewal charge, which may have no pre-existing donation attached.
    fn is_renewal(&self) -> bool {
        false
    }

    fn gateway_subscription_id(&self) -> Option<String> {
        None
    }

    fn gateway_subscription_url(&self) -> Option<String> {
        None
    }

    fn subscription_status(&self) -> Option<SubscriptionStatus> {
        None
    }
}
