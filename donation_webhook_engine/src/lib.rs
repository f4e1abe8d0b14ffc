//! Donation Webhook Engine
//!
//! The Donation Webhook Engine converts asynchronous payment-gateway notifications (webhooks / IPNs) into idempotent
//! state transitions on donation and recurring-donation records. It is gateway-agnostic.
//!
//! The pipeline has three stages:
//! 1. A [`receivers::WebhookReceiver`] validates the authenticity and shape of an inbound request for a specific
//!    gateway, and wires up the interpreter and processor for it.
//! 2. An interpreter ([`interpreters::DonationInterpreter`] or [`interpreters::SubscriptionInterpreter`]) normalises
//!    the gateway-specific payload into the canonical event vocabulary ([`db_types::EventType`] plus a fixed set of
//!    accessors).
//! 3. A processor ([`processors::DonationProcessor`] or [`processors::SubscriptionProcessor`]) drives the donation /
//!    subscription state machine and produces a [`db_types::WebhookResponse`].
//!
//! Persistence is an external collaborator. Backends implement the [`traits::DonationStore`] and
//! [`traits::SubscriptionStore`] traits; the engine never writes entities directly. A reference in-memory backend
//! ([`MemoryStore`]) is provided for demos and tests.
//!
//! Extension points are explicit: a [`hooks::WebhookHooks`] value, built once at bootstrap, carries a pre-dispatch
//! hook and fallback hooks for event types the processors have no built-in handler for.
pub mod db_types;
pub mod dispatch;
pub mod helpers;
pub mod hooks;
pub mod interpreters;
mod memory;
pub mod processors;
pub mod receivers;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use dispatch::WebhookDispatcher;
pub use memory::MemoryStore;
pub use receivers::{ReceiverRegistry, WebhookReceiver};
