//! Receivers and the receiver registry.
//!
//! A receiver is the per-gateway front door: it checks the authenticity and shape of a raw request (signature,
//! shared secret, header layout) and, if the request is sound, builds the processor wired with the right interpreter
//! for it. The registry maps webhook source identifiers to receiver factories. It is populated during application
//! bootstrap and injected into the [`crate::WebhookDispatcher`]; registrations are never removed at runtime.
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use log::*;

use crate::{db_types::WebhookRequest, processors::WebhookProcessor};

/// Per-gateway adapter for one inbound request.
#[async_trait]
pub trait WebhookReceiver: Send + Sync {
    /// Check the authenticity and shape of the request. The algorithm is gateway-specific: HMAC signatures, shared
    /// secrets or IP checks, depending on what the gateway supports.
    fn is_valid_webhook(&self) -> bool;

    /// Build the processor (with its interpreter) for this request, or `None` if construction is impossible, e.g.
    /// because the payload cannot be decoded at all.
    async fn processor(&self) -> Option<Box<dyn WebhookProcessor>>;

    /// HTTP status to respond with when [`Self::is_valid_webhook`] is false.
    fn invalid_response_status(&self) -> u16 {
        403
    }

    /// Response body to send when [`Self::is_valid_webhook`] is false.
    fn invalid_response_message(&self) -> String {
        "Invalid webhook.".to_string()
    }
}

/// A factory that builds a receiver for one request, or declines by returning `None`.
pub type ReceiverFactory = Arc<dyn Fn(WebhookRequest) -> Option<Box<dyn WebhookReceiver>> + Send + Sync>;

/// Maps webhook source identifiers to receiver factories.
#[derive(Default, Clone)]
pub struct ReceiverRegistry {
    receivers: HashMap<String, ReceiverFactory>,
}

impl ReceiverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver factory for a webhook source. Registering the same source twice overwrites the earlier
    /// factory; the last write wins.
    pub fn register<F>(&mut self, source: &str, factory: F) -> &mut Self
    where F: Fn(WebhookRequest) -> Option<Box<dyn WebhookReceiver>> + Send + Sync + 'static {
        if self.receivers.insert(source.to_string(), Arc::new(factory)).is_some() {
            debug!("📖️ Receiver registration for {source} was replaced.");
        }
        self
    }

    /// Instantiate the receiver for the request's source. Returns `None` both when no factory is registered for the
    /// source and when the factory declines to build a receiver; callers cannot (and should not) tell the two
    /// apart.
    pub fn get(&self, request: WebhookRequest) -> Option<Box<dyn WebhookReceiver>> {
        let factory = self.receivers.get(request.source())?;
        factory(request)
    }

    /// The registered source identifiers, for startup logging.
    pub fn sources(&self) -> Vec<&str> {
        self.receivers.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct NullReceiver {
        tag: &'static str,
    }

    #[async_trait]
    impl WebhookReceiver for NullReceiver {
        fn is_valid_webhook(&self) -> bool {
            false
        }

        async fn processor(&self) -> Option<Box<dyn WebhookProcessor>> {
            None
        }

        fn invalid_response_message(&self) -> String {
            self.tag.to_string()
        }
    }

    fn request(source: &str) -> WebhookRequest {
        WebhookRequest::new(source, HashMap::new(), Vec::new())
    }

    #[test]
    fn unknown_sources_resolve_to_none() {
        let registry = ReceiverRegistry::new();
        assert!(registry.get(request("paypal")).is_none());
    }

    #[test]
    fn declining_factories_resolve_to_none() {
        let mut registry = ReceiverRegistry::new();
        registry.register("stripe", |_req| None);
        assert!(registry.get(request("stripe")).is_none());
    }

    #[test]
    fn registration_is_last_write_wins() {
        let mut registry = ReceiverRegistry::new();
        registry.register("stripe", |_req| {
            Some(Box::new(NullReceiver { tag: "first" }) as Box<dyn WebhookReceiver>)
        });
        registry.register("stripe", |_req| {
            Some(Box::new(NullReceiver { tag: "second" }) as Box<dyn WebhookReceiver>)
        });
        let receiver = registry.get(request("stripe")).unwrap();
        assert_eq!(receiver.invalid_response_message(), "second");
        assert_eq!(registry.sources(), vec!["stripe"]);
    }

    #[test]
    fn default_invalid_response() {
        let receiver = NullReceiver { tag: "x" };
        assert_eq!(receiver.invalid_response_status(), 403);
        assert!(!receiver.is_valid_webhook());
    }
}
