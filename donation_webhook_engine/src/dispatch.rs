//! The end-to-end dispatch entrypoint.
//!
//! One [`WebhookDispatcher`] serves the whole process. It owns the (immutable-after-bootstrap) receiver registry and
//! the extension hooks, and drives the full lifecycle of one inbound notification: pre-dispatch hook, registry
//! lookup, validity check, processor construction and the processor run itself.
use log::*;

use crate::{
    db_types::{WebhookRequest, WebhookResponse},
    hooks::WebhookHooks,
    receivers::ReceiverRegistry,
};

pub struct WebhookDispatcher {
    registry: ReceiverRegistry,
    hooks: WebhookHooks,
}

impl WebhookDispatcher {
    pub fn new(registry: ReceiverRegistry) -> Self {
        Self { registry, hooks: WebhookHooks::default() }
    }

    pub fn with_hooks(registry: ReceiverRegistry, hooks: WebhookHooks) -> Self {
        Self { registry, hooks }
    }

    pub fn registry(&self) -> &ReceiverRegistry {
        &self.registry
    }

    /// Handle one inbound notification.
    ///
    /// Returns `None` when no receiver is registered for the source (or its factory declined): the event is "not our
    /// webhook" and the caller's own default response applies. In every other case the returned response descriptor
    /// terminates the request.
    pub async fn handle(&self, request: WebhookRequest) -> Option<WebhookResponse> {
        let source = request.source().to_string();
        trace!("📨️ Webhook delivery from source {source}");
        if let Some(hook) = &self.hooks.before_dispatch {
            hook(&source);
        }

        let Some(receiver) = self.registry.get(request) else {
            debug!("📨️ No receiver is registered for webhook source {source}. Ignoring the delivery.");
            return None;
        };

        if !receiver.is_valid_webhook() {
            warn!("📨️ Invalid webhook received for source {source}.");
            return Some(WebhookResponse::new(
                receiver.invalid_response_status(),
                receiver.invalid_response_message(),
            ));
        }

        let Some(mut processor) = receiver.processor().await else {
            error!("📨️ Receiver for {source} could not produce a processor.");
            return Some(WebhookResponse::new(500, format!("Missing webhook processor for {source}.")));
        };

        let processed = processor.process(&self.hooks).await;
        if !processed {
            debug!("📨️ Webhook event from {source} was not processed.");
        }
        Some(WebhookResponse::new(processor.response_status(), processor.response_message()))
    }
}
