use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use donation_webhook_engine::{traits::SubscriptionStore, MemoryStore, ReceiverRegistry, WebhookDispatcher};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    integrations::stripe::StripeReceiver,
    routes::{health, incoming_webhook},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    // TODO: swap the in-memory store for a persistent backend once one lands.
    let store = MemoryStore::new();
    let dispatcher = build_dispatcher(store, &config);
    let srv = create_server_instance(config, dispatcher)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Wire every supported gateway integration into a receiver registry and build the dispatcher around it. The
/// registry is fixed from this point on; new sources require a restart.
pub fn build_dispatcher<B>(store: B, config: &ServerConfig) -> WebhookDispatcher
where B: SubscriptionStore + 'static {
    let mut registry = ReceiverRegistry::new();
    StripeReceiver::register(&mut registry, store, config.stripe.clone());
    WebhookDispatcher::new(registry)
}

pub fn create_server_instance(config: ServerConfig, dispatcher: WebhookDispatcher) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let dispatcher = web::Data::new(dispatcher);
    info!("🚀️ Accepting webhooks for sources: {}", dispatcher.registry().sources().join(", "));
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dwg::access_log"))
            .app_data(dispatcher.clone())
            .app_data(web::Data::new(config.clone()))
            .service(health)
            .service(incoming_webhook)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
