//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a line or two MUST go into a separate module.
//! Keep this module neat and tidy 🙏
//!
//! The webhook route is deliberately dumb: it packages the raw request up for the engine and translates the engine's
//! response descriptor back into HTTP. All gateway-specific validation and processing lives behind the dispatcher.
use actix_web::{get, http::StatusCode, post, web, HttpRequest, HttpResponse, Responder};
use donation_webhook_engine::{db_types::WebhookRequest, WebhookDispatcher};
use log::*;

use crate::{config::ServerConfig, helpers::get_remote_ip};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------  Webhooks ----------------------------------------------------
/// The single entry point for gateway notifications. The path segment names the source, e.g. `/webhook/stripe`.
#[post("/webhook/{source}")]
pub async fn incoming_webhook(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
    dispatcher: web::Data<WebhookDispatcher>,
    config: web::Data<ServerConfig>,
) -> HttpResponse {
    let source = path.into_inner();
    let peer = get_remote_ip(&req, config.use_x_forwarded_for);
    debug!("📬️ Webhook for {source} received from {peer:?}");
    let headers = req
        .headers()
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect();
    let request = WebhookRequest::new(source.as_str(), headers, body.to_vec());
    match dispatcher.handle(request).await {
        Some(response) => {
            debug!("📬️ Webhook for {source} answered with {response}");
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::build(status).body(response.message)
        },
        None => {
            info!("📬️ Webhook for unknown source {source} dropped.");
            HttpResponse::NotFound().body("Unknown webhook source.")
        },
    }
}
