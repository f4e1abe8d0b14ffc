use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use donation_webhook_engine::MemoryStore;

use crate::{
    config::{ServerConfig, StripeConfig},
    helpers::calculate_hmac,
    routes::{health, incoming_webhook},
    server::build_dispatcher,
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

pub fn test_config() -> ServerConfig {
    ServerConfig { stripe: StripeConfig::new(TEST_WEBHOOK_SECRET, true), ..Default::default() }
}

pub fn sign(body: &str) -> String {
    calculate_hmac(TEST_WEBHOOK_SECRET, body.as_bytes())
}

/// Deliver one webhook to an app wired against `store` and return the response the gateway would see.
pub async fn post_webhook(
    store: MemoryStore,
    source: &str,
    body: &str,
    signature: Option<&str>,
) -> (StatusCode, String) {
    let config = test_config();
    let dispatcher = build_dispatcher(store, &config);
    let app = App::new()
        .app_data(web::Data::new(dispatcher))
        .app_data(web::Data::new(config))
        .service(health)
        .service(incoming_webhook);
    let service = test::init_service(app).await;
    let mut req = TestRequest::post().uri(&format!("/webhook/{source}")).set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header(("Stripe-Signature", sig));
    }
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}
