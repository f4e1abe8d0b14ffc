use std::env;

use dwg_common::{parse_boolean_flag, Secret};
use log::*;

const DEFAULT_DWG_HOST: &str = "127.0.0.1";
const DEFAULT_DWG_PORT: u16 = 8480;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address for access logging,
    /// rather than the connection's remote address.
    pub use_x_forwarded_for: bool,
    /// Stripe gateway configuration.
    pub stripe: StripeConfig,
}

#[derive(Clone, Debug, Default)]
pub struct StripeConfig {
    /// The secret used to verify webhook signatures. Shared with the Stripe dashboard.
    pub webhook_secret: Secret<String>,
    /// If false, signature checks are skipped and every delivery is accepted. **DANGER**: only for local testing.
    pub hmac_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DWG_HOST.to_string(),
            port: DEFAULT_DWG_PORT,
            use_x_forwarded_for: false,
            stripe: StripeConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("DWG_HOST").ok().unwrap_or_else(|| DEFAULT_DWG_HOST.into());
        let port = env::var("DWG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for DWG_PORT. {e} Using the default, {DEFAULT_DWG_PORT}, \
                         instead."
                    );
                    DEFAULT_DWG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_DWG_PORT);
        let use_x_forwarded_for = parse_boolean_flag(env::var("DWG_USE_X_FORWARDED_FOR").ok(), false);
        let stripe = StripeConfig::from_env_or_default();
        Self { host, port, use_x_forwarded_for, stripe }
    }
}

impl StripeConfig {
    pub fn new(webhook_secret: &str, hmac_checks: bool) -> Self {
        Self { webhook_secret: Secret::new(webhook_secret.to_string()), hmac_checks }
    }

    pub fn from_env_or_default() -> Self {
        let webhook_secret = env::var("DWG_STRIPE_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            warn!("🪛️ DWG_STRIPE_WEBHOOK_SECRET is not set. Stripe webhook signatures cannot be verified.");
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("DWG_STRIPE_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🪛️ Stripe HMAC checks are disabled. Do not do this in production.");
        }
        Self { webhook_secret: Secret::new(webhook_secret), hmac_checks }
    }
}
