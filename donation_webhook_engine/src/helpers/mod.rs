//! Small helpers shared across the pipeline, chiefly the meta-URL persistence used by the processors.
use crate::{
    db_types::{DonationId, SubscriptionId},
    traits::{DonationStore, StoreError, SubscriptionStore},
};

/// Metadata key under which the gateway's transaction dashboard URL is stored.
pub const GATEWAY_TRANSACTION_URL_KEY: &str = "_gateway_transaction_url";
/// Metadata key under which the gateway's subscription dashboard URL is stored.
pub const GATEWAY_SUBSCRIPTION_URL_KEY: &str = "_gateway_subscription_url";

/// Sanitize a value before persisting it as entity metadata. Strips surrounding whitespace and control characters.
pub fn sanitize_meta_value(value: &str) -> String {
    value.trim().chars().filter(|c| !c.is_control()).collect()
}

/// Persist the gateway's transaction URL against the donation under [`GATEWAY_TRANSACTION_URL_KEY`].
///
/// Returns `Ok(false)` without touching the store if the URL is absent or sanitizes to an empty string.
pub async fn set_gateway_transaction_url<B: DonationStore>(
    store: &B,
    donation: DonationId,
    url: Option<String>,
) -> Result<bool, StoreError> {
    let url = match url {
        Some(u) => sanitize_meta_value(&u),
        None => return Ok(false),
    };
    if url.is_empty() {
        return Ok(false);
    }
    store.set_donation_meta(donation, GATEWAY_TRANSACTION_URL_KEY, &url).await?;
    Ok(true)
}

/// Persist the gateway's subscription URL against the recurring donation under [`GATEWAY_SUBSCRIPTION_URL_KEY`].
///
/// Returns `Ok(false)` without touching the store if the URL is absent or sanitizes to an empty string.
pub async fn set_gateway_subscription_url<B: SubscriptionStore>(
    store: &B,
    subscription: SubscriptionId,
    url: Option<String>,
) -> Result<bool, StoreError> {
    let url = match url {
        Some(u) => sanitize_meta_value(&u),
        None => return Ok(false),
    };
    if url.is_empty() {
        return Ok(false);
    }
    store.set_subscription_meta(subscription, GATEWAY_SUBSCRIPTION_URL_KEY, &url).await?;
    Ok(true)
}
