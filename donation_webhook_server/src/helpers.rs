use std::{net::IpAddr, str::FromStr};

use actix_web::HttpRequest;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

/// Get the remote IP address from the request: the `X-Forwarded-For` header iif `use_x_forwarded_for` is set to true
/// in the configuration, otherwise the peer address from the connection info.
pub fn get_remote_ip(req: &HttpRequest, use_x_forwarded_for: bool) -> Option<IpAddr> {
    let mut result = None;
    if use_x_forwarded_for {
        result =
            req.headers().get("X-Forwarded-For").and_then(|v| v.to_str().ok()).and_then(|s| IpAddr::from_str(s).ok());
        if let Some(ip) = result {
            trace!("Using X-Forwarded-For header for remote address: {ip}");
        }
    }
    result.or_else(|| {
        let peer_addr = req.connection_info().peer_addr().map(|a| a.to_string());
        trace!("Using Peer address for remote address: {peer_addr:?}");
        peer_addr.and_then(|s| IpAddr::from_str(&s).ok())
    })
}

/// Calculate the base64-encoded HMAC-SHA256 signature for `data` using `secret` as the key. This is the signature
/// scheme the gateway integrations compare webhook signature headers against.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    // HMAC accepts keys of any length, so new_from_slice cannot fail here.
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hmac_is_stable_and_key_sensitive() {
        let sig = calculate_hmac("whsec_test", b"{\"id\":\"evt_1\"}");
        assert_eq!(sig, calculate_hmac("whsec_test", b"{\"id\":\"evt_1\"}"));
        assert_ne!(sig, calculate_hmac("whsec_other", b"{\"id\":\"evt_1\"}"));
        assert_ne!(sig, calculate_hmac("whsec_test", b"{\"id\":\"evt_2\"}"));
    }
}
