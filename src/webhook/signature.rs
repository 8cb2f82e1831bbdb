//! `Mux-Signature` verification: `t=<unix seconds>,v1=<hex hmac-sha256>`,
//! where the MAC covers `"{t}.{raw body}"`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::WebhookError;

pub const HEADER: &str = "Mux-Signature";

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, timestamp: i64, body: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Builds a header value for `body`, as Mux would send it.
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
    let digest = mac_for(secret, timestamp, body)?.finalize().into_bytes();
    Ok(format!("t={},v1={}", timestamp, hex::encode(digest)))
}

pub fn verify(
    header: Option<&str>,
    body: &[u8],
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), WebhookError> {
    let header = header.ok_or(WebhookError::MissingSignature)?;

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(WebhookError::InvalidSignature)?;
    if now.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
        return Err(WebhookError::StaleSignature);
    }

    let matched = candidates.iter().any(|candidate| {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        mac_for(secret, timestamp, body)
            .map(|mac| mac.verify_slice(&expected).is_ok())
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(WebhookError::InvalidSignature)
    }
}
