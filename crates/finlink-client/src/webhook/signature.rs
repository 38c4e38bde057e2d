/*
[INPUT]:  Webhook secret, timestamp header value, raw body, supplied signature
[OUTPUT]: Hex HMAC-SHA256 signatures and constant-time verification
[POS]:    Webhook layer - cryptographic primitive for callback authenticity
[UPDATE]: When the signed-content layout or signature encoding changes
*/

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// Signed content is `{timestamp}.{body}` with the timestamp exactly as sent.
fn mac_for(secret: &str, timestamp: &str, body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Some(mac)
}

/// Compute the lowercase-hex signature a sender attaches to a webhook
///
/// Returns `None` only if the secret is unusable as an HMAC key.
pub fn sign_webhook(secret: &str, timestamp: i64, body: &[u8]) -> Option<String> {
    let mac = mac_for(secret, &timestamp.to_string(), body)?;
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verify a supplied signature against `HMAC-SHA256(secret, "{timestamp}." + body)`
///
/// Accepts raw hex or `sha256=<hex>`. The comparison is constant time.
pub fn verify_webhook_signature(secret: &str, timestamp: &str, body: &[u8], signature: &str) -> bool {
    let signature = signature.trim();
    let hex_signature = signature.strip_prefix("sha256=").unwrap_or(signature);

    let Ok(supplied) = hex::decode(hex_signature) else {
        return false;
    };

    mac_for(secret, timestamp, body)
        .map(|mac| mac.verify_slice(&supplied).is_ok())
        .unwrap_or(false)
}
