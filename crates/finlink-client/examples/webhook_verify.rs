/*
[INPUT]:  A shared secret and a sample payload
[OUTPUT]: Verification outcomes for a signed and a tampered delivery
[POS]:    Examples - webhook signing and verification demonstration
[UPDATE]: When webhook headers or verification rules change
*/

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use finlink_client::webhook::{HandlerError, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use finlink_client::*;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;

#[tokio::main]
async fn main() {
    println!("=== finlink Webhook Verification Example ===\n");

    let secret = "whsec_example";
    let verifier = match WebhookVerifier::new(WebhookConfig::new(secret)) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Invalid webhook config: {}", e);
            return;
        }
    };
    let receiver = WebhookReceiver::new(verifier, |metadata: WebhookMetadata, payload: Bytes| async move {
        println!("  handler got {} ({} bytes)", metadata.event_type, payload.len());
        Ok::<(), HandlerError>(())
    });

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    let body = Bytes::from_static(br#"{"event":"payment.settled","amount":1250}"#);
    let Some(signature) = sign_webhook(secret, now, &body) else {
        eprintln!("Failed to sign payload");
        return;
    };

    let mut headers = HeaderMap::new();
    headers.insert(TIMESTAMP_HEADER, HeaderValue::from(now));
    if let Ok(value) = HeaderValue::from_str(&signature) {
        headers.insert(SIGNATURE_HEADER, value);
    }

    let dispatch = receiver.dispatch(&Method::POST, &headers, body);
    println!("✓ Signed delivery -> {} {}", dispatch.response.status, dispatch.response.body);
    if let Some(task) = dispatch.handler {
        let _ = task.await;
    }

    let tampered = Bytes::from_static(br#"{"event":"payment.settled","amount":9999}"#);
    let response = receiver.receive(&Method::POST, &headers, tampered);
    println!("✓ Tampered delivery -> {} {}", response.status, response.body);
}
