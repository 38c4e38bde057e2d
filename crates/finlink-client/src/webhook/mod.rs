/*
[INPUT]:  Inbound platform callbacks and the shared webhook secret
[OUTPUT]: Verified events dispatched to a user handler
[POS]:    Webhook layer - receive side of the platform integration
[UPDATE]: When adding verification rules or handler hooks
*/

pub mod receiver;
pub mod signature;
pub mod verifier;

pub use receiver::{Dispatch, HandlerError, WebhookHandler, WebhookReceiver, WebhookResponse};
pub use signature::{sign_webhook, verify_webhook_signature};
pub use verifier::{
    WebhookConfig, WebhookConfigError, WebhookError, WebhookMetadata, WebhookVerifier,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_TOLERANCE, DELIVERY_ID_HEADER, EVENT_ID_HEADER,
    EVENT_TYPE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
