/*
[INPUT]:  Raw inbound delivery (method, headers, body) and a user handler
[OUTPUT]: Immediate HTTP response; handler runs asynchronously on success
[POS]:    Webhook layer - verify-then-dispatch front door for callbacks
[UPDATE]: When response bodies or dispatch semantics change
*/

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info_span, warn, Instrument};

use super::verifier::{WebhookError, WebhookMetadata, WebhookVerifier};

/// Error a handler may return; it is logged, never sent to the platform
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// User callback for verified deliveries
#[async_trait]
pub trait WebhookHandler: Send + Sync + 'static {
    async fn on_event(&self, metadata: WebhookMetadata, payload: Bytes) -> Result<(), HandlerError>;
}

#[async_trait]
impl<F, Fut> WebhookHandler for F
where
    F: Fn(WebhookMetadata, Bytes) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn on_event(&self, metadata: WebhookMetadata, payload: Bytes) -> Result<(), HandlerError> {
        (self)(metadata, payload).await
    }
}

/// Status and JSON body to send back to the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl WebhookResponse {
    fn accepted(metadata: &WebhookMetadata) -> Self {
        Self {
            status: StatusCode::OK,
            body: json!({
                "status": "success",
                "event_id": metadata.event_id,
                "delivery_id": metadata.delivery_id,
            }),
        }
    }

    /// Response for a delivery rejected before or during verification
    pub fn from_error(err: &WebhookError) -> Self {
        Self {
            status: err.status_code(),
            body: json!({
                "status": "error",
                "message": err.public_message(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Outcome of one delivery: the response plus the handler task, if any
#[derive(Debug)]
pub struct Dispatch {
    pub response: WebhookResponse,
    pub handler: Option<JoinHandle<()>>,
}

/// Verifies deliveries and hands accepted ones to the handler
///
/// The response is returned as soon as verification finishes; the handler
/// runs on its own Tokio task and its failures are only logged. Handler
/// tasks are tracked so a server can `drain` them before exiting: the
/// platform will not redeliver an event it already saw acknowledged.
pub struct WebhookReceiver<H> {
    verifier: Arc<WebhookVerifier>,
    handler: Arc<H>,
    tasks: TaskTracker,
}

impl<H> Clone for WebhookReceiver<H> {
    fn clone(&self) -> Self {
        Self {
            verifier: Arc::clone(&self.verifier),
            handler: Arc::clone(&self.handler),
            tasks: self.tasks.clone(),
        }
    }
}

impl<H: WebhookHandler> WebhookReceiver<H> {
    pub fn new(verifier: WebhookVerifier, handler: H) -> Self {
        Self {
            verifier: Arc::new(verifier),
            handler: Arc::new(handler),
            tasks: TaskTracker::new(),
        }
    }

    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    /// Handler tasks still running
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every handler task spawned so far
    ///
    /// Deliveries received afterwards are still dispatched and tracked.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// Verify and dispatch, returning only the response
    pub fn receive(&self, method: &Method, headers: &HeaderMap, body: Bytes) -> WebhookResponse {
        self.dispatch(method, headers, body).response
    }

    /// Verify and dispatch, also returning the spawned handler task
    ///
    /// Outside a Tokio runtime a verified delivery is answered with 500 so
    /// the platform retries it later.
    pub fn dispatch(&self, method: &Method, headers: &HeaderMap, body: Bytes) -> Dispatch {
        let metadata = match self.verifier.verify(method, headers, &body) {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(error = %err, status = %err.status_code(), "webhook rejected");
                return Dispatch {
                    response: WebhookResponse::from_error(&err),
                    handler: None,
                };
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            let err = WebhookError::NoRuntime;
            error!(error = %err, event_id = %metadata.event_id, "webhook not dispatched");
            return Dispatch {
                response: WebhookResponse::from_error(&err),
                handler: None,
            };
        };

        let response = WebhookResponse::accepted(&metadata);
        let span = info_span!(
            "webhook_event",
            event_id = %metadata.event_id,
            event_type = %metadata.event_type,
            delivery_id = %metadata.delivery_id,
        );
        let handler = Arc::clone(&self.handler);

        let task = self.tasks.spawn_on(
            async move {
                match handler.on_event(metadata, body).await {
                    Ok(()) => debug!("webhook handled"),
                    Err(err) => warn!(error = %err, "webhook handler failed"),
                }
            }
            .instrument(span),
            &runtime,
        );

        Dispatch {
            response,
            handler: Some(task),
        }
    }
}
