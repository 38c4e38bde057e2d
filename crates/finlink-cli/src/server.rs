/*
[INPUT]:  ListenerConfig, a WebhookHandler, shutdown token
[OUTPUT]: axum server answering webhook deliveries until shutdown
[POS]:    Server layer - HTTP front for the webhook receiver
[UPDATE]: When routes, body limits or middleware change
*/

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use axum::body::{to_bytes, Bytes};
use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use finlink_client::webhook::HandlerError;
use finlink_client::{
    WebhookError, WebhookHandler, WebhookMetadata, WebhookReceiver, WebhookResponse,
    WebhookVerifier,
};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ListenerConfig;

/// Handler that records each verified event in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

#[async_trait]
impl WebhookHandler for LoggingHandler {
    async fn on_event(&self, metadata: WebhookMetadata, payload: Bytes) -> Result<(), HandlerError> {
        info!(
            event_id = %metadata.event_id,
            event_type = %metadata.event_type,
            delivery_id = %metadata.delivery_id,
            timestamp = %metadata.timestamp,
            bytes = payload.len(),
            "webhook event received"
        );
        Ok(())
    }
}

/// Router with the webhook endpoint mounted at `path`
pub fn router<H: WebhookHandler>(receiver: WebhookReceiver<H>, path: &str) -> Router {
    Router::new()
        .route(path, any(webhook_endpoint::<H>))
        .with_state(receiver)
        .layer(TraceLayer::new_for_http())
}

async fn webhook_endpoint<H: WebhookHandler>(
    State(receiver): State<WebhookReceiver<H>>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let limit = receiver.verifier().config().max_body_bytes;

    // Refuse early, before buffering anything.
    if parts.method != Method::POST {
        return reply(WebhookResponse::from_error(&WebhookError::MethodNotAllowed(parts.method)));
    }
    if let Err(err) = receiver.verifier().check_content_length(&parts.headers) {
        warn!(error = %err, "webhook rejected");
        return reply(WebhookResponse::from_error(&err));
    }

    let bytes = match to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, limit, "webhook body could not be read within limit");
            return reply(WebhookResponse::from_error(&WebhookError::BodyTooLarge {
                size: limit as u64 + 1,
                limit,
            }));
        }
    };

    reply(receiver.receive(&parts.method, &parts.headers, bytes))
}

fn reply(response: WebhookResponse) -> Response {
    (response.status, Json(response.body)).into_response()
}

/// Bind and serve until `shutdown` is cancelled
pub async fn serve(config: &ListenerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    serve_listener(listener, config, LoggingHandler, shutdown).await
}

/// Serve on an already bound listener, then drain handler tasks
///
/// Acknowledged deliveries whose handlers are still running get up to
/// `shutdown_grace_secs` to finish before this returns.
pub async fn serve_listener<H: WebhookHandler>(
    listener: TcpListener,
    config: &ListenerConfig,
    handler: H,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let webhook_config = config.webhook_config()?;
    let verifier = WebhookVerifier::new(webhook_config).context("build webhook verifier")?;
    let receiver = WebhookReceiver::new(verifier, handler);
    let app = router(receiver.clone(), &config.path);

    let addr = listener.local_addr().context("read bound address")?;
    info!(
        address = %addr,
        path = %config.path,
        sandbox = config.sandbox,
        "webhook listener starting"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("serve webhook listener")?;

    let pending = receiver.in_flight();
    if pending > 0 {
        info!(pending, "waiting for webhook handlers to finish");
        let grace = Duration::from_secs(config.shutdown_grace_secs);
        if timeout(grace, receiver.drain()).await.is_err() {
            warn!(
                pending = receiver.in_flight(),
                grace_secs = config.shutdown_grace_secs,
                "webhook handlers still running at shutdown"
            );
        }
    }

    info!("webhook listener stopped");
    Ok(())
}
