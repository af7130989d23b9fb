use anyhow::Result;
use std::sync::Arc;

use crate::report::ReportStatus;
use crate::util::truncate_for_display;
use crate::webhook::fetch::ArtifactFetcher;
use crate::webhook::payload::WebhookPayload;

/// Reaction to one webhook delivery.
///
/// Handlers run before the delivery is acknowledged. Anything slow, such
/// as downloading the artifacts, should be handed off (see
/// [`FetchingHandler`]). Returning an error answers the delivery with `500`,
/// which makes the service deliver it again.
pub trait WebhookHandler: Send + Sync + 'static {
    fn on_completed(&self, payload: &WebhookPayload) -> Result<()>;

    fn on_failed(&self, payload: &WebhookPayload) -> Result<()>;

    /// Any status other than `completed` or `failed`.
    fn on_other(&self, payload: &WebhookPayload) -> Result<()> {
        let _ = payload;
        Ok(())
    }
}

impl<H: WebhookHandler + ?Sized> WebhookHandler for Arc<H> {
    fn on_completed(&self, payload: &WebhookPayload) -> Result<()> {
        (**self).on_completed(payload)
    }

    fn on_failed(&self, payload: &WebhookPayload) -> Result<()> {
        (**self).on_failed(payload)
    }

    fn on_other(&self, payload: &WebhookPayload) -> Result<()> {
        (**self).on_other(payload)
    }
}

pub(crate) fn dispatch(handler: &dyn WebhookHandler, payload: &WebhookPayload) -> Result<()> {
    tracing::info!(
        report_id = %payload.report_id,
        product = payload.product_name(),
        status = %payload.status,
        "webhook received"
    );

    match payload.status {
        ReportStatus::Completed => handler.on_completed(payload),
        ReportStatus::Failed => handler.on_failed(payload),
        _ => {
            tracing::debug!(report_id = %payload.report_id, "no action for non-terminal status");
            handler.on_other(payload)
        }
    }
}

/// Logs each delivery. Download links are shortened to 80 characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogHandler;

impl WebhookHandler for LogHandler {
    fn on_completed(&self, payload: &WebhookPayload) -> Result<()> {
        tracing::info!(report_id = %payload.report_id, "report completed");
        for artifact in payload.artifacts() {
            tracing::info!(
                report_id = %payload.report_id,
                "{} available: {}",
                artifact.kind.label(),
                truncate_for_display(&artifact.url, 80)
            );
        }
        Ok(())
    }

    fn on_failed(&self, payload: &WebhookPayload) -> Result<()> {
        tracing::warn!(
            report_id = %payload.report_id,
            error = payload.error.as_deref().unwrap_or("Unknown error"),
            "report failed"
        );
        Ok(())
    }
}

/// Wraps another handler and queues the artifacts of completed reports on an
/// [`ArtifactFetcher`].
#[derive(Debug, Clone)]
pub struct FetchingHandler<H = LogHandler> {
    inner: H,
    fetcher: ArtifactFetcher,
}

impl<H: WebhookHandler> FetchingHandler<H> {
    pub fn new(inner: H, fetcher: ArtifactFetcher) -> Self {
        Self { inner, fetcher }
    }
}

impl<H: WebhookHandler> WebhookHandler for FetchingHandler<H> {
    fn on_completed(&self, payload: &WebhookPayload) -> Result<()> {
        self.inner.on_completed(payload)?;
        self.fetcher.enqueue(&payload.report_id, payload.artifacts())
    }

    fn on_failed(&self, payload: &WebhookPayload) -> Result<()> {
        self.inner.on_failed(payload)
    }

    fn on_other(&self, payload: &WebhookPayload) -> Result<()> {
        self.inner.on_other(payload)
    }
}
