//! Inbound completion notifications.
//!
//! The service POSTs a [`WebhookPayload`] once a report completes or fails.
//! [`router`] answers `200 {"received": true}` when the delivery was
//! handled and an empty `500` otherwise. Once a `(report_id, status)` has
//! been handled, repeated deliveries of it are acknowledged without calling
//! the handler again. A repeat that arrives while the first delivery is
//! still running is answered `500`, so the service tries again after the
//! outcome is known.
//!
//! Deliveries are not signed; the payload is trusted as received.

mod dedup;
mod fetch;
mod handler;
mod payload;
mod server;

pub use dedup::{Claim, DEFAULT_DEDUP_TTL, DeliveryLog};
pub use fetch::{ArtifactFetcher, artifact_path};
pub use handler::{FetchingHandler, LogHandler, WebhookHandler};
pub use payload::WebhookPayload;
pub use server::{
    DEFAULT_ACK_DEADLINE, DEFAULT_MAX_BODY_BYTES, ReceiverConfig, router, run, serve,
};
