//! A small Rust client for the Surmado report API.
//!
//! Reports (Scan, Signal, Solutions) are generated asynchronously:
//! create a report job, then either poll it until it completes or let the
//! service notify a webhook. Both paths end with the same pre-signed
//! download links, which expire 15 minutes after they are issued.
//!
//! ## Quick start
//! - Configure the API key via `SURMADO_API_KEY` or a `.surmadorc` file
//!   (looked up in the current directory and in your home directory).
//! - Build a [`ReportRequest`] and call [`Client::generate`], or call
//!   [`Client::create_report`] and [`Client::wait_for_completion`] yourself.
//!
//! ```no_run
//! use anyhow::Result;
//! use surmado::{Client, ReportRequest, ScanRequest, ScanTier};
//!
//! fn main() -> Result<()> {
//!     let client = Client::from_env()?;
//!     let request = ReportRequest::from(ScanRequest {
//!         url: "https://example.com".into(),
//!         brand_name: "Example Brand".into(),
//!         email: "you@example.com".into(),
//!         tier: ScanTier::Basic,
//!     });
//!
//!     let created = client.create_report(&request)?;
//!     let report = client.wait_for_completion(&created.report_id)?;
//!     for artifact in report.artifacts() {
//!         println!("{}: {}", artifact.kind.label(), artifact.url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The [`webhook`] module provides the receiving side of the completion
//! notifications.

#![forbid(unsafe_code)]

mod client;
mod config;
mod download;
mod error;
pub mod poll;
mod report;
mod request;
mod util;
pub mod webhook;

pub use client::{Client, ClientConfig};
pub use error::ReportError;
pub use poll::{CancelToken, PollOptions, StatusSource};
pub use report::{ARTIFACT_URL_TTL, Artifact, ArtifactKind, CreatedReport, Report, ReportStatus};
pub use request::{
    Product, ReportRequest, ScanRequest, ScanTier, SignalRequest, SignalTier, SolutionsRequest,
};
