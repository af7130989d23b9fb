//! Runs a Solutions (strategic advisory) report, cancellable with Ctrl-C.
//!
//! Requires `SURMADO_API_KEY` (or a `.surmadorc`). Always Pro tier, 2 credits.

use anyhow::Result;
use std::time::Duration;
use surmado::{CancelToken, Client, ReportError, ReportRequest, SolutionsRequest};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surmado=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let request = ReportRequest::from(SolutionsRequest {
        brand_name: "Example Brand".into(),
        email: "you@example.com".into(),
        business_story: "We are a 5-year-old e-commerce company selling sustainable products. Annual revenue is $2M with 15% YoY growth. Team of 12 people.".into(),
        decision: "Should we launch a subscription box service?".into(),
        success: "Generate $500K in recurring revenue within 18 months while maintaining current profit margins".into(),
        timeline: "6 months to pilot, 12 months to scale nationally".into(),
        scale_indicator: "$2M annual revenue, 50K customers, 12 employees".into(),
    });

    let cancel = CancelToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    // The client is blocking; keep it off the async worker threads.
    let outcome = tokio::task::spawn_blocking(move || -> Result<_> {
        let client = Client::from_env()?.with_poll_timeout(Duration::from_secs(30 * 60));
        let created = client.create_report(&request)?;
        println!("Report created: {}", created.report_id);
        Ok(client.wait_for_completion_cancellable(&created.report_id, &cancel))
    })
    .await??;

    match outcome {
        Ok(report) => {
            for artifact in report.artifacts() {
                println!("{}: {}", artifact.kind.label(), artifact.url);
            }
        }
        Err(ReportError::Cancelled { report_id }) => {
            println!("Stopped waiting; report {} keeps running remotely", report_id);
        }
        Err(e @ ReportError::Timeout { .. }) => {
            println!("{}; check again later with the report id", e);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
