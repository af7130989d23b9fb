//! Runs a Scan (SEO audit) and prints the download links.
//!
//! Requires `SURMADO_API_KEY` (or a `.surmadorc`). Consumes 1 credit.

use anyhow::Result;
use surmado::{Client, ReportRequest, ScanRequest, ScanTier};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "surmado=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client = Client::from_env()?;

    let request = ReportRequest::from(ScanRequest {
        url: "https://example.com".into(),
        brand_name: "Example Brand".into(),
        email: "you@example.com".into(),
        tier: ScanTier::Basic,
    });

    let created = client.create_report(&request)?;
    println!("Report created: {}", created.report_id);
    if let Some(credits) = created.credits_used {
        println!("Credits used: {}", credits);
    }

    println!("\nWaiting for report to complete...");
    let report = client.wait_for_completion(&created.report_id)?;

    for artifact in report.artifacts() {
        println!("{}: {}", artifact.kind.label(), artifact.url);
    }
    Ok(())
}
