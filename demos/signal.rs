//! Runs a Signal (AI visibility) report and downloads its files.
//!
//! Requires `SURMADO_API_KEY` (or a `.surmadorc`). Consumes 1 credit on the
//! basic tier.

use anyhow::Result;
use std::path::Path;
use surmado::{Client, ReportRequest, SignalRequest, SignalTier};
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

    let request = ReportRequest::from(SignalRequest {
        url: "https://example.com".into(),
        brand_name: "Example Brand".into(),
        email: "you@example.com".into(),
        industry: "E-commerce".into(),
        location: "United States".into(),
        persona: "Small business owners looking for affordable solutions".into(),
        pain_points: "Finding reliable vendors, managing inventory costs".into(),
        brand_details: "We provide affordable e-commerce solutions for growing businesses".into(),
        direct_competitors: "Shopify, BigCommerce, WooCommerce".into(),
        tier: SignalTier::Basic,
    });

    let report = client.generate(&request)?;

    // Links are pre-signed and expire after 15 minutes, fetch them right away.
    let report_id = report.report_id.as_deref().unwrap_or("signal");
    for artifact in report.artifacts() {
        let target = format!("{}.{}", report_id, artifact.kind.extension());
        let path = client.download(&artifact, Path::new(&target))?;
        println!("{} saved to {}", artifact.kind.label(), path.display());
    }
    Ok(())
}
