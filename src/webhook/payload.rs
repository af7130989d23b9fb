use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::report::{Artifact, ReportStatus, artifacts_from};

/// Body the service POSTs to the webhook endpoint when a report settles.
///
/// `report_id` and `status` are required. A body without either (including
/// `{}`) does not parse and is answered with an empty `500`. Every other
/// field is optional, and unknown fields are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub report_id: String,
    pub status: ReportStatus,
    /// `scan`, `signal` or `solutions`. Kept as a string so a new product does
    /// not make deliveries fail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pptx_download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intelligence_download_url: Option<String>,
    /// RFC 3339 timestamp, e.g. `2025-01-15T10:45:00Z`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WebhookPayload {
    pub fn artifacts(&self) -> Vec<Artifact> {
        artifacts_from(
            self.download_url.as_deref(),
            self.pptx_download_url.as_deref(),
            self.intelligence_download_url.as_deref(),
        )
    }

    pub fn product_name(&self) -> &str {
        self.product.as_deref().unwrap_or("unknown")
    }
}
