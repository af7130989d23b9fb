use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// How long a pre-signed download URL stays valid after it is issued.
pub const ARTIFACT_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// Job status as reported by the service.
///
/// Only `completed` and `failed` are terminal. Intermediate names are owned by
/// the service; unrecognised ones are kept verbatim in [`ReportStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReportStatus {
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
    Other(String),
}

impl ReportStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Queued => "queued",
            ReportStatus::Processing => "processing",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
            ReportStatus::Other(s) => s,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }
}

impl From<String> for ReportStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => ReportStatus::Pending,
            "queued" => ReportStatus::Queued,
            "processing" => ReportStatus::Processing,
            "completed" => ReportStatus::Completed,
            "failed" => ReportStatus::Failed,
            _ => ReportStatus::Other(s),
        }
    }
}

impl From<&str> for ReportStatus {
    fn from(s: &str) -> Self {
        ReportStatus::from(s.to_string())
    }
}

impl From<ReportStatus> for String {
    fn from(s: ReportStatus) -> Self {
        match s {
            ReportStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response of a report creation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedReport {
    pub report_id: String,
    #[serde(default)]
    pub credits_used: Option<u32>,
    /// Any other fields returned by the service.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /reports/{report_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_id: Option<String>,
    pub status: ReportStatus,
    /// Only set when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// PDF report.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Slide deck, Signal reports only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pptx_download_url: Option<String>,
    /// Machine-readable JSON results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intelligence_download_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Report {
    /// Download links present on this report, in PDF, PPTX, JSON order.
    ///
    /// The links are only meaningful once the report is completed and expire
    /// [`ARTIFACT_URL_TTL`] after they were issued.
    pub fn artifacts(&self) -> Vec<Artifact> {
        artifacts_from(
            self.download_url.as_deref(),
            self.pptx_download_url.as_deref(),
            self.intelligence_download_url.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Pdf,
    Pptx,
    Intelligence,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Pptx => "pptx",
            ArtifactKind::Intelligence => "json",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "PDF",
            ArtifactKind::Pptx => "PPTX",
            ArtifactKind::Intelligence => "JSON",
        }
    }
}

/// A result file behind a pre-signed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub url: String,
}

pub(crate) fn artifacts_from(
    pdf: Option<&str>,
    pptx: Option<&str>,
    intelligence: Option<&str>,
) -> Vec<Artifact> {
    [
        (ArtifactKind::Pdf, pdf),
        (ArtifactKind::Pptx, pptx),
        (ArtifactKind::Intelligence, intelligence),
    ]
    .into_iter()
    .filter_map(|(kind, url)| {
        url.filter(|u| !u.trim().is_empty()).map(|u| Artifact {
            kind,
            url: u.to_string(),
        })
    })
    .collect()
}
