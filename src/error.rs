use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Errors from the report lifecycle: creation, status checks and polling.
///
/// A job that the service marked as failed ([`ReportError::Failed`]) and a
/// job the client stopped waiting for ([`ReportError::Timeout`],
/// [`ReportError::Cancelled`]) are separate variants so callers can react to
/// each differently.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The API answered with a non-success status.
    #[error("{message}")]
    Api {
        status: StatusCode,
        url: String,
        message: String,
    },

    /// The request never produced a response.
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to parse API JSON (url={url}, status={status})")]
    Decode {
        url: String,
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },

    /// The service reports the job as failed.
    #[error("Report {report_id} failed: {}", .error.as_deref().unwrap_or("Unknown error"))]
    Failed {
        report_id: String,
        error: Option<String>,
    },

    #[error("Report {report_id} did not complete within {} second(s)", .timeout.as_secs())]
    Timeout { report_id: String, timeout: Duration },

    #[error("waiting for report {report_id} was cancelled")]
    Cancelled { report_id: String },
}

impl ReportError {
    /// HTTP status for [`ReportError::Api`], `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ReportError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ReportError::Timeout { .. })
    }

    pub fn is_remote_failure(&self) -> bool {
        matches!(self, ReportError::Failed { .. })
    }
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorResponse {
    #[serde(default)]
    pub(crate) message: Option<String>,
    // Either a string or a list of field validation entries.
    #[serde(default)]
    pub(crate) detail: Option<Value>,
    #[serde(default)]
    pub(crate) error: Option<String>,
}

impl ApiErrorResponse {
    fn summary(&self) -> String {
        let title = self
            .message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("");
        let detail = match &self.detail {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Array(items)) => items
                .iter()
                .map(describe_validation_entry)
                .collect::<Vec<_>>()
                .join("\n"),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        match (title.is_empty(), detail.is_empty()) {
            (false, false) => format!("{}\n{}", title, detail),
            (false, true) => title.to_string(),
            (true, _) => detail,
        }
    }
}

fn describe_validation_entry(entry: &Value) -> String {
    let msg = entry.get("msg").and_then(Value::as_str);
    let loc = entry.get("loc").and_then(Value::as_array).map(|parts| {
        parts
            .iter()
            .map(|p| match p {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    });
    match (loc, msg) {
        (Some(loc), Some(msg)) => format!("- {}: {}", loc, msg),
        (None, Some(msg)) => format!("- {}", msg),
        _ => format!("- {}", entry),
    }
}

/// Builds [`ReportError::Api`] from a non-success response body.
pub(crate) fn api_error(status: StatusCode, url: &str, body: &str) -> ReportError {
    let server = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => parsed.summary(),
        Err(_) => body.trim().to_string(),
    };

    let message = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => format!(
            "Surmado authentication failed (HTTP {}).\n- Check that SURMADO_API_KEY (or `key:` in .surmadorc) holds a valid API key\n\nServer message: {}\nrequest: {}",
            status.as_u16(),
            server,
            url
        ),
        StatusCode::NOT_FOUND => format!(
            "Surmado API resource not found (HTTP 404).\n- The report id may be wrong, or the configured base URL is incorrect\n- Default base URL: {}\n\nServer message: {}\nrequest: {}",
            crate::config::DEFAULT_API_URL,
            server,
            url
        ),
        StatusCode::UNPROCESSABLE_ENTITY => format!(
            "Surmado rejected the request fields (HTTP 422).\n- pain_points and direct_competitors must be strings, not lists\n\nServer message: {}\nrequest: {}",
            server, url
        ),
        _ => format!(
            "API request failed: HTTP {} for url ({})\n{}",
            status.as_u16(),
            url,
            server
        ),
    };

    ReportError::Api {
        status,
        url: url.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_mentions_key_source() {
        let err = api_error(
            StatusCode::UNAUTHORIZED,
            "https://api.surmado.com/v1/reports/scan",
            r#"{"message":"Invalid API key"}"#,
        );
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        let msg = err.to_string();
        assert!(msg.contains("SURMADO_API_KEY"));
        assert!(msg.contains("Invalid API key"));
    }

    #[test]
    fn validation_details_are_listed() {
        let body = r#"{"detail":[{"loc":["body","direct_competitors"],"msg":"str type expected"}]}"#;
        let err = api_error(StatusCode::UNPROCESSABLE_ENTITY, "u", body);
        assert!(
            err.to_string()
                .contains("- body.direct_competitors: str type expected")
        );
    }

    #[test]
    fn plain_text_body_is_kept() {
        let err = api_error(StatusCode::BAD_GATEWAY, "u", "upstream down\n");
        assert_eq!(
            err.to_string(),
            "API request failed: HTTP 502 for url (u)\nupstream down"
        );
    }

    #[test]
    fn failure_and_timeout_are_distinct() {
        let failed = ReportError::Failed {
            report_id: "rpt_1".into(),
            error: None,
        };
        let timeout = ReportError::Timeout {
            report_id: "rpt_1".into(),
            timeout: Duration::from_secs(1200),
        };
        assert!(failed.is_remote_failure() && !failed.is_timeout());
        assert!(timeout.is_timeout() && !timeout.is_remote_failure());
        assert_eq!(failed.to_string(), "Report rpt_1 failed: Unknown error");
        assert_eq!(
            timeout.to_string(),
            "Report rpt_1 did not complete within 1200 second(s)"
        );
    }
}
