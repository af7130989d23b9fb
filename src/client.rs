use anyhow::{Context, Result};
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::load_config;
use crate::download::fetch_to_file;
use crate::error::{ReportError, api_error};
use crate::poll::{CancelToken, PollOptions, StatusSource, wait_for_completion};
use crate::report::{Artifact, CreatedReport, Report};
use crate::request::ReportRequest;
use crate::util::{encode_path_segment, urljoin};

const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, `https://api.surmado.com/v1` unless overridden.
    pub url: String,
    /// API key, sent unchanged in the `X-API-Key` header.
    pub key: String,
    /// Whether to verify TLS certificates.
    pub verify: bool,
}

/// Blocking client for the report API.
///
/// Each method issues its requests on the calling thread. The client holds
/// no per-job state, so one instance can drive several jobs from several
/// threads at once.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    key: String,
    verify: bool,

    poll: PollOptions,
    progress: bool,

    http: HttpClient,
}

impl Client {
    /// Creates a client using environment variables and/or `.surmadorc`.
    ///
    /// This is equivalent to `Client::new(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::new(None, None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`key` arguments
    /// - environment variables `SURMADO_API_URL` / `SURMADO_API_KEY`
    /// - config file from `SURMADO_RC` or `.surmadorc`
    pub fn new(url: Option<String>, key: Option<String>, verify: Option<bool>) -> Result<Self> {
        Self::from_config(load_config(url, key, verify)?)
    }

    pub fn from_config(cfg: ClientConfig) -> Result<Self> {
        let http = build_http(cfg.verify, Duration::from_secs(60))?;

        Ok(Self {
            url: cfg.url,
            key: cfg.key,
            verify: cfg.verify,
            poll: PollOptions::default(),
            progress: true,
            http,
        })
    }

    /// Per-request HTTP timeout (default 60 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = build_http(self.verify, timeout)?;
        Ok(self)
    }

    /// Pause between status checks (default 30 seconds).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }

    /// Ceiling for [`Client::wait_for_completion`] (default 20 minutes).
    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll.timeout = timeout;
        self
    }

    /// Show a progress bar while downloading artifacts.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn poll_options(&self) -> &PollOptions {
        &self.poll
    }

    /// Creates one report job. Consumes credits on success.
    ///
    /// Failures are returned without retrying: the service may already have
    /// created (and charged for) the job.
    pub fn create_report(&self, request: &ReportRequest) -> Result<CreatedReport, ReportError> {
        let product = request.product();
        let url = urljoin(&self.url, &format!("reports/{}", product.as_str()));

        let created: CreatedReport = self.api_json(self.http.post(&url).json(request), &url)?;
        tracing::info!(
            report_id = %created.report_id,
            %product,
            credits_used = ?created.credits_used,
            "report created"
        );
        Ok(created)
    }

    /// Fetches the current status and results of a report.
    pub fn get_report(&self, report_id: &str) -> Result<Report, ReportError> {
        let url = urljoin(
            &self.url,
            &format!("reports/{}", encode_path_segment(report_id)),
        );
        self.api_json(self.http.get(&url), &url)
    }

    /// Polls until the report completes, fails, or the poll timeout passes.
    pub fn wait_for_completion(&self, report_id: &str) -> Result<Report, ReportError> {
        self.wait_for_completion_cancellable(report_id, &CancelToken::new())
    }

    /// Like [`Client::wait_for_completion`], returning
    /// [`ReportError::Cancelled`] once `cancel` fires.
    pub fn wait_for_completion_cancellable(
        &self,
        report_id: &str,
        cancel: &CancelToken,
    ) -> Result<Report, ReportError> {
        wait_for_completion(self, report_id, &self.poll, cancel)
    }

    /// Creates a report and waits for it to finish.
    pub fn generate(&self, request: &ReportRequest) -> Result<Report, ReportError> {
        let created = self.create_report(request)?;
        self.wait_for_completion(&created.report_id)
    }

    /// Downloads an artifact to `target` (an empty path uses the file name
    /// from the URL).
    ///
    /// Links expire 15 minutes after they are issued; download soon after
    /// the report completes.
    pub fn download(&self, artifact: &Artifact, target: &Path) -> Result<PathBuf> {
        fetch_to_file(&self.http, &artifact.url, target, self.progress)
            .with_context(|| format!("failed to download {} artifact", artifact.kind.label()))
    }

    fn apply_auth(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(API_KEY_HEADER, self.key.trim())
    }

    fn api_json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        url: &str,
    ) -> Result<T, ReportError> {
        let resp = self
            .apply_auth(req)
            .send()
            .map_err(|source| ReportError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        let text = resp.text().map_err(|source| ReportError::Transport {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(api_error(status, url, &text));
        }

        serde_json::from_str::<T>(&text).map_err(|source| ReportError::Decode {
            url: url.to_string(),
            status,
            source,
        })
    }
}

impl StatusSource for Client {
    fn fetch_report(&self, report_id: &str) -> Result<Report, ReportError> {
        self.get_report(report_id)
    }
}

fn build_http(verify: bool, timeout: Duration) -> Result<HttpClient> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("surmado-rs/{}", env!("CARGO_PKG_VERSION")))
            .unwrap_or(HeaderValue::from_static("surmado-rs")),
    );

    let mut builder = HttpClient::builder()
        .default_headers(default_headers)
        .timeout(timeout);

    if !verify {
        builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build().context("failed to build HTTP client")
}
