use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client as HttpClient;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::download::fetch_to_file;
use crate::report::{Artifact, ArtifactKind};

struct FetchJob {
    report_id: String,
    artifact: Artifact,
}

/// Downloads artifacts on a dedicated thread, away from the webhook
/// acknowledgment path.
///
/// Jobs are processed in arrival order. Files are written to
/// `<dir>/<report_id>.<ext>`.
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    dir: PathBuf,
    tx: mpsc::Sender<FetchJob>,
}

impl ArtifactFetcher {
    /// Starts the download thread. The thread exits once every clone of the
    /// fetcher has been dropped and the queue is drained.
    pub fn spawn(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;

        let (tx, rx) = mpsc::channel::<FetchJob>();
        let worker_dir = dir.clone();
        thread::Builder::new()
            .name("surmado-fetch".into())
            .spawn(move || run_worker(rx, &worker_dir))
            .context("failed to start download thread")?;

        Ok(Self { dir, tx })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Queues the artifacts of one report. Returns immediately.
    pub fn enqueue(&self, report_id: &str, artifacts: Vec<Artifact>) -> Result<()> {
        for artifact in artifacts {
            self.tx
                .send(FetchJob {
                    report_id: report_id.to_string(),
                    artifact,
                })
                .map_err(|_| anyhow!("download thread is no longer running"))?;
        }
        Ok(())
    }
}

/// Where an artifact of `report_id` is stored inside `dir`.
pub fn artifact_path(dir: &Path, report_id: &str, kind: ArtifactKind) -> PathBuf {
    let stem: String = report_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_start_matches('.');
    let stem = if stem.is_empty() { "report" } else { stem };
    dir.join(format!("{}.{}", stem, kind.extension()))
}

fn run_worker(rx: mpsc::Receiver<FetchJob>, dir: &Path) {
    let http = match HttpClient::builder()
        .timeout(Duration::from_secs(300))
        .build()
    {
        Ok(http) => http,
        Err(e) => {
            tracing::error!(error = %e, "failed to build HTTP client for downloads");
            return;
        }
    };

    for job in rx {
        let target = artifact_path(dir, &job.report_id, job.artifact.kind);
        match fetch_to_file(&http, &job.artifact.url, &target, false) {
            Ok(path) => tracing::info!(
                report_id = %job.report_id,
                kind = job.artifact.kind.label(),
                path = %path.display(),
                "artifact downloaded"
            ),
            Err(e) => tracing::warn!(
                report_id = %job.report_id,
                kind = job.artifact.kind.label(),
                error = %format!("{e:#}"),
                "artifact download failed"
            ),
        }
    }
}
