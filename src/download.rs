use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client as HttpClient;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::util::guess_filename_from_url;

/// Streams `url` into `target`. An empty `target` is replaced by the file
/// name from the URL.
///
/// Pre-signed links carry their own credentials, so no API key is sent.
/// A single attempt is made: an expired link cannot be fixed by retrying.
pub(crate) fn fetch_to_file(
    http: &HttpClient,
    url: &str,
    target: &Path,
    progress: bool,
) -> Result<PathBuf> {
    let target = if target.as_os_str().is_empty() {
        guess_filename_from_url(url)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("download"))
    } else {
        target.to_path_buf()
    };

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }

    let resp = http
        .get(url)
        .send()
        .with_context(|| format!("could not connect to {}", url))?;
    let status = resp.status();
    if status == reqwest::StatusCode::FORBIDDEN {
        bail!(
            "download refused (HTTP 403); pre-signed links expire 15 minutes after they are issued, fetch the report again for a fresh link"
        );
    }
    let mut resp = resp.error_for_status().context("download request failed")?;
    let expected = resp.content_length();

    let pb = if progress {
        let pb = match expected {
            Some(len) => ProgressBar::new(len),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
        ) {
            pb.set_style(style.progress_chars("=>-"));
        }
        Some(pb)
    } else {
        None
    };

    let file = File::create(&target).with_context(|| format!("failed to open {}", target.display()))?;
    let mut out = BufWriter::new(file);

    let mut downloaded: u64 = 0;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = resp.read(&mut buf).context("download interrupted")?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        downloaded += n as u64;
        if let Some(pb) = &pb {
            pb.inc(n as u64);
        }
    }
    out.flush()?;

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    if let Some(expected) = expected {
        if downloaded < expected {
            bail!(
                "download failed: downloaded {} byte(s) out of {}",
                downloaded,
                expected
            );
        }
    }

    tracing::debug!(path = %target.display(), bytes = downloaded, "artifact saved");
    Ok(target)
}
