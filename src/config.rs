use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::client::ClientConfig;

pub(crate) const DEFAULT_API_URL: &str = "https://api.surmado.com/v1";

#[derive(Debug, Default, PartialEq)]
struct RcConfig {
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
}

/// Resolves the client configuration. Each setting is taken from the first
/// layer that has it: explicit arguments, then environment, then the first
/// rc file found.
pub(crate) fn load_config(
    url: Option<String>,
    key: Option<String>,
    verify: Option<bool>,
) -> Result<ClientConfig> {
    let given = RcConfig {
        url: url.or_else(|| non_empty_env("SURMADO_API_URL")),
        key: key.or_else(|| non_empty_env("SURMADO_API_KEY")),
        verify,
    };

    let candidates = rc_candidates();
    let file = if given.url.is_none() || given.key.is_none() || given.verify.is_none() {
        find_rc(&candidates)?
    } else {
        RcConfig::default()
    };

    resolve(given, file, &candidates)
}

fn resolve(given: RcConfig, file: RcConfig, candidates: &[PathBuf]) -> Result<ClientConfig> {
    let Some(key) = given.key.or(file.key) else {
        let places = candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>();
        bail!(
            "Missing API key: set SURMADO_API_KEY or put `key:` in {}",
            if places.is_empty() {
                ".surmadorc".to_string()
            } else {
                places.join(", ")
            }
        );
    };

    let url = given
        .url
        .or(file.url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    if !looks_like_url(&url) {
        bail!("API URL must start with http:// or https://, got {:?}", url);
    }

    Ok(ClientConfig {
        url,
        key,
        verify: given.verify.or(file.verify).unwrap_or(true),
    })
}

/// Reads the first rc file that exists; none is not an error.
fn find_rc(candidates: &[PathBuf]) -> Result<RcConfig> {
    let Some(path) = candidates.iter().find(|p| p.exists()) else {
        return Ok(RcConfig::default());
    };
    tracing::debug!(path = %path.display(), "reading configuration file");
    read_rc(path)
        .with_context(|| format!("failed to read configuration file {}", path.display()))
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // `key:` may be followed by the value on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            if !line.contains(':') || (pk == "url" && looks_like_url(line)) {
                let v = strip_quotes(line).to_string();
                match pk {
                    "url" => cfg.url = Some(v),
                    "key" => cfg.key = Some(v),
                    _ => {}
                }
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            match k {
                "url" if v.is_empty() => pending_key = Some("url"),
                "key" if v.is_empty() => pending_key = Some("key"),
                "url" => cfg.url = Some(v.to_string()),
                "key" => cfg.key = Some(v.to_string()),
                "verify" if !v.is_empty() => {
                    cfg.verify = Some(!matches!(v, "0" | "false" | "no"));
                }
                _ => {}
            }
        }
    }

    cfg
}

fn looks_like_url(line: &str) -> bool {
    let v = strip_quotes(line);
    v.starts_with("http://") || v.starts_with("https://")
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // 1) SURMADO_RC (explicit)
    // 2) ./.surmadorc
    // 3) ~/.surmadorc
    if let Some(p) = non_empty_env("SURMADO_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".surmadorc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".surmadorc"));
    }
    v
}
