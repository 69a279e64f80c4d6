//! URL validation: syntax first, then a reachability probe.

use reqwest::StatusCode;
use reqwest::header::RANGE;
use tracing::debug;
use url::Url;

use fdl_core::{DownloadError, DownloadKind, DownloadResult, DownloaderConfig};

use crate::http::build_client;
use crate::youtube::is_youtube_url;

/// Checks URLs before anything touches the disk.
#[derive(Clone)]
pub struct UrlValidator {
    client: reqwest::Client,
    config: DownloaderConfig,
}

impl UrlValidator {
    pub fn new(config: &DownloaderConfig) -> DownloadResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            config: config.clone(),
        })
    }

    /// Reuse an existing client.
    pub fn with_client(client: reqwest::Client, config: &DownloaderConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    /// Full validation for a request of the given kind.
    ///
    /// File URLs must also answer a probe with a success status. YouTube
    /// URLs are only checked syntactically; the extraction tool reports
    /// anything deeper.
    pub async fn validate(&self, url: &str, kind: DownloadKind) -> DownloadResult<Url> {
        let parsed = check_syntax(url)?;
        match kind {
            DownloadKind::YouTube => {
                if !is_youtube_url(&parsed) {
                    return Err(DownloadError::invalid_url(url, "not a YouTube link"));
                }
            }
            DownloadKind::File => self.check_reachable(&parsed).await?,
        }
        Ok(parsed)
    }

    /// Probe the URL; 4xx/5xx, timeouts and network failures are unreachable.
    pub async fn check_reachable(&self, url: &Url) -> DownloadResult<()> {
        let response = self
            .client
            .head(url.clone())
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| DownloadError::unreachable(url.as_str(), describe(&e)))?;

        let mut status = response.status();
        debug!(url = %url, %status, "Reachability HEAD");

        if status == StatusCode::METHOD_NOT_ALLOWED || status == StatusCode::NOT_IMPLEMENTED {
            let response = self
                .client
                .get(url.clone())
                .header(RANGE, "bytes=0-0")
                .timeout(self.config.probe_timeout)
                .send()
                .await
                .map_err(|e| DownloadError::unreachable(url.as_str(), describe(&e)))?;
            status = response.status();
            debug!(url = %url, %status, "Reachability ranged GET");
        }

        if status.is_success() {
            Ok(())
        } else {
            Err(DownloadError::unreachable_with_status(
                url.as_str(),
                status.as_u16(),
            ))
        }
    }
}

/// Syntax-only check: http(s) scheme and a host.
pub fn check_syntax(url: &str) -> DownloadResult<Url> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::invalid_url(url, "empty URL"));
    }

    let parsed = Url::parse(trimmed).map_err(|e| DownloadError::invalid_url(url, e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(DownloadError::invalid_url(
                url,
                format!("unsupported scheme '{other}'"),
            ));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(DownloadError::invalid_url(url, "missing host"));
    }

    Ok(parsed)
}

pub(crate) fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}
