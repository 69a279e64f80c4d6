//! Remote metadata probe.
//!
//! A header-only request that reports size and content type. Results are
//! never cached; every request probes once.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT_RANGES, HeaderMap, RANGE};
use tracing::debug;

use fdl_core::{DownloadError, DownloadResult, DownloaderConfig, RemoteMetadata};

use crate::http::{ContentRange, build_client, content_length, content_type};
use crate::validator::describe;

/// Issues HEAD probes (with a ranged GET fallback).
#[derive(Clone)]
pub struct MetadataProber {
    client: reqwest::Client,
    config: DownloaderConfig,
}

impl MetadataProber {
    pub fn new(config: &DownloaderConfig) -> DownloadResult<Self> {
        Ok(Self {
            client: build_client(config)?,
            config: config.clone(),
        })
    }

    pub fn with_client(client: reqwest::Client, config: &DownloaderConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    /// Probe `url` for its size and content type.
    ///
    /// Network failures become `Probe`; an HTML page becomes `WebPage` unless
    /// the configuration allows it.
    pub async fn probe(&self, url: &str) -> DownloadResult<RemoteMetadata> {
        let response = self
            .client
            .head(url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| DownloadError::probe(describe(&e)))?;

        let status = response.status();
        let final_url = response.url().to_string();
        debug!(url, %status, final_url, "Metadata HEAD");

        let metadata = if status == StatusCode::METHOD_NOT_ALLOWED
            || status == StatusCode::NOT_IMPLEMENTED
        {
            self.probe_with_range(url).await?
        } else if status.is_success() {
            metadata_from_head(response.headers(), final_url)
        } else {
            return Err(DownloadError::probe(format!(
                "server answered HTTP {}",
                status.as_u16()
            )));
        };

        if self.config.reject_html && metadata.is_html() {
            return Err(DownloadError::web_page(
                metadata.content_type.clone().unwrap_or_default(),
            ));
        }

        debug!(
            total = ?metadata.total_size,
            content_type = ?metadata.content_type,
            accepts_ranges = metadata.accepts_ranges,
            "Probed remote metadata"
        );
        Ok(metadata)
    }

    /// Fallback for servers that refuse HEAD: fetch the first byte only.
    async fn probe_with_range(&self, url: &str) -> DownloadResult<RemoteMetadata> {
        let response = self
            .client
            .get(url)
            .header(RANGE, "bytes=0-0")
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| DownloadError::probe(describe(&e)))?;

        let status = response.status();
        debug!(url, %status, "Metadata ranged GET");

        let headers = response.headers();
        let total_size = match status {
            StatusCode::PARTIAL_CONTENT => {
                ContentRange::from_headers(headers).and_then(|r| r.total())
            }
            s if s.is_success() => content_length(headers),
            s => {
                return Err(DownloadError::probe(format!(
                    "server answered HTTP {}",
                    s.as_u16()
                )));
            }
        };

        Ok(RemoteMetadata {
            total_size,
            content_type: content_type(headers),
            accepts_ranges: status == StatusCode::PARTIAL_CONTENT || advertises_ranges(headers),
            final_url: Some(response.url().to_string()),
        })
    }
}

fn metadata_from_head(headers: &HeaderMap, final_url: String) -> RemoteMetadata {
    RemoteMetadata {
        total_size: content_length(headers),
        content_type: content_type(headers),
        accepts_ranges: advertises_ranges(headers),
        final_url: Some(final_url),
    }
}

fn advertises_ranges(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("bytes"))
}
