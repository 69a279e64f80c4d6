//! Shared HTTP client construction and header parsing.

use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, HeaderMap};
use reqwest::redirect::Policy;

use fdl_core::{DownloadError, DownloadResult, DownloaderConfig};

const MAX_REDIRECTS: usize = 10;

/// Build the client used for probes and transfers.
///
/// No overall request timeout: a multi-gigabyte body may legitimately take
/// hours. Probes set their own per-request timeout.
pub fn build_client(config: &DownloaderConfig) -> DownloadResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .connect_timeout(config.connect_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| DownloadError::network(format!("failed to build HTTP client: {e}")))
}

/// Parsed `Content-Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRange {
    /// `bytes <start>-<end>/<total|*>`
    Satisfied {
        start: u64,
        end: u64,
        total: Option<u64>,
    },
    /// `bytes */<total>` (sent with 416)
    Unsatisfied { total: u64 },
}

impl ContentRange {
    /// Parse a header value.
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes")?.trim_start();
        let (range, total) = rest.split_once('/')?;
        let total = total.trim();

        if range.trim() == "*" {
            return Some(Self::Unsatisfied {
                total: total.parse().ok()?,
            });
        }

        let (start, end) = range.trim().split_once('-')?;
        let start: u64 = start.trim().parse().ok()?;
        let end: u64 = end.trim().parse().ok()?;
        if end < start {
            return None;
        }
        let total = if total == "*" {
            None
        } else {
            Some(total.parse().ok()?)
        };
        Some(Self::Satisfied { start, end, total })
    }

    /// Parse from a response's headers.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse)
    }

    /// Total size, if stated.
    pub const fn total(&self) -> Option<u64> {
        match self {
            Self::Satisfied { total, .. } => *total,
            Self::Unsatisfied { total } => Some(*total),
        }
    }
}

/// `Content-Length` read straight from the headers.
///
/// `Response::content_length` reports the body size hint, which is zero for
/// HEAD responses, so it is not usable for probes.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Content type without parameters, lowercased.
pub fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_parse_satisfied() {
        assert_eq!(
            ContentRange::parse("bytes 400000-999999/1000000"),
            Some(ContentRange::Satisfied {
                start: 400_000,
                end: 999_999,
                total: Some(1_000_000)
            })
        );
    }

    #[test]
    fn test_parse_unknown_total() {
        let range = ContentRange::parse("bytes 0-0/*").unwrap();
        assert_eq!(range.total(), None);
    }

    #[test]
    fn test_parse_unsatisfied() {
        assert_eq!(
            ContentRange::parse("bytes */1000"),
            Some(ContentRange::Unsatisfied { total: 1000 })
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(ContentRange::parse("items 0-1/2"), None);
        assert_eq!(ContentRange::parse("bytes 5-1/10"), None);
        assert_eq!(ContentRange::parse("bytes x-y/z"), None);
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("Text/HTML; charset=UTF-8"),
        );
        assert_eq!(content_type(&headers).as_deref(), Some("text/html"));
    }

    #[test]
    fn test_content_length_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1048576"));
        assert_eq!(content_length(&headers), Some(1_048_576));
    }
}
