//! YouTube downloads through the external `yt-dlp` tool.
//!
//! - `selector` - Quality names and yt-dlp format selectors
//! - `protocol` - stdout line parsing and stream aggregation
//! - `tools` - Locating yt-dlp and ffmpeg
//! - `adapter` - Subprocess orchestration with pause/resume/cancel

mod adapter;
mod protocol;
mod selector;
pub mod tools;

pub use adapter::{DEFAULT_OUTPUT_TEMPLATE, QualityOption, YouTubeAdapter};
pub use protocol::{ProgressAggregator, StreamProgress, ToolEvent, parse_line};
pub use selector::{Quality, QualityParseError};
pub use tools::{ToolStatus, check_tools};

use url::Url;

const YOUTUBE_HOSTS: [&str; 6] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
    "youtube-nocookie.com",
];

/// Whether `url` points at YouTube.
#[must_use]
pub fn is_youtube_url(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    url.host_str().is_some_and(|host| {
        let host = host.to_ascii_lowercase();
        YOUTUBE_HOSTS.contains(&host.as_str()) || host == "www.youtube-nocookie.com"
    })
}

/// String form of [`is_youtube_url`]; malformed input is not YouTube.
#[must_use]
pub fn is_youtube_link(url: &str) -> bool {
    Url::parse(url.trim()).is_ok_and(|u| is_youtube_url(&u))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_hosts() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "http://YOUTUBE.com/shorts/abc",
        ] {
            assert!(is_youtube_link(url), "{url}");
        }
    }

    #[test]
    fn test_non_youtube_hosts() {
        for url in [
            "https://example.com/watch?v=abc",
            "https://notyoutube.com/watch?v=abc",
            "https://youtube.com.evil.example/watch",
            "ftp://youtube.com/x",
            "youtube.com/watch?v=abc",
        ] {
            assert!(!is_youtube_link(url), "{url}");
        }
    }
}
