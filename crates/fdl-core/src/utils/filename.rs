//! Destination and partial-file naming.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use url::Url;

/// Name used when neither the URL nor the content type suggest one.
pub const FALLBACK_STEM: &str = "downloaded_file";

/// Derive a local filename for a download.
///
/// Uses the last path segment of the URL when it looks like a filename
/// (contains a dot). Otherwise falls back to `downloaded_file` plus an
/// extension inferred from the content type.
#[must_use]
pub fn derive_filename(url: &str, content_type: Option<&str>) -> String {
    let from_url = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
    });

    if let Some(name) = from_url
        .map(|n| sanitize_filename(&n))
        .filter(|n| n.contains('.'))
    {
        return name;
    }

    let ext = content_type.and_then(extension_for_content_type).unwrap_or("");
    format!("{FALLBACK_STEM}{ext}")
}

/// Replace characters that are illegal in filenames on common platforms.
///
/// Returns [`FALLBACK_STEM`] if nothing usable is left.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extension (with leading dot) for a content type.
#[must_use]
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let ext = match essence.as_str() {
        "application/zip" => ".zip",
        "application/gzip" | "application/x-gzip" => ".gz",
        "application/x-tar" => ".tar",
        "application/x-7z-compressed" => ".7z",
        "application/x-bzip2" => ".bz2",
        "application/x-xz" => ".xz",
        "application/pdf" => ".pdf",
        "application/json" => ".json",
        "application/xml" | "text/xml" => ".xml",
        "application/x-msdownload" => ".exe",
        "application/vnd.debian.binary-package" => ".deb",
        "application/x-iso9660-image" => ".iso",
        "application/octet-stream" => ".bin",
        "text/plain" => ".txt",
        "text/csv" => ".csv",
        "text/html" => ".html",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "audio/mpeg" => ".mp3",
        "audio/ogg" => ".ogg",
        "audio/wav" | "audio/x-wav" => ".wav",
        "audio/mp4" => ".m4a",
        "video/mp4" => ".mp4",
        "video/webm" => ".webm",
        "video/x-matroska" => ".mkv",
        "video/quicktime" => ".mov",
        _ => return None,
    };
    Some(ext)
}

/// Path of the partial file for `destination` (`<destination><suffix>`).
#[must_use]
pub fn partial_path(destination: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = destination.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Final destination for a download.
///
/// An explicit path that is an existing directory receives the derived
/// filename; any other explicit path is used as-is. Without one, the
/// derived filename is placed in the working directory.
#[must_use]
pub fn resolve_destination(
    explicit: Option<&Path>,
    url: &str,
    content_type: Option<&str>,
) -> PathBuf {
    match explicit {
        Some(path) if path.is_dir() => path.join(derive_filename(url, content_type)),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(derive_filename(url, content_type)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_url_path() {
        assert_eq!(
            derive_filename("https://example.com/files/archive.zip?token=abc", None),
            "archive.zip"
        );
    }

    #[test]
    fn test_name_without_extension_uses_content_type() {
        assert_eq!(
            derive_filename("https://example.com/download", Some("application/pdf")),
            "downloaded_file.pdf"
        );
    }

    #[test]
    fn test_bare_host_without_content_type() {
        assert_eq!(derive_filename("https://example.com/", None), "downloaded_file");
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        assert_eq!(
            extension_for_content_type("Text/Plain; charset=utf-8"),
            Some(".txt")
        );
        assert_eq!(extension_for_content_type("application/x-unknown"), None);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_filename("a:b*c?.mp4"), "a_b_c_.mp4");
        assert_eq!(sanitize_filename(".."), FALLBACK_STEM);
        assert_eq!(sanitize_filename("  name.txt "), "name.txt");
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/tmp/file.iso"), ".part"),
            PathBuf::from("/tmp/file.iso.part")
        );
    }

    #[test]
    fn test_resolve_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dest = resolve_destination(Some(dir.path()), "https://example.com/x.bin", None);
        assert_eq!(dest, dir.path().join("x.bin"));
    }

    #[test]
    fn test_resolve_explicit_file() {
        let dest = resolve_destination(
            Some(Path::new("/tmp/does-not-exist/out.bin")),
            "https://example.com/x.bin",
            None,
        );
        assert_eq!(dest, PathBuf::from("/tmp/does-not-exist/out.bin"));
    }

    #[test]
    fn test_resolve_default() {
        let dest = resolve_destination(None, "https://example.com/x.bin", None);
        assert_eq!(dest, PathBuf::from("x.bin"));
    }
}
