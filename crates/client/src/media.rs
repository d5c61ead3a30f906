//! Media URL resolution.

use url::Url;

/// Resolve a media path from the backend into an absolute URL.
///
/// Absolute `http(s)` URLs pass through, relative paths are appended to the
/// backend base URL, and a missing or empty path yields an empty string.
#[must_use]
pub fn media_url(base_url: &Url, path: Option<&str>) -> String {
    let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) else {
        return String::new();
    };
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    let base = base_url.as_str();
    let path = path.trim_start_matches('/');
    if base.ends_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8000/").unwrap()
    }

    #[test]
    fn test_relative_paths_join_base() {
        assert_eq!(
            media_url(&base(), Some("/media/store/images/mug.jpg")),
            "http://127.0.0.1:8000/media/store/images/mug.jpg"
        );
        assert_eq!(
            media_url(&base(), Some("media/mug.jpg")),
            "http://127.0.0.1:8000/media/mug.jpg"
        );
    }

    #[test]
    fn test_absolute_urls_pass_through() {
        assert_eq!(
            media_url(&base(), Some("https://cdn.example.com/mug.jpg")),
            "https://cdn.example.com/mug.jpg"
        );
    }

    #[test]
    fn test_empty_yields_empty() {
        assert_eq!(media_url(&base(), None), "");
        assert_eq!(media_url(&base(), Some("")), "");
    }
}
