//! Media URL resolution.

/// Turn a backend media path into an absolute URL.
///
/// Absolute `http(s)` URLs pass through. Relative paths are prefixed with the
/// media base, else the backend base (trailing slashes trimmed). With neither
/// configured the path is returned unchanged. Empty input yields `None`.
#[must_use]
pub fn absolute_media_url(url: &str, media_base: Option<&str>, backend_base: Option<&str>) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }

    if is_absolute(url) {
        return Some(url.to_owned());
    }

    let base = [media_base, backend_base]
        .into_iter()
        .flatten()
        .map(|b| b.trim_end_matches('/'))
        .find(|b| !b.is_empty());

    Some(base.map_or_else(|| url.to_owned(), |base| format!("{base}{url}")))
}

fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
