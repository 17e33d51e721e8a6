//! Wistia ID detection directly in a URL string.

use std::sync::LazyLock;

use regex::Regex;

/// Known embed URL shapes on wistia.com and fast.wistia.net.
static EMBED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:wistia\.com/embed/(?:iframe|medias)/|fast\.wistia\.net/embed/(?:iframe|medias)/)([a-zA-Z0-9]{10})",
    )
    .unwrap()
});

/// Wistia URL whose last path segment is the media ID.
static TRAILING_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:wistia\.com|wistia\.net)/.*/([a-zA-Z0-9]{10})(?:\?|$|#)").unwrap()
});

/// Extract a Wistia ID from the URL itself. Never touches the network.
pub fn wistia_id_from_url(url: &str) -> Option<String> {
    [&*EMBED_URL, &*TRAILING_SEGMENT]
        .into_iter()
        .find_map(|regex| regex.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
