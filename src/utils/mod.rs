//! Utility functions and helpers.

pub mod text;

use url::Url;

/// Check that a page address is an absolute http(s) URL.
pub fn is_page_url(url_str: &str) -> bool {
    Url::parse(url_str)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

/// Extract the domain from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}
