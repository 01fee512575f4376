use url::Url;

/// Domain used when an address can't be parsed.
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Extracts the host of `url` without a leading `www.`.
pub fn extract_domain(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string));
    match host {
        Some(host) => host
            .strip_prefix("www.")
            .map(str::to_string)
            .unwrap_or(host),
        None => UNKNOWN_DOMAIN.to_string(),
    }
}

/// Only web pages are tracked. Browser internal pages, files and extensions are not.
pub fn is_trackable(url: &str) -> bool {
    url.starts_with("http")
}
