use url::Url;

/// Extracts the domain from a URL
///
/// The host is lowercased and a leading `www.` is dropped, so that
/// `https://www.example.com/` and `https://example.com/` share a domain.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use news_archiver::url::extract_domain;
///
/// let url = Url::parse("https://WWW.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(rest) => rest.to_string(),
            None => host,
        }
    })
}

/// Returns true if both URLs live on the same domain and port
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(da), Some(db)) => da == db && a.port_or_known_default() == b.port_or_known_default(),
        _ => false,
    }
}
