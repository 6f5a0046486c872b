//! URL handling module for News-Archiver
//!
//! Resolves hrefs found on the listing page into absolute article URLs and
//! decides whether a URL belongs to the archived site.

mod domain;

pub use domain::{extract_domain, same_site};

use url::Url;

/// Where a URL sits relative to the archived site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlScope {
    /// Same domain as the listing page; may be crawled
    OnSite,
    /// Any other domain; never crawled
    Foreign,
}

impl UrlScope {
    /// Returns true if URLs with this scope may be fetched
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::OnSite)
    }
}

/// Classifies a URL against the listing page it was found on
///
/// # Examples
///
/// ```
/// use news_archiver::url::{classify_url, UrlScope};
/// use url::Url;
///
/// let site = Url::parse("https://www.tagesschau.de/").unwrap();
/// let url = Url::parse("https://www.tagesschau.de/inland/a-100.html").unwrap();
/// assert_eq!(classify_url(&url, &site), UrlScope::OnSite);
/// ```
pub fn classify_url(url: &Url, site: &Url) -> UrlScope {
    if (url.scheme() == "http" || url.scheme() == "https") && same_site(url, site) {
        UrlScope::OnSite
    } else {
        UrlScope::Foreign
    }
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// The fragment of the resolved URL is dropped so that links to different
/// anchors of one article resolve to the same article.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }
    absolute_url.set_fragment(None);

    Some(absolute_url)
}
