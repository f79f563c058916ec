use url::Url;

/// Computes the canonical ledger key for a submission page
///
/// # Normalization Steps
///
/// 1. Take the URL path only (scheme, host, query and fragment are dropped)
/// 2. Collapse runs of slashes into a single slash
/// 3. Keep a trailing slash when the site emits one, so keys written by
///    earlier runs keep matching
///
/// Dot segments are already resolved by the URL parser.
///
/// # Examples
///
/// ```
/// use gallery_mirror::url::page_key;
/// use url::Url;
///
/// let url = Url::parse("https://www.example.com//view/123/?upload-successful#top").unwrap();
/// assert_eq!(page_key(&url), "/view/123/");
/// ```
pub fn page_key(url: &Url) -> String {
    let mut key = String::with_capacity(url.path().len());
    let mut previous_slash = false;

    for c in url.path().chars() {
        if c == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        key.push(c);
    }

    if key.is_empty() {
        key.push('/');
    }

    key
}

/// Resolves a listing path against the site base URL
///
/// `segments` are appended as individual path segments, so an artist name
/// containing reserved characters is percent-encoded rather than interpreted.
/// The result always ends with a slash.
pub fn resolve_against(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);

    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
        path.push("");
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> String {
        page_key(&Url::parse(s).unwrap())
    }

    #[test]
    fn test_path_only() {
        assert_eq!(key("https://example.com/view/42/"), "/view/42/");
    }

    #[test]
    fn test_query_and_fragment_dropped() {
        assert_eq!(key("https://example.com/view/42/?x=1#comments"), "/view/42/");
    }

    #[test]
    fn test_host_and_scheme_ignored() {
        assert_eq!(key("http://www.example.com/view/42/"), key("https://example.com/view/42/"));
    }

    #[test]
    fn test_duplicate_slashes_collapsed() {
        assert_eq!(key("https://example.com//view///42/"), "/view/42/");
    }

    #[test]
    fn test_dot_segments_resolved() {
        assert_eq!(key("https://example.com/view/./41/../42/"), "/view/42/");
    }

    #[test]
    fn test_trailing_slash_preserved() {
        assert_ne!(key("https://example.com/view/42"), key("https://example.com/view/42/"));
    }

    #[test]
    fn test_resolve_against_base() {
        let base = Url::parse("https://example.com/").unwrap();
        let url = resolve_against(&base, &["gallery", "some-artist"]);
        assert_eq!(url.as_str(), "https://example.com/gallery/some-artist/");
    }

    #[test]
    fn test_resolve_against_base_with_path() {
        let base = Url::parse("http://127.0.0.1:8080/site/?q=1").unwrap();
        let url = resolve_against(&base, &["scraps", "a b"]);
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/site/scraps/a%20b/");
    }
}
