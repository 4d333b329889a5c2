use crate::QueryError;
use url::Url;

/// Canonicalizes a detail link into the identifier used as the corpus key
///
/// # Canonicalization Steps
///
/// 1. Resolve `href` against `base_url` (listing pages use relative links)
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Lowercase the host (the `url` crate does this on parse)
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment and query string; listing pages decorate detail links
///    with per-search tracking parameters that must not split one posting
///    into several identifiers
///
/// # Examples
///
/// ```
/// use dice_harvest::url::canonicalize_identifier;
/// use url::Url;
///
/// let base = Url::parse("https://www.dice.com/jobs?q=rust").unwrap();
/// let id = canonicalize_identifier("/job-detail/abc-123/?searchlink=1#top", &base).unwrap();
/// assert_eq!(id, "https://www.dice.com/job-detail/abc-123");
/// ```
pub fn canonicalize_identifier(href: &str, base_url: &Url) -> Result<String, QueryError> {
    let mut url = base_url
        .join(href.trim())
        .map_err(|e| QueryError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(QueryError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(QueryError::MissingHost);
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);
    url.set_fragment(None);
    url.set_query(None);

    Ok(url.to_string())
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut normalized_segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                normalized_segments.pop();
            }
            _ => normalized_segments.push(segment),
        }
    }

    if normalized_segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", normalized_segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.dice.com/jobs?q=engineer&page=2").unwrap()
    }

    #[test]
    fn test_absolute_link_kept() {
        let id = canonicalize_identifier("https://www.dice.com/job-detail/abc", &base()).unwrap();
        assert_eq!(id, "https://www.dice.com/job-detail/abc");
    }

    #[test]
    fn test_relative_link_resolved() {
        let id = canonicalize_identifier("/job-detail/abc", &base()).unwrap();
        assert_eq!(id, "https://www.dice.com/job-detail/abc");
    }

    #[test]
    fn test_query_and_fragment_removed() {
        let id =
            canonicalize_identifier("/job-detail/abc?searchlink=search%2F&pos=3#apply", &base())
                .unwrap();
        assert_eq!(id, "https://www.dice.com/job-detail/abc");
    }

    #[test]
    fn test_trailing_slash_removed() {
        let id = canonicalize_identifier("/job-detail/abc/", &base()).unwrap();
        assert_eq!(id, "https://www.dice.com/job-detail/abc");
    }

    #[test]
    fn test_lowercase_host() {
        let id = canonicalize_identifier("https://WWW.DICE.COM/job-detail/ABC", &base()).unwrap();
        assert_eq!(id, "https://www.dice.com/job-detail/ABC");
    }

    #[test]
    fn test_dot_segments_and_double_slashes() {
        let id = canonicalize_identifier("/jobs/../job-detail//./abc", &base()).unwrap();
        assert_eq!(id, "https://www.dice.com/job-detail/abc");
    }

    #[test]
    fn test_same_posting_from_two_pages_is_one_identifier() {
        let page3 = Url::parse("https://www.dice.com/jobs?q=engineer&page=3").unwrap();
        let a = canonicalize_identifier("/job-detail/abc?pos=1", &base()).unwrap();
        let b = canonicalize_identifier("https://www.dice.com/job-detail/abc?pos=19", &page3)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_scheme() {
        let result = canonicalize_identifier("mailto:jobs@dice.com", &base());
        assert!(matches!(result, Err(QueryError::InvalidScheme(_))));
    }

    #[test]
    fn test_http_allowed_for_local_servers() {
        let local = Url::parse("http://127.0.0.1:8080/jobs?q=x").unwrap();
        let id = canonicalize_identifier("/job-detail/1", &local).unwrap();
        assert_eq!(id, "http://127.0.0.1:8080/job-detail/1");
    }
}
