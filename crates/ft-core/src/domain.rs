//! Web domain extraction for per-site reports.

use url::Url;

/// Returns `scheme://host[:port]/` for a URL, or `None` if it has no host.
///
/// Default ports are omitted. URLs without a path are accepted.
pub fn domain_of(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let host = parsed.host_str()?;
    let scheme = parsed.scheme();
    Some(match parsed.port() {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    })
}

/// Grouping key for a URL: its domain, or the raw URL when there is none.
pub fn domain_key(raw: &str) -> String {
    domain_of(raw).unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_path_query_and_fragment() {
        assert_eq!(
            domain_of("https://github.com/rust-lang/rust?tab=issues#top").as_deref(),
            Some("https://github.com/")
        );
        assert_eq!(domain_of("http://a.com/p1").as_deref(), Some("http://a.com/"));
    }

    #[test]
    fn accepts_urls_without_trailing_path() {
        assert_eq!(domain_of("http://a.com").as_deref(), Some("http://a.com/"));
    }

    #[test]
    fn keeps_explicit_port() {
        assert_eq!(
            domain_of("http://localhost:8080/admin").as_deref(),
            Some("http://localhost:8080/")
        );
        assert_eq!(
            domain_of("https://example.com:443/").as_deref(),
            Some("https://example.com/")
        );
    }

    #[test]
    fn hostless_urls_fall_back_to_raw_value() {
        assert_eq!(domain_of("about:blank"), None);
        assert_eq!(domain_key("about:blank"), "about:blank");
        assert_eq!(domain_key("not a url"), "not a url");
    }
}
