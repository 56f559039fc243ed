//! Joining base URLs with tokens, and extracting tokens back out of links.

/// Joins `base_url` and `token` with exactly one `/` between them.
///
/// `base_url` is caller-controlled and used as-is (no re-encoding). When
/// `append_slash` is set a trailing `/` follows the token.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(
///     build_url("https://t.example.com/open/", "abc=", false),
///     "https://t.example.com/open/abc="
/// );
/// assert_eq!(
///     build_url("https://t.example.com/open", "abc=", true),
///     "https://t.example.com/open/abc=/"
/// );
/// ```
pub fn build_url(base_url: &str, token: &str, append_slash: bool) -> String {
    let token = token.trim_start_matches('/');
    let mut url = String::with_capacity(base_url.len() + token.len() + 2);

    url.push_str(base_url);
    if !base_url.ends_with('/') {
        url.push('/');
    }
    url.push_str(token);
    if append_slash {
        url.push('/');
    }

    url
}

/// Returns the part of `url` following `base_url`, or `None` if `url` does
/// not start with it.
pub fn strip_base_url<'a>(url: &'a str, base_url: &str) -> Option<&'a str> {
    url.strip_prefix(base_url)
}

/// Extracts the token from a request path or the remainder of a link.
///
/// Drops any query string or fragment, surrounding slashes, and everything
/// up to the last path separator. Tokens never contain `/`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(token_from_path("/open/abc=/?utm=1"), "abc=");
/// assert_eq!(token_from_path("abc="), "abc=");
/// ```
pub fn token_from_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let path = path.trim_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}
