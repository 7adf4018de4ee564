// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Parse `raw` and force its transport scheme to `scheme`.
///
/// Host, path, query and fragment are kept as they were. Returns `None` when
/// the input is not an absolute hierarchical URL (`mailto:`, `data:`) or
/// cannot carry the requested scheme.
///
/// # Examples
/// ```
/// use headlines::utils::url::force_scheme;
///
/// let url = force_scheme("https://example.com/a?b=1", "http").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/a?b=1");
/// ```
pub fn force_scheme(raw: &str, scheme: &str) -> Option<Url> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if url.cannot_be_a_base() {
        return None;
    }
    if url.scheme() == scheme {
        return Some(url);
    }
    if url.set_scheme(scheme).is_ok() {
        return Some(url);
    }

    // `set_scheme` refuses to move between special and non-special schemes,
    // so swap the prefix textually and parse again.
    let rest = &url.as_str()[url.scheme().len()..];
    let rebuilt = Url::parse(&format!("{scheme}{rest}")).ok()?;
    (rebuilt.scheme() == scheme).then_some(rebuilt)
}

/// Extract the domain from a URL.
pub fn get_domain(url: &Url) -> Option<String> {
    url.host_str().map(|s| s.to_lowercase())
}
