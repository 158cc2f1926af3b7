use url::Url;

/// Returns the first non-empty value of a query parameter
pub fn first_query_value(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Builds a canonical query string: pairs decoded, sorted by key then value,
/// re-joined with `&`
///
/// The raw query string of two equivalent links can differ in parameter
/// order; the canonical form does not.
pub fn canonical_query(url: &Url) -> String {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();

    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
