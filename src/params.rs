//! Route parameter and query string dictionaries
//!
//! [`RouteParams`] is the flat dictionary a route exposes: named path segments
//! captured along its ancestry plus the query keys it recognizes.
//! [`QueryParams`] is the multi-valued dictionary parsed from `?key=value&...`.
//!
//! Both keep their keys ordered so generated references are deterministic.

use std::collections::BTreeMap;

/// Route parameters captured from path segments and recognized query keys
///
/// # Example
///
/// ```
/// use route_tree::RouteParams;
///
/// let params = RouteParams::new().with("id", "123");
///
/// assert_eq!(params.get("id"), Some("123"));
/// assert_eq!(params.get_as::<i32>("id"), Some(123));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: BTreeMap<String, String>,
}

impl RouteParams {
    /// Create new empty route params
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Get a parameter value as a string
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Get a parameter and parse it as a specific type
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.params.get(key)?.parse().ok()
    }

    /// Insert a parameter, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Merge `other` into `self`; values from `other` win
    pub fn extend(&mut self, other: &RouteParams) {
        for (key, value) in other.iter() {
            self.params.insert(key.clone(), value.clone());
        }
    }

    /// Iterate over all parameters in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params.iter()
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RouteParams::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Query parameters parsed from a URL query string
///
/// Supports multiple values for the same key.
///
/// # Example
///
/// ```
/// use route_tree::QueryParams;
///
/// let query = QueryParams::from_query_string("page=1&sort=name&tag=rust&tag=ui");
///
/// assert_eq!(query.get("page"), Some("1"));
/// assert_eq!(query.get_as::<i32>("page"), Some(1));
/// assert_eq!(query.get_all("tag").len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create new empty query params
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a query string, with or without the leading `?`
    ///
    /// A pair without `=` yields an empty value; empty pairs are skipped.
    pub fn from_query_string(query: &str) -> Self {
        let mut params = Self::new();

        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.insert(decode_component(key), decode_component(value));
        }

        params
    }

    /// Get first value for a parameter
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.first().map(String::as_str)
    }

    /// Get all values for a parameter (empty when absent)
    pub fn get_all(&self, key: &str) -> &[String] {
        self.params.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Get first value parsed as type T
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Append a value; an existing key keeps its previous values
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Replace every value of `key` with a single value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), vec![value.into()]);
    }

    /// Remove a key, returning its values
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.params.remove(key)
    }

    /// Check if parameter exists
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Iterate over `(key, values)` in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.params.iter()
    }

    /// Convert to query string (without the leading `?`)
    ///
    /// # Example
    ///
    /// ```
    /// use route_tree::QueryParams;
    ///
    /// let mut query = QueryParams::new();
    /// query.insert("q", "hello world");
    /// assert_eq!(query.to_query_string(), "q=hello%20world");
    /// ```
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .flat_map(|(key, values)| {
                values.iter().map(move |value| {
                    format!(
                        "{}={}",
                        urlencoding::encode(key),
                        urlencoding::encode(value)
                    )
                })
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Check if parameters are empty
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get number of unique parameter keys
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

/// Decode one query component; `+` is a space, bad escapes are kept verbatim.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_params_basic() {
        let mut params = RouteParams::new();
        params.insert("id", "123");

        assert_eq!(params.get("id"), Some("123"));
        assert!(params.contains("id"));
        assert!(!params.contains("missing"));
    }

    #[test]
    fn test_route_params_get_as() {
        let params = RouteParams::new().with("id", "123").with("active", "true");

        assert_eq!(params.get_as::<i32>("id"), Some(123));
        assert_eq!(params.get_as::<bool>("active"), Some(true));
        assert_eq!(params.get_as::<i32>("missing"), None);
    }

    #[test]
    fn test_route_params_extend_overrides() {
        let mut params = RouteParams::new().with("a", "1").with("b", "2");
        params.extend(&RouteParams::new().with("b", "3"));

        assert_eq!(params.get("a"), Some("1"));
        assert_eq!(params.get("b"), Some("3"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_route_params_from_iter_is_ordered() {
        let params: RouteParams = [("y", "2"), ("x", "1")].into_iter().collect();
        let keys: Vec<_> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[test]
    fn test_query_params_basic() {
        let query = QueryParams::from_query_string("?page=1&sort=name&flag");

        assert_eq!(query.get("page"), Some("1"));
        assert_eq!(query.get("sort"), Some("name"));
        assert_eq!(query.get("flag"), Some(""));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn test_query_params_multiple_values() {
        let query = QueryParams::from_query_string("tag=rust&tag=ui");

        assert_eq!(query.get_all("tag"), ["rust".to_string(), "ui".to_string()]);
        assert_eq!(query.get("tag"), Some("rust"));
        assert!(query.get_all("missing").is_empty());
    }

    #[test]
    fn test_query_params_set_replaces() {
        let mut query = QueryParams::new();
        query.insert("key", "value1");
        query.insert("key", "value2");
        assert_eq!(query.get_all("key").len(), 2);

        query.set("key", "value3");
        assert_eq!(query.get_all("key"), ["value3".to_string()]);
    }

    #[test]
    fn test_decoding() {
        let query = QueryParams::from_query_string("q=hello%20world&p=a+b&bad=%zz");
        assert_eq!(query.get("q"), Some("hello world"));
        assert_eq!(query.get("p"), Some("a b"));
        assert_eq!(query.get("bad"), Some("%zz"));
    }

    #[test]
    fn test_to_query_string_is_sorted_and_encoded() {
        let mut query = QueryParams::new();
        query.insert("sort", "name");
        query.insert("page", "1");
        query.insert("mail", "a@b.c");

        assert_eq!(query.to_query_string(), "mail=a%40b.c&page=1&sort=name");
    }

    #[test]
    fn test_empty_query_string() {
        let query = QueryParams::from_query_string("");
        assert!(query.is_empty());
        assert_eq!(query.to_query_string(), "");
    }
}
