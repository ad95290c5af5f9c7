//! Navigation locations
//!
//! A [`Location`] is what the history collaborator reports: the primary path,
//! the query dictionary, and one path per active parallel group. Group paths
//! travel inside the query string under `_<group>` keys, so
//! `/inbox?_sidebar=/contacts/7&page=2` has primary path `/inbox`, query
//! `page=2` and the `sidebar` group at `/contacts/7`.

use crate::params::QueryParams;
use std::collections::BTreeMap;

/// Query key prefix marking a parallel group path
pub const GROUP_KEY_PREFIX: char = '_';

/// A parsed navigation target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Primary path, e.g. `/account/42`
    pub path: String,
    /// Query parameters, group keys excluded
    pub query: QueryParams,
    /// Group tag to group path
    pub groups: BTreeMap<String, String>,
}

impl Location {
    /// Create a location with only a primary path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Parse an href of the form `path?query#fragment`
    ///
    /// The fragment is discarded. An empty path is kept empty; the reconciler
    /// treats it as "nothing to match".
    pub fn parse(href: &str) -> Self {
        let href = href.split_once('#').map_or(href, |(before, _)| before);
        let (path, query) = href.split_once('?').unwrap_or((href, ""));

        let mut query = QueryParams::from_query_string(query);
        let group_keys: Vec<String> = query
            .iter()
            .map(|(key, _)| key)
            .filter(|key| key.len() > 1 && key.starts_with(GROUP_KEY_PREFIX))
            .cloned()
            .collect();

        let mut groups = BTreeMap::new();
        for key in group_keys {
            if let Some(values) = query.remove(&key) {
                if let Some(path) = values.into_iter().next() {
                    groups.insert(key[1..].to_string(), path);
                }
            }
        }

        Self {
            path: path.to_string(),
            query,
            groups,
        }
    }

    /// Builder-style query insert
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key, value);
        self
    }

    /// Builder-style group path
    pub fn with_group(mut self, group: impl Into<String>, path: impl Into<String>) -> Self {
        self.groups.insert(group.into(), path.into());
        self
    }

    /// Path for the primary branch (`None`) or a named group
    pub fn path_for(&self, group: Option<&str>) -> Option<&str> {
        match group {
            None => Some(self.path.as_str()),
            Some(group) => self.groups.get(group).map(String::as_str),
        }
    }

    /// Format back into an href; an empty primary path renders as `/`
    pub fn to_href(&self) -> String {
        let mut query = self.query.clone();
        for (group, path) in &self.groups {
            query.set(format!("{}{}", GROUP_KEY_PREFIX, group), path.clone());
        }

        let path = if self.path.is_empty() { "/" } else { &self.path };
        let query = query.to_query_string();

        if query.is_empty() {
            path.to_string()
        } else {
            format!("{}?{}", path, query)
        }
    }
}
