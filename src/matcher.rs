//! Path segment matching
//!
//! Every route node owns a [`MatchPattern`]. Given the part of the path its
//! parent left over, [`match_path`] decides whether the node consumes a
//! segment and what remains for its descendants.
//!
//! Remainders always begin with the separator (`/account/42`, `/42`) or are
//! empty. A pattern only ever consumes whole segments: `acc` does not match
//! `/account`.

use crate::error::RouteError;
use regex::Regex;
use std::fmt;

/// Path separator
pub const SEPARATOR: char = '/';

/// How a route node consumes the path
#[derive(Clone)]
pub enum MatchPattern {
    /// Exactly this text as one segment (may be empty, matching `/`)
    Literal(String),
    /// Any single non-empty segment, captured as a parameter
    Segment,
    /// Everything that is left, captured as a parameter
    Rest,
    /// A custom pattern that must match at the start of the remainder and end
    /// on a segment boundary, captured as a parameter
    Regex(Regex),
    /// Consumes nothing and is always compatible; used for grouping nodes
    Compatible,
}

impl MatchPattern {
    /// Literal segment pattern
    pub fn literal(text: impl Into<String>) -> Self {
        MatchPattern::Literal(text.into())
    }

    /// Compile a custom pattern
    pub fn regex(pattern: &str) -> Result<Self, RouteError> {
        Regex::new(pattern)
            .map(MatchPattern::Regex)
            .map_err(|err| RouteError::InvalidPattern {
                pattern: pattern.to_string(),
                message: err.to_string(),
            })
    }

    /// Whether a consumed segment is exposed as a named parameter
    pub fn captures_param(&self) -> bool {
        matches!(
            self,
            MatchPattern::Segment | MatchPattern::Rest | MatchPattern::Regex(_)
        )
    }

    /// Whether the pattern contributes a segment to generated references
    pub fn contributes_segment(&self) -> bool {
        !matches!(self, MatchPattern::Compatible)
    }
}

impl fmt::Debug for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchPattern::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            MatchPattern::Segment => f.write_str("Segment"),
            MatchPattern::Rest => f.write_str("Rest"),
            MatchPattern::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            MatchPattern::Compatible => f.write_str("Compatible"),
        }
    }
}

impl PartialEq for MatchPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatchPattern::Literal(a), MatchPattern::Literal(b)) => a == b,
            (MatchPattern::Regex(a), MatchPattern::Regex(b)) => a.as_str() == b.as_str(),
            (MatchPattern::Segment, MatchPattern::Segment)
            | (MatchPattern::Rest, MatchPattern::Rest)
            | (MatchPattern::Compatible, MatchPattern::Compatible) => true,
            _ => false,
        }
    }
}

impl From<&str> for MatchPattern {
    fn from(text: &str) -> Self {
        MatchPattern::literal(text)
    }
}

/// Result of matching one node against a remainder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Whether the node matched
    pub matched: bool,
    /// The consumed segment; `None` for a miss or a zero-width match
    pub segment: Option<String>,
    /// What is left for descendants; empty on a miss
    pub rest: String,
}

impl MatchOutcome {
    fn miss() -> Self {
        Self {
            matched: false,
            segment: None,
            rest: String::new(),
        }
    }

    fn zero_width(remainder: &str) -> Self {
        Self {
            matched: true,
            segment: None,
            rest: remainder.to_string(),
        }
    }

    fn hit(segment: &str, rest: &str) -> Self {
        Self {
            matched: true,
            segment: Some(segment.to_string()),
            rest: rest.to_string(),
        }
    }
}

/// `path` starts with `prefix`, and `prefix` ends on a segment boundary
///
/// ```
/// use route_tree::is_path_prefix;
///
/// assert!(is_path_prefix("account/42", "account"));
/// assert!(is_path_prefix("account", "account"));
/// assert!(!is_path_prefix("accounts", "account"));
/// ```
pub fn is_path_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(after) => after.is_empty() || after.starts_with(SEPARATOR) || after.starts_with('?'),
        None => false,
    }
}

/// Match `remainder` against `pattern`
///
/// Fails only when a non-empty remainder does not start with [`SEPARATOR`],
/// which means the path was not segmented correctly upstream.
///
/// # Example
///
/// ```
/// use route_tree::{match_path, MatchPattern};
///
/// let outcome = match_path("/account/42", &MatchPattern::literal("account")).unwrap();
/// assert!(outcome.matched);
/// assert_eq!(outcome.rest, "/42");
///
/// let outcome = match_path("/42", &MatchPattern::Segment).unwrap();
/// assert_eq!(outcome.segment.as_deref(), Some("42"));
/// assert_eq!(outcome.rest, "");
/// ```
pub fn match_path(remainder: &str, pattern: &MatchPattern) -> Result<MatchOutcome, RouteError> {
    if let MatchPattern::Compatible = pattern {
        return Ok(MatchOutcome::zero_width(remainder));
    }

    if remainder.is_empty() {
        return Ok(MatchOutcome::miss());
    }

    let Some(path) = remainder.strip_prefix(SEPARATOR) else {
        return Err(RouteError::MalformedPath {
            rest: remainder.to_string(),
        });
    };

    let outcome = match pattern {
        MatchPattern::Literal(text) => {
            if is_path_prefix(path, text) {
                MatchOutcome::hit(text, &path[text.len()..])
            } else {
                MatchOutcome::miss()
            }
        }
        MatchPattern::Segment => {
            let end = path.find(SEPARATOR).unwrap_or(path.len());
            if end == 0 {
                MatchOutcome::miss()
            } else {
                MatchOutcome::hit(&path[..end], &path[end..])
            }
        }
        MatchPattern::Rest => {
            if path.is_empty() {
                MatchOutcome::miss()
            } else {
                MatchOutcome::hit(path, "")
            }
        }
        MatchPattern::Regex(re) => match re.find(path) {
            Some(found) if found.start() == 0 && is_path_prefix(path, found.as_str()) => {
                MatchOutcome::hit(found.as_str(), &path[found.end()..])
            }
            _ => MatchOutcome::miss(),
        },
        MatchPattern::Compatible => MatchOutcome::zero_width(remainder),
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(text: &str) -> MatchPattern {
        MatchPattern::literal(text)
    }

    #[test]
    fn test_empty_remainder_never_matches() {
        for pattern in [literal("a"), literal(""), MatchPattern::Segment, MatchPattern::Rest] {
            let outcome = match_path("", &pattern).unwrap();
            assert!(!outcome.matched);
            assert_eq!(outcome.rest, "");
        }
    }

    #[test]
    fn test_malformed_remainder_is_an_error() {
        let err = match_path("account", &literal("account")).unwrap_err();
        assert_eq!(
            err,
            RouteError::MalformedPath {
                rest: "account".to_string()
            }
        );
    }

    #[test]
    fn test_literal_boundaries() {
        let cases = [
            ("/account", true, ""),
            ("/account/42", true, "/42"),
            ("/accounts", false, ""),
            ("/acc", false, ""),
            ("/other/account", false, ""),
        ];

        for (remainder, matched, rest) in cases {
            let outcome = match_path(remainder, &literal("account")).unwrap();
            assert_eq!(outcome.matched, matched, "{remainder}");
            assert_eq!(outcome.rest, rest, "{remainder}");
            assert_eq!(outcome.segment.is_some(), matched);
        }
    }

    #[test]
    fn test_empty_literal_matches_root_only() {
        let outcome = match_path("/", &literal("")).unwrap();
        assert!(outcome.matched);
        assert_eq!(outcome.segment.as_deref(), Some(""));
        assert_eq!(outcome.rest, "");

        assert!(!match_path("/about", &literal("")).unwrap().matched);
    }

    #[test]
    fn test_segment_and_rest() {
        let outcome = match_path("/123/edit", &MatchPattern::Segment).unwrap();
        assert_eq!(outcome.segment.as_deref(), Some("123"));
        assert_eq!(outcome.rest, "/edit");

        assert!(!match_path("/", &MatchPattern::Segment).unwrap().matched);

        let outcome = match_path("/docs/a/b.md", &MatchPattern::Rest).unwrap();
        assert_eq!(outcome.segment.as_deref(), Some("docs/a/b.md"));
        assert_eq!(outcome.rest, "");
    }

    #[test]
    fn test_regex_must_be_anchored_on_boundaries() {
        let digits = MatchPattern::regex(r"\d+").unwrap();

        let outcome = match_path("/42/edit", &digits).unwrap();
        assert_eq!(outcome.segment.as_deref(), Some("42"));
        assert_eq!(outcome.rest, "/edit");

        // Found, but not at position 0
        assert!(!match_path("/x42", &digits).unwrap().matched);
        // Found at 0, but ends mid-segment
        assert!(!match_path("/42x", &digits).unwrap().matched);
    }

    #[test]
    fn test_invalid_regex() {
        assert!(matches!(
            MatchPattern::regex("("),
            Err(RouteError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_compatible_consumes_nothing() {
        for remainder in ["", "/a/b"] {
            let outcome = match_path(remainder, &MatchPattern::Compatible).unwrap();
            assert!(outcome.matched);
            assert_eq!(outcome.segment, None);
            assert_eq!(outcome.rest, remainder);
        }
    }

    #[test]
    fn test_is_path_prefix_query_boundary() {
        assert!(is_path_prefix("about?x=1", "about"));
        assert!(is_path_prefix("/next", ""));
        assert!(!is_path_prefix("anything", ""));
        assert!(!is_path_prefix("ab", "abc"));
    }

    #[test]
    fn test_pattern_classification() {
        assert!(MatchPattern::Segment.captures_param());
        assert!(!literal("a").captures_param());
        assert!(!MatchPattern::Compatible.contributes_segment());
        assert_eq!(MatchPattern::from("x"), literal("x"));
    }
}
