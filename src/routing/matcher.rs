//! Route pattern matching.
//!
//! # Responsibilities
//! - Parse route patterns into literal, wildcard and parameter segments
//! - Decide whether a pattern and method accept a concrete request
//! - Extract named parameters from a matched path
//!
//! # Design Decisions
//! - Patterns are split on `/` without dropping empty segments, so `/users`
//!   is `["", "users"]` and `/users/` is `["", "users", ""]`
//! - `*` matches exactly one segment; a pattern of exactly `*` matches any path
//! - The query string is cut at the first `?` before segmenting
//! - Literal comparison is case-sensitive
//! - No regex to guarantee O(n) matching

use serde::{Deserialize, Serialize};

use crate::routing::method::Method;

/// How the segment walk treats patterns longer than the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Request and pattern must have the same number of segments.
    #[default]
    Exact,
    /// Walk only the request's segments. Pattern segments past the end of
    /// the request are never inspected, so `/a/b` accepts `/a`.
    RequestBounded,
}

/// One `/`-separated piece of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// `*`: any single segment.
    Wildcard,
    /// `:name`: any single segment, captured under `name`.
    Param(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if raw == "*" {
            Segment::Wildcard
        } else if let Some(name) = raw.strip_prefix(':') {
            Segment::Param(name.to_string())
        } else {
            Segment::Literal(raw.to_string())
        }
    }

    fn accepts(&self, part: &str) -> bool {
        match self {
            Segment::Wildcard | Segment::Param(_) => true,
            Segment::Literal(expected) => expected == part,
        }
    }
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    /// `None` for the catch-all pattern `*`.
    segments: Option<Vec<Segment>>,
}

impl Pattern {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = if raw == "*" {
            None
        } else {
            Some(raw.split('/').map(Segment::parse).collect())
        };
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_catch_all(&self) -> bool {
        self.segments.is_none()
    }

    pub fn segments(&self) -> &[Segment] {
        self.segments.as_deref().unwrap_or(&[])
    }

    /// Returns true if `path` satisfies this pattern under `policy`.
    pub fn matches_path(&self, path: &str, policy: MatchPolicy) -> bool {
        let Some(segments) = &self.segments else {
            return true;
        };

        let parts: Vec<&str> = split_path(path).collect();
        if policy == MatchPolicy::Exact && parts.len() != segments.len() {
            return false;
        }

        parts
            .iter()
            .enumerate()
            .all(|(index, part)| segments.get(index).is_some_and(|s| s.accepts(part)))
    }

    /// Captures every `:name` segment against the corresponding path segment.
    ///
    /// The walk stops where either the path or the pattern runs out.
    pub fn extract_params(&self, path: &str) -> Params {
        let mut params = Params::new();
        for (segment, part) in self.segments().iter().zip(split_path(path)) {
            if let Segment::Param(name) = segment {
                params.insert(name.clone(), part);
            }
        }
        params
    }
}

impl From<&str> for Pattern {
    fn from(raw: &str) -> Self {
        Pattern::parse(raw)
    }
}

impl From<String> for Pattern {
    fn from(raw: String) -> Self {
        Pattern::parse(raw)
    }
}

/// Named path parameters captured for one matched route, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`; a repeated name keeps its first position and takes the new value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decides whether a route (`pattern`, `route_method`) accepts a request.
pub fn matches(
    request_path: &str,
    pattern: &Pattern,
    request_method: &str,
    route_method: Method,
    policy: MatchPolicy,
) -> bool {
    route_method.accepts(request_method) && pattern.matches_path(request_path, policy)
}

/// Extracts named parameters of `pattern` from `request_path`.
pub fn extract_params(request_path: &str, pattern: &Pattern) -> Params {
    pattern.extract_params(request_path)
}

fn split_path(path: &str) -> std::str::Split<'_, char> {
    let path = path.split_once('?').map_or(path, |(before, _)| before);
    path.split('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(path: &str, pattern: &str) -> bool {
        Pattern::parse(pattern).matches_path(path, MatchPolicy::Exact)
    }

    #[test]
    fn literal_patterns_need_identical_segments() {
        assert!(hit("/users", "/users"));
        assert!(hit("/api/v1/users", "/api/v1/users"));
        assert!(!hit("/users", "/Users"));
        assert!(!hit("/users/", "/users"));
        assert!(!hit("/users/1", "/users"));
        assert!(!hit("/posts", "/users"));
    }

    #[test]
    fn root_pattern() {
        assert!(hit("/", "/"));
        assert!(!hit("/users", "/"));
        assert!(!hit("/", "/users"));
    }

    #[test]
    fn wildcard_segment_matches_one_component() {
        assert!(hit("/static/app.js", "/static/*"));
        assert!(hit("/static/", "/static/*"));
        assert!(!hit("/static/css/app.css", "/static/*"));
        assert!(hit("/a/x/c", "/a/*/c"));
    }

    #[test]
    fn catch_all_pattern_matches_any_path() {
        let pattern = Pattern::parse("*");
        assert!(pattern.is_catch_all());
        for path in ["/", "", "/a/b/c", "/x?y=1"] {
            assert!(pattern.matches_path(path, MatchPolicy::Exact));
            assert!(pattern.matches_path(path, MatchPolicy::RequestBounded));
        }
    }

    #[test]
    fn params_match_any_segment() {
        assert!(hit("/users/42", "/users/:id"));
        assert!(hit("/users/abc", "/users/:id"));
        assert!(!hit("/users", "/users/:id"));
        assert!(!hit("/users/42/posts", "/users/:id"));
    }

    #[test]
    fn query_string_is_ignored() {
        assert!(hit("/users/42?expand=true", "/users/:id"));
        assert!(hit("/search?q=a/b", "/search"));
    }

    #[test]
    fn request_bounded_policy_ignores_extra_pattern_segments() {
        let pattern = Pattern::parse("/a/b");
        assert!(pattern.matches_path("/a", MatchPolicy::RequestBounded));
        assert!(!pattern.matches_path("/a", MatchPolicy::Exact));

        // Longer requests still fail once the pattern runs out.
        assert!(!pattern.matches_path("/a/b/c", MatchPolicy::RequestBounded));
        assert!(pattern.matches_path("/a/b", MatchPolicy::RequestBounded));
    }

    #[test]
    fn method_filter_applies_to_catch_all() {
        let pattern = Pattern::parse("*");
        assert!(matches("/x", &pattern, "GET", Method::Get, MatchPolicy::Exact));
        assert!(!matches("/x", &pattern, "POST", Method::Get, MatchPolicy::Exact));
        assert!(matches("/x", &pattern, "POST", Method::Any, MatchPolicy::Exact));
    }

    #[test]
    fn extract_params_in_pattern_order() {
        let pattern = Pattern::parse("/posts/:postId/comments/:commentId");
        let params = extract_params("/posts/1/comments/2?sort=asc", &pattern);

        let collected: Vec<_> = params.iter().collect();
        assert_eq!(collected, vec![("postId", "1"), ("commentId", "2")]);
    }

    #[test]
    fn extract_params_stops_where_path_ends() {
        let pattern = Pattern::parse("/a/:first/:second");
        let params = pattern.extract_params("/a/one");
        assert_eq!(params.get("first"), Some("one"));
        assert_eq!(params.get("second"), None);
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn repeated_param_name_keeps_last_value() {
        let pattern = Pattern::parse("/:id/:id");
        let params = pattern.extract_params("/1/2");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("2"));
    }

    #[test]
    fn segments_are_classified() {
        let pattern = Pattern::parse("/files/*/:name");
        assert_eq!(
            pattern.segments(),
            &[
                Segment::Literal(String::new()),
                Segment::Literal("files".into()),
                Segment::Wildcard,
                Segment::Param("name".into()),
            ]
        );
    }
}
