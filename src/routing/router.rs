//! Route registry.
//!
//! # Responsibilities
//! - Store routes in registration order
//! - Return every route matching a request, in that same order
//!
//! # Design Decisions
//! - Append-only: no deregistration, no uniqueness check
//! - Overlapping routes are legal; all of them are returned
//! - O(n) scan (acceptable for typical route counts)
//! - Frozen once handed to the dispatcher (no interior mutability)

use std::fmt;
use std::sync::Arc;

use crate::dispatch::handler::Handler;
use crate::routing::matcher::{MatchPolicy, Params, Pattern};
use crate::routing::method::Method;

/// A registered (pattern, method, handler) triple.
#[derive(Clone)]
pub struct Route {
    pattern: Pattern,
    method: Method,
    handler: Arc<dyn Handler>,
}

impl Route {
    pub fn new(pattern: Pattern, method: Method, handler: Arc<dyn Handler>) -> Self {
        Self {
            pattern,
            method,
            handler,
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    pub fn params_for(&self, path: &str) -> Params {
        self.pattern.extract_params(path)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.as_str())
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Insertion-ordered list of routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    policy: MatchPolicy,
}

impl RouteTable {
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            routes: Vec::new(),
            policy,
        }
    }

    pub fn register(&mut self, pattern: impl Into<Pattern>, method: Method, handler: Arc<dyn Handler>) {
        let pattern = pattern.into();
        tracing::debug!(pattern = %pattern.as_str(), method = %method, "Route registered");
        self.routes.push(Route::new(pattern, method, handler));
    }

    /// Every route accepting `path` and `method`, in registration order.
    pub fn all_matching(&self, path: &str, method: &str) -> Vec<&Route> {
        self.routes
            .iter()
            .filter(|route| route.method.accepts(method))
            .filter(|route| route.pattern.matches_path(path, self.policy))
            .collect()
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: MatchPolicy) {
        self.policy = policy;
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::handler::{handler_fn, Reply};

    fn noop() -> Arc<dyn Handler> {
        handler_fn(|_req, _res, _next| async { Ok(Reply::NoValue) })
    }

    fn patterns(routes: &[&Route]) -> Vec<String> {
        routes
            .iter()
            .map(|r| format!("{} {}", r.method(), r.pattern().as_str()))
            .collect()
    }

    #[test]
    fn keeps_registration_order_for_overlapping_routes() {
        let mut table = RouteTable::default();
        table.register("/log", Method::Any, noop());
        table.register("/users/:id", Method::Get, noop());
        table.register("/log", Method::Get, noop());
        table.register("*", Method::Any, noop());

        let hits = table.all_matching("/log", "GET");
        assert_eq!(patterns(&hits), vec!["* /log", "GET /log", "* *"]);
    }

    #[test]
    fn filters_on_method() {
        let mut table = RouteTable::default();
        table.register("/items", Method::Get, noop());
        table.register("/items", Method::Post, noop());

        assert_eq!(patterns(&table.all_matching("/items", "POST")), vec!["POST /items"]);
        assert!(table.all_matching("/items", "DELETE").is_empty());
    }

    #[test]
    fn duplicates_are_allowed() {
        let mut table = RouteTable::default();
        table.register("/a", Method::Get, noop());
        table.register("/a", Method::Get, noop());
        assert_eq!(table.len(), 2);
        assert_eq!(table.all_matching("/a", "GET").len(), 2);
    }

    #[test]
    fn policy_governs_short_requests() {
        let mut table = RouteTable::new(MatchPolicy::RequestBounded);
        table.register("/a/b", Method::Get, noop());
        assert_eq!(table.all_matching("/a", "GET").len(), 1);

        table.set_policy(MatchPolicy::Exact);
        assert!(table.all_matching("/a", "GET").is_empty());
    }
}
