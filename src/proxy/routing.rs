//! Path-prefix route matching.
//!
//! [`match_route`] walks the routes in declaration order and returns the
//! first one whose prefix starts the request path. This is not
//! longest-prefix matching: operators list the most specific prefixes
//! first, and validation rejects routes an earlier prefix makes
//! unreachable.

use crate::config::model::RouteConfig;

#[must_use]
pub fn match_route(routes: &[RouteConfig], path: &str) -> Option<usize> {
    routes.iter().position(|route| path.starts_with(&route.prefix))
}
