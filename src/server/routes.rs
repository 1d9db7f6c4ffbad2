//! Route table: method + path pattern -> endpoint.
//!
//! Built once at startup from [`ROUTES`]. Entries are tried in order. A
//! `{name}` capture takes the rest of the path verbatim, so names may
//! contain `/`; the root catch-all only matches a single segment.

use crate::api::ApiCall;

/// Endpoint an entry dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Version,
    Objects,
    Object,
    Collections,
    Collection,
    Materials,
    Material,
    Texts,
    RunScript,
    ExportScene,
    Greeting,
}

/// Declarative route list: (method, pattern, endpoint).
pub const ROUTES: &[(&str, &str, Endpoint)] = &[
    ("GET", "/version", Endpoint::Version),
    ("GET", "/objects", Endpoint::Objects),
    ("GET", "/object/{name}", Endpoint::Object),
    ("GET", "/collections", Endpoint::Collections),
    ("GET", "/collection/{name}", Endpoint::Collection),
    ("GET", "/materials", Endpoint::Materials),
    ("GET", "/material/{name}", Endpoint::Material),
    ("GET", "/texts", Endpoint::Texts),
    ("POST", "/run_script/{name}", Endpoint::RunScript),
    ("POST", "/export_scene", Endpoint::ExportScene),
    ("GET", "/{name}", Endpoint::Greeting),
];

const CAPTURE: &str = "{name}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    /// Everything after the prefix
    Rest,
    /// One non-empty segment
    Segment,
}

#[derive(Debug, Clone)]
struct Route {
    method: &'static str,
    prefix: &'static str,
    capture: Capture,
    endpoint: Endpoint,
}

impl Route {
    fn parse(method: &'static str, pattern: &'static str, endpoint: Endpoint) -> Self {
        let (prefix, capture) = match pattern.strip_suffix(CAPTURE) {
            Some("/") => ("/", Capture::Segment),
            Some(prefix) => (prefix, Capture::Rest),
            None => (pattern, Capture::None),
        };
        Self { method, prefix, capture, endpoint }
    }

    /// Captured name (empty for fixed routes) if `path` matches.
    fn matches<'p>(&self, method: &str, path: &'p str) -> Option<&'p str> {
        if !self.method.eq_ignore_ascii_case(method) {
            return None;
        }
        match self.capture {
            Capture::None => (path == self.prefix).then_some(""),
            Capture::Rest => path.strip_prefix(self.prefix).filter(|rest| !rest.is_empty()),
            Capture::Segment => path
                .strip_prefix(self.prefix)
                .filter(|rest| !rest.is_empty() && !rest.contains('/')),
        }
    }
}

impl Endpoint {
    fn call(self, name: &str) -> ApiCall {
        let name = name.to_string();
        match self {
            Endpoint::Version => ApiCall::Version,
            Endpoint::Objects => ApiCall::Objects,
            Endpoint::Object => ApiCall::Object(name),
            Endpoint::Collections => ApiCall::Collections,
            Endpoint::Collection => ApiCall::Collection(name),
            Endpoint::Materials => ApiCall::Materials,
            Endpoint::Material => ApiCall::Material(name),
            Endpoint::Texts => ApiCall::Texts,
            Endpoint::RunScript => ApiCall::RunScript(name),
            Endpoint::ExportScene => ApiCall::ExportScene,
            Endpoint::Greeting => ApiCall::Greeting(name),
        }
    }
}

/// Static routing table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        let routes = ROUTES
            .iter()
            .map(|&(method, pattern, endpoint)| Route::parse(method, pattern, endpoint))
            .collect();
        Self { routes }
    }

    /// Resolve a request to a call. `path` is the decoded path without query.
    pub fn lookup(&self, method: &str, path: &str) -> Option<ApiCall> {
        self.routes
            .iter()
            .find_map(|route| route.matches(method, path).map(|name| route.endpoint.call(name)))
    }
}
