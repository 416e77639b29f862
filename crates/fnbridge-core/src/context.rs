use crate::http::Request;

/// Rewritable route path for one invocation.
///
/// Function platforms expose the request path as a value derived from the URI
/// and never let anything overwrite it, while server-rendered frameworks
/// expect to reassign the path during internal routing. This accessor pair is
/// seeded from the URI exactly once, and from then on `get` returns whatever
/// was last `set`. The URI itself is never touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePath {
    value: String,
}

impl RoutePath {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            value: initial.into(),
        }
    }

    pub fn get(&self) -> &str {
        &self.value
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

/// Where this invocation is mounted, threaded through request extensions.
///
/// Carries the deployed function name together with the base and trigger URLs
/// derived from it, so renderers can build correct relative and absolute
/// links without consulting process-wide state. One value per request;
/// concurrent invocations never observe each other's URLs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationContext {
    function_name: String,
    base_url: String,
    trigger_url: String,
}

impl InvocationContext {
    /// Derive the mount point from the deployed function name and the
    /// request's `host` header value.
    pub fn new(function_name: impl Into<String>, host: &str) -> Self {
        let function_name = function_name.into();
        let base_url = format!("/{function_name}");
        let trigger_url = format!("https://{host}/{function_name}/");
        Self {
            function_name,
            base_url,
            trigger_url,
        }
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn trigger_url(&self) -> &str {
        &self.trigger_url
    }

    pub fn insert(request: &mut Request, context: InvocationContext) {
        request.extensions_mut().insert(context);
    }

    pub fn get(request: &Request) -> Option<&InvocationContext> {
        request.extensions().get::<InvocationContext>()
    }
}

/// Request state passed through the chain for the duration of one HTTP
/// invocation, created by the hosting adapter and discarded after the
/// handler returns.
#[derive(Debug)]
pub struct RequestContext {
    request: Request,
    route_path: RoutePath,
}

impl RequestContext {
    /// Wrap a request, seeding the route path from the URI.
    pub fn new(request: Request) -> Self {
        let route_path = RoutePath::new(request.uri().path());
        Self {
            request,
            route_path,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn into_request(self) -> Request {
        self.request
    }

    pub fn route_path(&self) -> &RoutePath {
        &self.route_path
    }

    pub fn route_path_mut(&mut self) -> &mut RoutePath {
        &mut self.route_path
    }

    pub fn invocation(&self) -> Option<&InvocationContext> {
        InvocationContext::get(&self.request)
    }

    /// Path prefix the application is mounted under; empty when running
    /// standalone.
    pub fn base_url(&self) -> &str {
        self.invocation().map_or("", InvocationContext::base_url)
    }

    pub fn trigger_url(&self) -> Option<&str> {
        self.invocation().map(InvocationContext::trigger_url)
    }
}
