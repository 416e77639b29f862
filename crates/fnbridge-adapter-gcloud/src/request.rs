use fnbridge_core::app::AppHandler;
use fnbridge_core::config::ENV_FUNCTION_TARGET;
use fnbridge_core::context::{InvocationContext, RequestContext};
use fnbridge_core::error::BridgeError;
use fnbridge_core::http::{header::HOST, Request, Response};

/// Name of the deployed function, as announced by the platform runtime.
pub fn function_target() -> Result<String, BridgeError> {
    std::env::var(ENV_FUNCTION_TARGET)
        .ok()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| BridgeError::config(format!("{ENV_FUNCTION_TARGET} is not set")))
}

/// Prepare one platform request for the application handler.
///
/// Seeds the rewritable route path from the URI and derives the mount point
/// (base URL, trigger URL) from the function name and the request's `host`
/// header. Applied exactly once per invocation, before the handler sees the
/// request; nothing outlives the returned context.
pub fn adapt_request(
    mut request: Request,
    function_name: &str,
) -> Result<RequestContext, BridgeError> {
    let host = request
        .headers()
        .get(HOST)
        .ok_or_else(|| BridgeError::bad_request("missing host header"))?
        .to_str()
        .map_err(|_| BridgeError::bad_request("host header is not valid UTF-8"))?
        .to_owned();

    InvocationContext::insert(&mut request, InvocationContext::new(function_name, &host));
    Ok(RequestContext::new(request))
}

/// Per-invocation entry point: adapt the request, then delegate to the
/// application handler without inspecting the result. Errors propagate
/// unchanged to the platform, which surfaces them as 5xx per its own
/// convention.
pub async fn dispatch(app: &AppHandler, request: Request) -> Result<Response, BridgeError> {
    let function_name = function_target()?;
    let ctx = adapt_request(request, &function_name)?;
    app.handle(ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use fnbridge_core::body::Body;
    use fnbridge_core::http::{request_builder, HeaderValue, Method, StatusCode};
    use serial_test::serial;

    fn request_with_host(host: Option<&str>) -> Request {
        let mut builder = request_builder().method(Method::GET).uri("/blog/post");
        if let Some(host) = host {
            builder = builder.header(HOST, host);
        }
        builder.body(Body::empty()).expect("request")
    }

    #[test]
    fn adapt_request_derives_mount_point() {
        let ctx = adapt_request(request_with_host(Some("example.com")), "ssr").expect("context");
        assert_eq!(ctx.base_url(), "/ssr");
        assert_eq!(ctx.trigger_url(), Some("https://example.com/ssr/"));
        assert_eq!(ctx.route_path().get(), "/blog/post");
    }

    #[test]
    fn missing_host_header_is_a_bad_request() {
        let err = adapt_request(request_with_host(None), "ssr").expect_err("error");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().contains("host"));
    }

    #[test]
    fn non_utf8_host_header_is_a_bad_request() {
        let mut request = request_with_host(None);
        request.headers_mut().insert(
            HOST,
            HeaderValue::from_bytes(b"\xffexample.com").expect("header value"),
        );
        let err = adapt_request(request, "ssr").expect_err("error");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    #[serial]
    fn function_target_requires_the_variable() {
        std::env::remove_var(ENV_FUNCTION_TARGET);
        let err = function_target().expect_err("error");
        assert!(err.message().contains(ENV_FUNCTION_TARGET));

        std::env::set_var(ENV_FUNCTION_TARGET, "ssr");
        assert_eq!(function_target().expect("name"), "ssr");
        std::env::remove_var(ENV_FUNCTION_TARGET);
    }
}
