use axum::body::Body as AxumBody;
use axum::http::Request;

use fnbridge_core::body::Body;
use fnbridge_core::http::Request as CoreRequest;

/// Convert an Axum/Hyper request into the core model. Bodies stay streaming;
/// whether to buffer is the renderer's call, not the host's.
pub fn into_core_request(request: Request<AxumBody>) -> CoreRequest {
    let (parts, body) = request.into_parts();
    let body = Body::from_stream(body.into_data_stream());
    CoreRequest::from_parts(parts, body)
}
