use crate::body::Body;
use crate::http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE},
    response_builder, HeaderValue, Response, StatusCode,
};

/// Convert common handler return types into `Response`.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for Body {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, self)
    }
}

impl IntoResponse for &str {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, Body::text(self))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::OK, Body::text(self))
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        response_with_body(StatusCode::NO_CONTENT, Body::empty())
    }
}

impl<T> IntoResponse for (StatusCode, T)
where
    T: IntoResponse,
{
    fn into_response(self) -> Response {
        let (status, inner) = self;
        let mut response = inner.into_response();
        *response.status_mut() = status;
        response
    }
}

pub fn response_with_body(status: StatusCode, body: Body) -> Response {
    let mut builder = response_builder().status(status);

    if let Body::Once(ref bytes) = body {
        if !bytes.is_empty() {
            builder = builder.header(CONTENT_LENGTH, bytes.len().to_string()).header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }
    }

    builder
        .body(body)
        .expect("static response builder should not fail")
}
