use std::future::Future;
use std::pin::Pin;

use crate::body::Body;
use crate::error::BridgeError;

pub use http::header;
pub use http::request::Builder as RequestBuilder;
pub use http::response::Builder as ResponseBuilder;

pub type Method = http::Method;
pub type StatusCode = http::StatusCode;
pub type HeaderMap = http::HeaderMap;
pub type HeaderValue = http::HeaderValue;
pub type Uri = http::Uri;

pub type Request = http::Request<Body>;
pub type Response = http::Response<Body>;

pub fn request_builder() -> RequestBuilder {
    http::Request::builder()
}

pub fn response_builder() -> ResponseBuilder {
    http::Response::builder()
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response, BridgeError>> + 'static>>;
