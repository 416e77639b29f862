use axum::body::Body as AxumBody;
use axum::http::{Response, StatusCode};
use futures::executor::block_on;
use futures_util::{pin_mut, StreamExt};
use tracing::error;

use fnbridge_core::body::Body;
use fnbridge_core::http::Response as CoreResponse;

/// Convert a core response into one consumable by Axum/Hyper.
///
/// Streaming responses are collected into an in-memory buffer first. That
/// gives up incremental flushing, but keeps the host compatible with the
/// non-`Send` streaming bodies the core uses, which is an acceptable trade
/// for a standalone/dev listener.
pub fn into_axum_response(response: CoreResponse) -> Response<AxumBody> {
    let (parts, body) = response.into_parts();
    let body = match body {
        Body::Once(bytes) => AxumBody::from(bytes),
        Body::Stream(stream) => {
            let collected = block_on(async {
                let mut buf = Vec::new();
                pin_mut!(stream);
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok::<Vec<u8>, anyhow::Error>(buf)
            });
            match collected {
                Ok(buf) => AxumBody::from(buf),
                Err(err) => {
                    error!("streaming response error: {err}");
                    let mut response =
                        Response::new(AxumBody::from("streaming response error"));
                    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                    response.headers_mut().insert(
                        axum::http::header::CONTENT_TYPE,
                        axum::http::HeaderValue::from_static("text/plain; charset=utf-8"),
                    );
                    return response;
                }
            }
        }
    };

    Response::from_parts(parts, body)
}
