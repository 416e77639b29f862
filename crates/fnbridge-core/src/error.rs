use anyhow::Error as AnyError;
use serde_json::json;
use thiserror::Error;

use crate::body::Body;
use crate::http::{header::CONTENT_TYPE, HeaderValue, Response, StatusCode};
use crate::response::{response_with_body, IntoResponse};

/// Error surfaced by the adapter and handler chain. Carries an HTTP status so
/// the outermost edge can turn it into a response; everything below that edge
/// simply propagates with `?`.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("{message}")]
    BadRequest { message: String },
    #[error("no route matched path: {path}")]
    NotFound { path: String },
    #[error("configuration error: {message}")]
    Config { message: String },
    #[error("internal error: {source}")]
    Internal {
        #[from]
        source: AnyError,
    },
}

impl BridgeError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        BridgeError::BadRequest {
            message: message.into(),
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        BridgeError::NotFound { path: path.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        BridgeError::Config {
            message: message.into(),
        }
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: Into<AnyError>,
    {
        BridgeError::Internal {
            source: error.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BridgeError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            BridgeError::NotFound { .. } => StatusCode::NOT_FOUND,
            BridgeError::Config { .. } | BridgeError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let payload = json!({
            "error": {
                "status": self.status().as_u16(),
                "message": self.message(),
            }
        });

        let body = Body::json(&payload).unwrap_or_else(|_| Body::text("internal error"));
        let mut response = response_with_body(self.status(), body);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}
