use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::body::Body;
use crate::context::RequestContext;
use crate::error::BridgeError;
use crate::http::{
    header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    response_builder, HeaderValue, Method, Response, StatusCode,
};
use crate::middleware::{Middleware, Next};

const DEFAULT_MAX_AGE_SECS: u32 = 3600;

/// Serves files from a local asset directory, falling through to the rest of
/// the chain when the route path does not name one.
///
/// In dev mode responses are marked uncacheable so edited assets show up on
/// reload; in production mode responses carry an `ETag` and a max-age, and a
/// matching `If-None-Match` short-circuits to `304`.
pub struct StaticFiles {
    root: PathBuf,
    dev: bool,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dev: false,
        }
    }

    #[must_use]
    pub fn dev(mut self, dev: bool) -> Self {
        self.dev = dev;
        self
    }

    fn resolve(&self, route_path: &str) -> Option<PathBuf> {
        let relative = route_path.trim_start_matches('/');
        if relative.is_empty() {
            return None;
        }

        // Reject parent/root components before touching the filesystem.
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }

        let candidate = self.root.join(relative);
        candidate.is_file().then_some(candidate)
    }
}

#[async_trait(?Send)]
impl Middleware for StaticFiles {
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, BridgeError> {
        let method = ctx.request().method().clone();
        if method != Method::GET && method != Method::HEAD {
            return next.run(ctx).await;
        }

        let Some(file) = self.resolve(ctx.route_path().get()) else {
            return next.run(ctx).await;
        };

        let contents = match fs::read(&file) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!("failed to read asset {}: {}", file.display(), err);
                return next.run(ctx).await;
            }
        };

        let tag = etag(&contents);
        if !self.dev && client_has_current_copy(&ctx, &tag) {
            return response_builder()
                .status(StatusCode::NOT_MODIFIED)
                .header(ETAG, tag)
                .body(Body::empty())
                .map_err(BridgeError::internal);
        }

        let mut builder = response_builder()
            .status(StatusCode::OK)
            .header(
                CONTENT_TYPE,
                content_type(file.extension().and_then(|ext| ext.to_str())),
            )
            .header(CONTENT_LENGTH, HeaderValue::from(contents.len()));

        if self.dev {
            builder = builder.header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        } else {
            builder = builder
                .header(
                    CACHE_CONTROL,
                    format!("public, max-age={DEFAULT_MAX_AGE_SECS}"),
                )
                .header(ETAG, tag);
        }

        let body = if method == Method::HEAD {
            Body::empty()
        } else {
            Body::from(contents)
        };

        builder.body(body).map_err(BridgeError::internal)
    }
}

fn client_has_current_copy(ctx: &RequestContext, tag: &str) -> bool {
    ctx.request()
        .headers()
        .get(IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.split(',').any(|candidate| candidate.trim() == tag))
}

/// FNV-1a over the contents, prefixed with the length.
fn etag(contents: &[u8]) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &byte in contents {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("\"{:x}-{:x}\"", contents.len(), hash)
}

/// Content-Type for a file extension.
pub fn content_type(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt") => "text/plain; charset=utf-8",
        Some("xml") => "application/xml",
        Some("js" | "mjs") => "application/javascript",
        Some("json" | "map") => "application/json",
        Some("wasm") => "application/wasm",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("webmanifest") => "application/manifest+json",
        _ => "application/octet-stream",
    }
}
