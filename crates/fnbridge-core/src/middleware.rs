use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::BridgeError;
use crate::handler::DynHandler;
use crate::http::Response;

pub type BoxMiddleware = Arc<dyn Middleware>;

#[async_trait(?Send)]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, BridgeError>;
}

/// Remainder of the chain: the middlewares not yet run, terminated by the
/// renderer.
pub struct Next<'a> {
    middlewares: &'a [BoxMiddleware],
    handler: &'a dyn DynHandler,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [BoxMiddleware], handler: &'a dyn DynHandler) -> Self {
        Self {
            middlewares,
            handler,
        }
    }

    pub async fn run(self, ctx: RequestContext) -> Result<Response, BridgeError> {
        if let Some((head, tail)) = self.middlewares.split_first() {
            head.handle(ctx, Next::new(tail, self.handler)).await
        } else {
            self.handler.call(ctx).await
        }
    }
}

/// Logs one line per request: method, route path, status, elapsed time.
pub struct RequestLogger;

#[async_trait(?Send)]
impl Middleware for RequestLogger {
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, BridgeError> {
        let method = ctx.request().method().clone();
        let path = ctx.route_path().get().to_string();
        let start = Instant::now();

        match next.run(ctx).await {
            Ok(response) => {
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                tracing::info!(
                    "request method={} path={} status={} elapsed_ms={:.2}",
                    method,
                    path,
                    response.status().as_u16(),
                    elapsed
                );
                Ok(response)
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                tracing::error!(
                    "request method={} path={} status={} error={} elapsed_ms={:.2}",
                    method,
                    path,
                    err.status().as_u16(),
                    err.message(),
                    elapsed
                );
                Err(err)
            }
        }
    }
}

pub struct FnMiddleware<F>
where
    F: Send + Sync + 'static,
{
    f: F,
}

#[async_trait(?Send)]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(RequestContext, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BridgeError>>,
{
    async fn handle(&self, ctx: RequestContext, next: Next<'_>) -> Result<Response, BridgeError> {
        (self.f)(ctx, next).await
    }
}

pub fn middleware_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(RequestContext, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BridgeError>>,
{
    FnMiddleware { f }
}
