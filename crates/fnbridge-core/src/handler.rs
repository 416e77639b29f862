use std::future::Future;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::BridgeError;
use crate::http::HandlerFuture;
use crate::response::IntoResponse;

/// Object-safe seam for the embedded application's router/renderer. The
/// middleware chain terminates in one of these; what it does internally is
/// the application's business.
pub trait DynHandler: Send + Sync {
    fn call(&self, ctx: RequestContext) -> HandlerFuture;
}

impl<F, Fut, Res> DynHandler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Res, BridgeError>> + 'static,
    Res: IntoResponse,
{
    fn call(&self, ctx: RequestContext) -> HandlerFuture {
        let fut = (self)(ctx);
        Box::pin(async move {
            let response = fut.await?.into_response();
            Ok(response)
        })
    }
}

pub type BoxHandler = Arc<dyn DynHandler>;

pub trait IntoHandler {
    fn into_handler(self) -> BoxHandler;
}

impl<H> IntoHandler for H
where
    H: DynHandler + Sized + 'static,
{
    fn into_handler(self) -> BoxHandler {
        Arc::new(self)
    }
}
