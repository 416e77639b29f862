use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body as AxumBody;
use axum::http::{Request, Response};
use tokio::{runtime::Handle, task};
use tower::Service;

use fnbridge_core::app::AppHandler;

use crate::request::into_core_request;
use crate::response::into_axum_response;

/// Tower service exposing the application handler to an Axum/Hyper host.
/// Constructing one has no side effects; in particular it binds nothing.
#[derive(Clone)]
pub struct BridgeService {
    app: Arc<AppHandler>,
}

impl BridgeService {
    pub fn new(app: AppHandler) -> Self {
        Self { app: Arc::new(app) }
    }
}

impl Service<Request<AxumBody>> for BridgeService {
    type Response = Response<AxumBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<AxumBody>) -> Self::Future {
        let app = Arc::clone(&self.app);
        Box::pin(async move {
            // Handler futures are non-`Send`; drive them to completion on
            // this worker thread instead of handing them back to the
            // scheduler.
            let response = task::block_in_place(move || {
                Handle::current().block_on(async move {
                    let core_request = into_core_request(request);
                    let response = app.oneshot(core_request).await;
                    into_axum_response(response)
                })
            });
            Ok(response)
        })
    }
}
