use std::sync::Arc;

use crate::compress::Compression;
use crate::config::Config;
use crate::context::RequestContext;
use crate::error::BridgeError;
use crate::handler::BoxHandler;
use crate::http::{Request, Response};
use crate::middleware::{BoxMiddleware, Next, RequestLogger};
use crate::response::IntoResponse;
use crate::static_files::StaticFiles;

/// Asset directory served next to the process, as laid out by the front-end
/// build.
pub const STATIC_DIR: &str = "static";

const DEFAULT_APP_NAME: &str = "fnbridge app";

/// The composed application handler: request logging, then unconditional
/// response compression, then static assets, then the embedded renderer.
/// Assembled once at process start and shared by every invocation.
pub struct AppHandler {
    middlewares: Vec<BoxMiddleware>,
    renderer: BoxHandler,
    name: String,
}

impl AppHandler {
    pub fn new(renderer: BoxHandler, config: &Config) -> Self {
        Self::with_assets(renderer, StaticFiles::new(STATIC_DIR).dev(config.dev))
    }

    /// Same fixed chain over a custom asset source.
    pub fn with_assets(renderer: BoxHandler, assets: StaticFiles) -> Self {
        let middlewares: Vec<BoxMiddleware> = vec![
            Arc::new(RequestLogger),
            Arc::new(Compression),
            Arc::new(assets),
        ];
        Self {
            middlewares,
            renderer,
            name: DEFAULT_APP_NAME.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S>(&mut self, name: S)
    where
        S: Into<String>,
    {
        self.name = name.into();
    }

    /// Run one prepared invocation through the chain.
    pub async fn handle(&self, ctx: RequestContext) -> Result<Response, BridgeError> {
        Next::new(&self.middlewares, self.renderer.as_ref())
            .run(ctx)
            .await
    }

    /// Handle a raw request, converting chain errors into their HTTP
    /// responses at this outermost edge.
    pub async fn oneshot(&self, request: Request) -> Response {
        match self.handle(RequestContext::new(request)).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        }
    }
}

/// Wiring trait implemented by the embedding application.
pub trait Hooks {
    /// The application's router/renderer; everything the middleware chain
    /// does not answer ends up here.
    fn renderer() -> BoxHandler;

    fn name() -> &'static str {
        DEFAULT_APP_NAME
    }

    fn build_app(config: &Config) -> AppHandler
    where
        Self: Sized,
    {
        let mut app = AppHandler::new(Self::renderer(), config);
        app.set_name(Self::name());
        app
    }
}
