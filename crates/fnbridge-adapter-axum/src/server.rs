use std::net::{SocketAddr, TcpListener as StdTcpListener};

use anyhow::Context;
use axum::Router;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio::signal;
use tower::{service_fn, Service};

use fnbridge_core::app::{AppHandler, Hooks};
use fnbridge_core::config::{Config, DEFAULT_PORT};

use crate::service::BridgeService;

/// Listener configuration for standalone execution.
#[derive(Clone)]
pub struct StandaloneConfig {
    pub addr: SocketAddr,
    pub enable_ctrl_c: bool,
}

impl Default for StandaloneConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            enable_ctrl_c: true,
        }
    }
}

/// Blocking runner that hosts the application handler behind a local TCP
/// listener. Only used on the process-entry-point path; library consumers
/// call the handler per-invocation and never bind a port.
pub struct StandaloneServer {
    app: AppHandler,
    config: StandaloneConfig,
}

impl StandaloneServer {
    pub fn new(app: AppHandler) -> Self {
        Self {
            app,
            config: StandaloneConfig::default(),
        }
    }

    pub fn with_config(app: AppHandler, config: StandaloneConfig) -> Self {
        Self { app, config }
    }

    pub fn run(self) -> anyhow::Result<()> {
        let runtime = RuntimeBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;

        runtime.block_on(async move { self.run_async().await })
    }

    async fn run_async(self) -> anyhow::Result<()> {
        let StandaloneServer { app, config } = self;

        // Bind synchronously so address errors surface before the server
        // future starts.
        let listener = StdTcpListener::bind(config.addr)
            .with_context(|| format!("failed to bind listener to {}", config.addr))?;
        listener
            .set_nonblocking(true)
            .context("failed to set listener to non-blocking")?;
        let listener = tokio::net::TcpListener::from_std(listener)
            .context("failed to adopt std listener into tokio")?;

        serve_with_listener(app, listener, config.enable_ctrl_c).await
    }

    #[cfg(test)]
    async fn run_with_listener(self, listener: tokio::net::TcpListener) -> anyhow::Result<()> {
        let StandaloneServer { app, config } = self;
        serve_with_listener(app, listener, config.enable_ctrl_c).await
    }
}

async fn serve_with_listener(
    app: AppHandler,
    listener: tokio::net::TcpListener,
    enable_ctrl_c: bool,
) -> anyhow::Result<()> {
    let service = BridgeService::new(app);
    let router = Router::new().fallback_service(service_fn(move |req| {
        let mut svc = service.clone();
        async move { svc.call(req).await }
    }));
    let make_service = router.into_make_service();

    let server = axum::serve(listener, make_service);
    if enable_ctrl_c {
        server
            .with_graceful_shutdown(async {
                let _ = signal::ctrl_c().await;
            })
            .await
            .context("axum server error")?;
    } else {
        server.await.context("axum server error")?;
    }

    Ok(())
}

/// Process-entry-point path: resolve the environment, build the app, bind
/// the configured port. A bind (or any other server) failure is logged and
/// otherwise left alone.
pub fn run_app<A: Hooks>() -> anyhow::Result<()> {
    SimpleLogger::new().with_level(LevelFilter::Info).init().ok();

    let config = Config::from_env()?;
    let app = A::build_app(&config);
    let standalone = StandaloneConfig {
        addr: SocketAddr::from(([0, 0, 0, 0], config.port)),
        enable_ctrl_c: true,
    };

    log::info!("starting {} on {}", app.name(), standalone.addr);
    if let Err(err) = StandaloneServer::with_config(app, standalone).run() {
        log::error!("server error: {err:#}");
    }

    Ok(())
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use fnbridge_core::body::Body;
    use fnbridge_core::context::RequestContext;
    use fnbridge_core::error::BridgeError;
    use fnbridge_core::handler::IntoHandler;
    use fnbridge_core::http::{response_builder, StatusCode};
    use fnbridge_core::static_files::StaticFiles;
    use flate2::read::GzDecoder;
    use std::fs;
    use std::io::Read;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    fn test_app(assets: &TempDir) -> AppHandler {
        let renderer = (|ctx: RequestContext| async move {
            if ctx.route_path().get() == "/missing" {
                return Err(BridgeError::not_found("/missing"));
            }
            let response = response_builder()
                .status(StatusCode::OK)
                .body(Body::from(format!("rendered {}", ctx.route_path().get())))
                .expect("response");
            Ok::<_, BridgeError>(response)
        })
        .into_handler();
        AppHandler::with_assets(renderer, StaticFiles::new(assets.path()))
    }

    struct TestServer {
        base_url: String,
        handle: tokio::task::JoinHandle<()>,
        _assets: TempDir,
    }

    async fn start_test_server() -> TestServer {
        let assets = tempfile::tempdir().expect("assets");
        fs::write(assets.path().join("favicon.ico"), b"icon-bytes").expect("asset");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let config = StandaloneConfig {
            addr,
            enable_ctrl_c: false,
        };
        let server = StandaloneServer::with_config(test_app(&assets), config);

        let handle = tokio::spawn(async move {
            let _ = server.run_with_listener(listener).await;
        });

        TestServer {
            base_url: format!("http://{}", addr),
            handle,
            _assets: assets,
        }
    }

    async fn send_with_retry<F>(client: &reqwest::Client, mut make_request: F) -> reqwest::Response
    where
        F: FnMut(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let start = Instant::now();
        let timeout = Duration::from_secs(2);

        loop {
            match make_request(client).send().await {
                Ok(response) => return response,
                Err(err) => {
                    if start.elapsed() >= timeout {
                        panic!("server did not respond before timeout: {}", err);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn serves_rendered_pages() {
        let server = start_test_server().await;

        let client = reqwest::Client::new();
        let url = format!("{}/about", server.base_url);
        let response = send_with_retry(&client, |client| client.get(url.as_str())).await;

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "rendered /about");

        server.handle.abort();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn serves_static_assets_without_the_renderer() {
        let server = start_test_server().await;

        let client = reqwest::Client::new();
        let url = format!("{}/favicon.ico", server.base_url);
        let response = send_with_retry(&client, |client| client.get(url.as_str())).await;

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(&response.bytes().await.unwrap()[..], b"icon-bytes");

        server.handle.abort();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn negotiates_compression_end_to_end() {
        let server = start_test_server().await;

        let client = reqwest::Client::new();
        let url = format!("{}/about", server.base_url);
        let response = send_with_retry(&client, |client| {
            client.get(url.as_str()).header("accept-encoding", "gzip")
        })
        .await;

        assert_eq!(
            response
                .headers()
                .get("content-encoding")
                .and_then(|v| v.to_str().ok()),
            Some("gzip")
        );
        let encoded = response.bytes().await.unwrap();
        let mut decoder = GzDecoder::new(&encoded[..]);
        let mut plain = String::new();
        decoder.read_to_string(&mut plain).expect("gzip decode");
        assert_eq!(plain, "rendered /about");

        server.handle.abort();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn renderer_errors_surface_as_http_statuses() {
        let server = start_test_server().await;

        let client = reqwest::Client::new();
        let url = format!("{}/missing", server.base_url);
        let response = send_with_retry(&client, |client| client.get(url.as_str())).await;

        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        server.handle.abort();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn occupied_port_is_reported_as_a_bind_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind first");
        let addr = listener.local_addr().expect("listener addr");

        let assets = tempfile::tempdir().expect("assets");
        let config = StandaloneConfig {
            addr,
            enable_ctrl_c: false,
        };
        let server = StandaloneServer::with_config(test_app(&assets), config);

        let result = tokio::task::spawn_blocking(move || server.run()).await;
        match result {
            Ok(Err(err)) => {
                let message = err.to_string();
                assert!(
                    message.contains("bind") || message.contains("address"),
                    "expected bind error, got: {}",
                    message
                );
            }
            _ => panic!("expected bind error"),
        }

        drop(listener);
    }
}
