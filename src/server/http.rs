//! hyper-based metrics and liveness server with graceful drain.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info, instrument};

use crate::error::{Error, Result};
use crate::metrics::MetricRegistry;

/// Body served on the liveness route
pub const HEALTHY_BODY: &str = "healthy";

/// How long open connections may take to finish after shutdown starts
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// HTTP server exposing a [`MetricRegistry`]
pub struct MetricsServer {
    listener: TcpListener,
    registry: Arc<MetricRegistry>,
    grace_period: Duration,
}

impl MetricsServer {
    /// Bind the listener without accepting connections yet
    pub async fn bind(addr: SocketAddr, registry: Arc<MetricRegistry>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind metrics server on {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            registry,
            grace_period: DEFAULT_GRACE_PERIOD,
        })
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then drain open connections within
    /// the grace period
    #[instrument(skip_all)]
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        info!("Serving on address: {}", addr);

        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted
                        .map_err(|e| Error::Internal(format!("Metrics server accept error: {}", e)))?;

                    let registry = Arc::clone(&self.registry);
                    let service = service_fn(move |req| handle(req, Arc::clone(&registry)));
                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    let conn = graceful.watch(conn);

                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            debug!("Connection from {} closed with error: {}", peer, e);
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Server Stopped");
                    break;
                }
            }
        }

        drop(self.listener);

        match tokio::time::timeout(self.grace_period, graceful.shutdown()).await {
            Ok(()) => {
                info!("Server Exited");
                Ok(())
            }
            Err(_) => Err(Error::Shutdown(format!(
                "connections still open after {:?}",
                self.grace_period
            ))),
        }
    }
}

impl std::fmt::Debug for MetricsServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsServer")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("grace_period", &self.grace_period)
            .finish()
    }
}

async fn handle(
    req: Request<Incoming>,
    registry: Arc<MetricRegistry>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    let response = match req.uri().path() {
        "/metrics" => metrics_response(&registry),
        _ => text_response(StatusCode::OK, HEALTHY_BODY.to_string()),
    };
    Ok(response)
}

fn metrics_response(registry: &MetricRegistry) -> Response<Full<Bytes>> {
    match registry.encode_text() {
        Ok(buffer) => {
            let mut response = Response::new(Full::new(Bytes::from(buffer)));
            if let Ok(value) = registry.content_type().parse() {
                response.headers_mut().insert(CONTENT_TYPE, value);
            }
            response
        }
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            text_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
}
