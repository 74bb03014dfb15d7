//! HTTP server for the metrics endpoint.

use super::{ListenAddr, Report, RequestMetrics, ServerError};
use crate::exposition::{render, CONTENT_TYPE};
use crate::registry::Collector;
use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Configuration for the metrics server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub addr: ListenAddr,
    /// Path the exposition payload is served from.
    pub path: String,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            addr: ListenAddr::default(),
            path: "/metrics".to_string(),
        }
    }
}

impl MetricsServerConfig {
    /// Creates a config listening on every interface at `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            addr: ListenAddr::new("", port),
            ..Default::default()
        }
    }
}

/// `path` label of requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

#[derive(Clone)]
struct MetricsState {
    collector: Arc<dyn Collector>,
}

/// HTTP server exposing one collector.
///
/// Only `GET <path>` is served; every other method or path, `HEAD`
/// included, gets a 404.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: MetricsState,
    requests: Option<RequestMetrics>,
}

impl MetricsServer {
    pub fn new(config: MetricsServerConfig, collector: impl Collector + 'static) -> Self {
        Self::from_arc(config, Arc::new(collector))
    }

    pub fn from_arc(mut config: MetricsServerConfig, collector: Arc<dyn Collector>) -> Self {
        if !config.path.starts_with('/') {
            config.path.insert(0, '/');
        }
        Self {
            config,
            state: MetricsState { collector },
            requests: None,
        }
    }

    /// Reports every request the server answers into `requests`.
    ///
    /// Requests are labeled by the route they matched, so unknown paths all
    /// share the [`UNMATCHED_PATH`] instance.
    pub fn track_requests(mut self, requests: RequestMetrics) -> Self {
        self.requests = Some(requests);
        self
    }

    pub fn config(&self) -> &MetricsServerConfig {
        &self.config
    }

    /// Builds the router without binding a listener.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route(
                &self.config.path,
                get(metrics_handler).head(not_found).fallback(not_found),
            )
            .fallback(not_found)
            .with_state(self.state.clone());

        if let Some(requests) = &self.requests {
            router = router.layer(middleware::from_fn_with_state(
                requests.clone(),
                report_request,
            ));
        }
        router.layer(TraceLayer::new_for_http())
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener =
            tokio::net::TcpListener::bind((self.config.addr.host.as_str(), self.config.addr.port))
                .await?;

        tracing::info!(
            addr = %listener.local_addr()?,
            path = %self.config.path,
            "metrics server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Handler for the exposition path.
async fn metrics_handler(State(state): State<MetricsState>) -> Response {
    match render(state.collector.as_ref()).await {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, CONTENT_TYPE)],
            output,
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "metrics collection failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, CONTENT_TYPE)],
                format!("failed to collect metrics: {e}"),
            )
                .into_response()
        }
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn report_request(
    State(requests): State<RequestMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let reporter = requests.reporter();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_PATH, MatchedPath::as_str)
        .to_string();

    let response = next.run(request).await;

    let report = Report::new(method, path, response.status().as_u16());
    if let Err(e) = reporter.report(&report) {
        tracing::warn!(error = %e, "failed to report request");
    }
    response
}
