//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router that forwards every request to the `App`
//! - Wire up middleware (tracing, request ID, timeout)
//! - Buffer request bodies up to the configured limit
//! - Bind server to listener and stop on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::http::app::App;

/// HTTP listener adapter around an `App`.
pub struct HttpServer {
    router: Router,
    app: Arc<App>,
}

impl HttpServer {
    /// Create a server for `app`; requests running longer than
    /// `request_timeout` are cut off.
    pub fn new(app: App, request_timeout: Duration) -> Self {
        let app = Arc::new(app);
        let router = Self::build_router(app.clone(), request_timeout);
        Self { router, app }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(app: Arc<App>, request_timeout: Duration) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(app)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// The Axum router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");
        self.app
            .logger()
            .system(200, format!("Server running at http://{}", addr));

        let service = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffer the body and hand the request to the lifecycle.
async fn dispatch_handler(State(app): State<Arc<App>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, app.options().body_limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                path = %parts.uri.path(),
                limit = app.options().body_limit,
                error = %err,
                "Request body rejected"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    let response = app.handle(axum::http::Request::from_parts(parts, body)).await;
    response.map(Body::from)
}
