//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, Request, Response};
use bytes::Bytes;
use tokio::net::TcpListener;

use strata::lifecycle::Shutdown;
use strata::observability::logging::{LogLevel, MemorySink};
use strata::{App, HttpServer, Router};

#[allow(dead_code)]
/// A router whose records land in the returned sink.
pub fn recording_router(base_path: &str) -> (Router, MemorySink) {
    let sink = MemorySink::new();
    let router = Router::new(base_path)
        .with_sink(Arc::new(sink.clone()))
        .with_log_level(LogLevel::Debug);
    (router, sink)
}

#[allow(dead_code)]
pub fn request(method: Method, uri: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Bytes> {
    request(Method::GET, uri)
}

#[allow(dead_code)]
pub fn body_text(response: &Response<Bytes>) -> String {
    String::from_utf8(response.body().to_vec()).unwrap()
}

/// A server running on an ephemeral port.
#[allow(dead_code)]
pub struct RunningServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

/// Bind `127.0.0.1:0` and serve `app` in the background.
#[allow(dead_code)]
pub async fn start_server(app: App, request_timeout: Duration) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(app, request_timeout);
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));
    RunningServer {
        addr,
        shutdown,
        handle,
    }
}
