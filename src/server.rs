//! Local capture server: HTTP listener, capture handler and lifecycle.
//!
//! Every path except [`HEALTH_PATH`] is a capture route: the request's
//! method, headers and body are recorded in the [`EventStore`] and the
//! caller gets back the assigned ID. Capture always succeeds regardless of
//! signature outcome; the verification result is recorded on the event, not
//! used as a rejection gate.

use crate::timeout_io::TimeoutIo;
use crate::{
    CaptureError, CapturedEvent, EventStore, Result, ServerConfig, SIGNATURE_HEADER,
    SignatureVerifier, persist,
};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode, header};
use hyper_util::rt::{TokioIo, TokioTimer};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// The fixed health-check route
pub const HEALTH_PATH: &str = "/health";

/// Lifecycle state of a capture server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No listener; `start` is allowed
    Stopped,

    /// Binding the listener
    Starting,

    /// Accepting and capturing requests
    Running,

    /// Draining in-flight requests
    Stopping,
}

struct Lifecycle {
    state: ServerState,
    shutdown: Option<watch::Sender<()>>,
    accept_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

/// Shared state the capture handler needs per request
struct ServerContext {
    verifier: SignatureVerifier,
    store: EventStore,
    config: ServerConfig,
}

/// Local HTTP server that captures every inbound webhook.
///
/// Owns one [`EventStore`] for its lifetime; the store survives stop/start
/// cycles, so a restarted server keeps previously captured events (use
/// [`EventStore::clear`] for explicit isolation). `start` returns once the
/// listener is bound; the accept loop runs on its own task.
pub struct CaptureServer {
    store: EventStore,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl CaptureServer {
    /// Create a server with a fresh event store
    pub fn new() -> Self {
        Self::with_store(EventStore::new())
    }

    /// Create a server over an existing event store
    pub fn with_store(store: EventStore) -> Self {
        Self {
            store,
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                state: ServerState::Stopped,
                shutdown: None,
                accept_task: None,
                local_addr: None,
            })),
        }
    }

    /// Handle to the server's event store for the control plane (list/replay)
    pub fn store(&self) -> EventStore {
        self.store.clone()
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServerState {
        self.lifecycle.lock().unwrap().state
    }

    /// The bound listen address while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lifecycle.lock().unwrap().local_addr
    }

    /// Bind the listener and start capturing.
    ///
    /// Returns the bound address once the listener is up; the accept loop
    /// keeps running in the background. Fails with
    /// [`CaptureError::AlreadyRunning`] unless the server is stopped.
    pub async fn start(&self, config: ServerConfig) -> Result<SocketAddr> {
        {
            let mut lifecycle = self.lifecycle.lock().unwrap();
            if lifecycle.state != ServerState::Stopped {
                return Err(CaptureError::AlreadyRunning);
            }
            lifecycle.state = ServerState::Starting;
        }

        let addr = config.addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.lifecycle.lock().unwrap().state = ServerState::Stopped;
                return Err(CaptureError::Bind { addr, source });
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(local_addr) => local_addr,
            Err(source) => {
                self.lifecycle.lock().unwrap().state = ServerState::Stopped;
                return Err(CaptureError::Bind { addr, source });
            }
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let context = Arc::new(ServerContext {
            verifier: SignatureVerifier::new(config.secret.clone()),
            store: self.store.clone(),
            config,
        });
        let accept_task = tokio::spawn(accept_loop(listener, context, shutdown_rx));

        let mut lifecycle = self.lifecycle.lock().unwrap();
        lifecycle.state = ServerState::Running;
        lifecycle.shutdown = Some(shutdown_tx);
        lifecycle.accept_task = Some(accept_task);
        lifecycle.local_addr = Some(local_addr);

        info!(addr = %local_addr, "capture server listening");
        Ok(local_addr)
    }

    /// Stop the server, draining in-flight requests for up to `grace`.
    ///
    /// Connections still open when the grace period elapses are
    /// force-closed. The server ends up [`ServerState::Stopped`] either way.
    /// Fails with [`CaptureError::NotRunning`] unless the server is running.
    pub async fn stop(&self, grace: Duration) -> Result<()> {
        let (shutdown, accept_task) = {
            let mut lifecycle = self.lifecycle.lock().unwrap();
            if lifecycle.state != ServerState::Running {
                return Err(CaptureError::NotRunning);
            }
            lifecycle.state = ServerState::Stopping;
            (lifecycle.shutdown.take(), lifecycle.accept_task.take())
        };

        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }

        if let Some(mut task) = accept_task {
            match tokio::time::timeout(grace, &mut task).await {
                Ok(joined) => {
                    if let Err(err) = joined {
                        warn!(error = %err, "accept loop ended abnormally");
                    } else {
                        debug!("capture server drained cleanly");
                    }
                }
                Err(_) => {
                    warn!(grace = ?grace, "grace period elapsed, force-closing connections");
                    task.abort();
                    let _ = task.await;
                }
            }
        }

        let mut lifecycle = self.lifecycle.lock().unwrap();
        lifecycle.state = ServerState::Stopped;
        lifecycle.local_addr = None;
        info!("capture server stopped");
        Ok(())
    }
}

impl Default for CaptureServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Accept connections until shutdown, then drain the in-flight set
async fn accept_loop(
    listener: TcpListener,
    context: Arc<ServerContext>,
    shutdown_rx: watch::Receiver<()>,
) {
    let mut connections = JoinSet::new();
    let mut shutdown = shutdown_rx.clone();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, remote)) => {
                        connections.spawn(serve_connection(
                            stream,
                            remote,
                            context.clone(),
                            shutdown_rx.clone(),
                        ));
                    }
                    Err(err) => warn!(error = %err, "failed to accept connection"),
                }
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    if !connections.is_empty() {
        debug!(in_flight = connections.len(), "draining in-flight connections");
    }
    while connections.join_next().await.is_some() {}
}

/// Serve one connection, honoring the graceful-shutdown signal
async fn serve_connection(
    stream: TcpStream,
    remote: SocketAddr,
    context: Arc<ServerContext>,
    mut shutdown: watch::Receiver<()>,
) {
    let io = TokioIo::new(TimeoutIo::new(
        stream,
        context.config.idle_timeout,
        context.config.write_timeout,
    ));

    let service = service_fn({
        let context = context.clone();
        move |request| handle_request(request, context.clone())
    });

    let conn = http1::Builder::new()
        .timer(TokioTimer::new())
        .header_read_timeout(context.config.header_read_timeout)
        .serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(err) = result {
                debug!(%remote, error = %err, "connection closed with error");
            }
        }
        _ = shutdown.changed() => {
            conn.as_mut().graceful_shutdown();
            if let Err(err) = conn.as_mut().await {
                debug!(%remote, error = %err, "connection closed during shutdown");
            }
        }
    }
}

/// Route a request to the health handler or the capture handler
async fn handle_request(
    request: Request<Incoming>,
    context: Arc<ServerContext>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible> {
    if request.method() == Method::GET && request.uri().path() == HEALTH_PATH {
        return Ok(health_response(&context.store));
    }

    Ok(capture(request, &context).await)
}

/// `GET /health`: static status plus the current event count
fn health_response(store: &EventStore) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({ "status": "healthy", "webhooks": store.count() }),
    )
}

/// Capture one inbound request and answer with the assigned ID
async fn capture(request: Request<Incoming>, context: &ServerContext) -> Response<Full<Bytes>> {
    let method = request.method().to_string();
    let url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    // First value wins when a header repeats
    let mut headers = HashMap::with_capacity(request.headers().len());
    for (name, value) in request.headers() {
        headers
            .entry(name.as_str().to_string())
            .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
    }

    let signature = request
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let body = match read_body(request.into_body(), context.config.read_timeout).await {
        Ok(body) => body,
        Err(err) => {
            warn!(%method, %url, error = %err, "rejecting unreadable request");
            return plain_response(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    // Skipped validation counts as trusted, not unknown
    let verified = if context.config.validate_signature && !context.config.secret.is_empty() {
        context.verifier.verify(&body, &signature)
    } else {
        true
    };

    let event = CapturedEvent::new(method, url, headers, body.to_vec())
        .with_signature(signature)
        .with_verified(verified);
    let id = context.store.append(event);
    info!(%id, verified, "captured webhook");

    if context.config.save_to_file && !context.config.file_path.as_os_str().is_empty() {
        // Best-effort: the event is already in memory and the remote caller
        // gets its 200 regardless.
        if let Some(stored) = context.store.find_by_id(&id) {
            if let Err(err) = persist::save(&stored, &context.config.file_path).await {
                warn!(%id, error = %err, "failed to persist captured webhook");
            }
        }
    }

    json_response(
        StatusCode::OK,
        &serde_json::json!({ "status": "ok", "id": id }),
    )
}

/// Read the full request body within `timeout`
async fn read_body(body: Incoming, timeout: Duration) -> Result<Bytes> {
    match tokio::time::timeout(timeout, body.collect()).await {
        Ok(Ok(collected)) => Ok(collected.to_bytes()),
        Ok(Err(err)) => Err(CaptureError::BodyRead(err.to_string())),
        Err(_) => Err(CaptureError::BodyRead(format!(
            "timed out after {timeout:?}"
        ))),
    }
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("response parts are valid")
}

fn plain_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from(body)))
        .expect("response parts are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ephemeral_config() -> ServerConfig {
        ServerConfig::builder().host("127.0.0.1").port(0).build()
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let server = CaptureServer::new();
        server.start(ephemeral_config()).await.unwrap();

        let err = server.start(ephemeral_config()).await.unwrap_err();
        assert!(matches!(err, CaptureError::AlreadyRunning));

        server.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_start_is_rejected() {
        let server = CaptureServer::new();
        let err = server.stop(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CaptureError::NotRunning));
    }

    #[tokio::test]
    async fn test_stop_twice_is_rejected() {
        let server = CaptureServer::new();
        server.start(ephemeral_config()).await.unwrap();
        server.stop(Duration::from_secs(1)).await.unwrap();

        let err = server.stop(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CaptureError::NotRunning));
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let server = CaptureServer::new();
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addr().is_none());

        let addr = server.start(ephemeral_config()).await.unwrap();
        assert_eq!(server.state(), ServerState::Running);
        assert_eq!(server.local_addr(), Some(addr));

        server.stop(Duration::from_secs(1)).await.unwrap();
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn test_store_survives_restart() {
        let server = CaptureServer::new();
        server.start(ephemeral_config()).await.unwrap();

        let store = server.store();
        store.append(CapturedEvent::new(
            "POST",
            "/persisted",
            HashMap::new(),
            Vec::new(),
        ));

        server.stop(Duration::from_secs(1)).await.unwrap();
        server.start(ephemeral_config()).await.unwrap();

        assert_eq!(server.store().count(), 1);
        server.stop(Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_resets_state() {
        let server = CaptureServer::new();
        let addr = server.start(ephemeral_config()).await.unwrap();

        let second = CaptureServer::new();
        let config = ServerConfig::builder()
            .host("127.0.0.1")
            .port(addr.port())
            .build();
        let err = second.start(config).await.unwrap_err();
        assert!(matches!(err, CaptureError::Bind { .. }));
        assert_eq!(second.state(), ServerState::Stopped);

        // A failed bind must not poison the state machine
        second.start(ephemeral_config()).await.unwrap();
        second.stop(Duration::from_secs(1)).await.unwrap();

        server.stop(Duration::from_secs(1)).await.unwrap();
    }
}
