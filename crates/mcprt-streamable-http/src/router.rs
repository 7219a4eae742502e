//! Axum-backed server transport for the Streamable HTTP endpoint (spec
//! §4.2): one configurable path (default `/mcp`) accepting
//! `POST`/`GET`/`DELETE`/`OPTIONS`, with optional legacy `/sse` + `/message`
//! mounts sharing the same session table and event store.

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Bytes as AxumBytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use dashmap::DashMap;
use futures::stream::{self, Stream};
use mcprt_transport::{
    AtomicMetrics, ErrorCallback, MessageCallback, ServerTransport, TransportCapabilities,
    TransportError, TransportMetrics, TransportResult, TransportState, TransportType,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::StreamableConfig;
use crate::event_store::EventStore;
use crate::session::SessionManager;
use crate::sse::SseEvent;
use crate::types::{OriginValidation, StreamableError};

/// Maps each [`StreamableError`] onto the HTTP status spec §4.2's "Error
/// surface" assigns it.
impl From<StreamableError> for StatusCode {
    fn from(err: StreamableError) -> Self {
        match err {
            StreamableError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            StreamableError::SessionTerminated(_) => StatusCode::NOT_FOUND,
            StreamableError::InvalidMethod(_) => StatusCode::METHOD_NOT_ALLOWED,
            StreamableError::InvalidOrigin(_) | StreamableError::MissingOrigin => {
                StatusCode::BAD_REQUEST
            }
            StreamableError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            StreamableError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            StreamableError::TooManyStreams { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StreamableError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

const CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

/// One registered SSE subscriber: events for its stream key are pushed here
/// and framed/flushed by the handler task that owns the receiving end.
type SseSender = mpsc::UnboundedSender<SseEvent>;

struct Inner {
    config: StreamableConfig,
    sessions: SessionManager,
    event_store: EventStore,
    /// Dynamic SSE client array (spec §4.2 "register the client in the
    /// transport's dynamic SSE client array"), keyed by stream key (the
    /// session id, or a per-connection id when sessions are disabled).
    clients: DashMap<String, Vec<SseSender>>,
    metrics: AtomicMetrics,
    heartbeat_counter: AtomicU64,
    message_cb: StdMutex<Option<MessageCallback>>,
    error_cb: StdMutex<Option<ErrorCallback>>,
    state: StdMutex<TransportState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Inner {
    fn client_count(&self) -> usize {
        self.clients.iter().map(|e| e.value().len()).sum()
    }

    fn session_client_count(&self, key: &str) -> usize {
        self.clients.get(key).map(|e| e.value().len()).unwrap_or(0)
    }

    fn register_client(&self, key: &str, tx: SseSender) {
        self.clients.entry(key.to_string()).or_default().push(tx);
    }

    fn unregister_client(&self, key: &str, tx: &SseSender) {
        if let Some(mut entry) = self.clients.get_mut(key) {
            entry.retain(|sender| !sender.same_channel(tx));
        }
    }

    fn broadcast(&self, key: &str, event: &SseEvent) {
        if let Some(mut entry) = self.clients.get_mut(key) {
            entry.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

/// Server transport implementing spec §4.2 over `axum`.
pub struct StreamableHttpServerTransport {
    inner: Arc<Inner>,
    tasks: tokio::sync::Mutex<Option<JoinSet<()>>>,
}

impl std::fmt::Debug for StreamableHttpServerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamableHttpServerTransport")
            .field("bind_addr", &self.inner.config.bind_addr)
            .field("mcp_endpoint", &self.inner.config.mcp_endpoint)
            .field("state", &*self.inner.state.lock().expect("state mutex poisoned"))
            .finish()
    }
}

impl StreamableHttpServerTransport {
    pub fn new(config: StreamableConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let event_store = EventStore::new(config.max_stored_events);
        Self {
            inner: Arc::new(Inner {
                config,
                sessions: SessionManager::new(),
                event_store,
                clients: DashMap::new(),
                metrics: AtomicMetrics::new(),
                heartbeat_counter: AtomicU64::new(0),
                message_cb: StdMutex::new(None),
                error_cb: StdMutex::new(None),
                state: StdMutex::new(TransportState::Disconnected),
                shutdown_tx,
            }),
            tasks: tokio::sync::Mutex::new(None),
        }
    }

    /// Push a server-initiated event to every SSE stream currently
    /// registered for `session_id`, recording it in the event store first
    /// so a later `Last-Event-ID` reconnect can replay it (spec §4.5).
    pub fn publish(&self, session_id: &str, event_type: Option<String>, data: String) {
        let id = self.inner.event_store.append(session_id, event_type.clone(), data.clone());
        let event = SseEvent {
            id: Some(id),
            event: event_type,
            data,
            retry: None,
        };
        self.inner.broadcast(session_id, &event);
    }

    fn router(&self) -> Router {
        let mut router = Router::new().route(
            &self.inner.config.mcp_endpoint,
            post(mcp_post).get(mcp_get).delete(mcp_delete).options(mcp_options),
        );
        if self.inner.config.enable_legacy_endpoints {
            router = router
                .route("/sse", get(mcp_get).options(mcp_options))
                .route("/message", post(mcp_post).options(mcp_options));
        }
        router.with_state(self.inner.clone())
    }
}

#[async_trait]
impl ServerTransport for StreamableHttpServerTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::StreamableHttp
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            supports_bidirectional: true,
            supports_streaming: true,
            max_message_size: Some(self.inner.config.max_body_size),
        }
    }

    async fn state(&self) -> TransportState {
        self.inner.state.lock().expect("state mutex poisoned").clone()
    }

    async fn start(
        &self,
        message_cb: MessageCallback,
        error_cb: ErrorCallback,
    ) -> TransportResult<()> {
        *self.inner.state.lock().expect("state mutex poisoned") = TransportState::Connecting;
        *self.inner.message_cb.lock().expect("message_cb mutex poisoned") = Some(message_cb);
        *self.inner.error_cb.lock().expect("error_cb mutex poisoned") = Some(error_cb);

        let addr: std::net::SocketAddr =
            self.inner.config.bind_addr.parse().map_err(|e| {
                TransportError::Configuration(format!("invalid bind_addr: {e}"))
            })?;
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            *self.inner.state.lock().expect("state mutex poisoned") = TransportState::Failed {
                reason: e.to_string(),
            };
            TransportError::ConnectionFailed(e.to_string())
        })?;
        info!(%addr, endpoint = %self.inner.config.mcp_endpoint, "streamable-http server listening");

        let app = self.router().into_make_service();
        let mut shutdown_rx = self.inner.shutdown_tx.subscribe();

        let mut tasks = JoinSet::new();
        tasks.spawn(async move {
            let serve = axum::serve(listener, app);
            tokio::select! {
                result = serve => {
                    if let Err(e) = result {
                        warn!(error = %e, "streamable-http serve task ended with error");
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("streamable-http serve task received shutdown signal");
                }
            }
        });

        let cleanup_inner = self.inner.clone();
        let mut cleanup_shutdown_rx = self.inner.shutdown_tx.subscribe();
        tasks.spawn(async move {
            let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = cleanup_inner.sessions.cleanup_expired();
                        if removed > 0 {
                            debug!(removed, "swept expired streamable-http sessions");
                        }
                    }
                    _ = cleanup_shutdown_rx.recv() => break,
                }
            }
        });

        *self.tasks.lock().await = Some(tasks);
        *self.inner.state.lock().expect("state mutex poisoned") = TransportState::Connected;
        Ok(())
    }

    async fn stop(&self) -> TransportResult<()> {
        *self.inner.state.lock().expect("state mutex poisoned") = TransportState::Disconnecting;
        let _ = self.inner.shutdown_tx.send(());

        if let Some(mut tasks) = self.tasks.lock().await.take() {
            let deadline = Duration::from_secs(5);
            let start = std::time::Instant::now();
            while let Some(remaining) = deadline.checked_sub(start.elapsed()) {
                match tokio::time::timeout(remaining, tasks.join_next()).await {
                    Ok(Some(_)) => continue,
                    Ok(None) => break,
                    Err(_) => break,
                }
            }
            if !tasks.is_empty() {
                warn!("aborting remaining streamable-http tasks after shutdown deadline");
                tasks.shutdown().await;
            }
        }
        *self.inner.state.lock().expect("state mutex poisoned") = TransportState::Disconnected;
        Ok(())
    }

    async fn metrics(&self) -> TransportMetrics {
        self.inner.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        Some(format!(
            "http://{}{}",
            self.inner.config.bind_addr, self.inner.config.mcp_endpoint
        ))
    }
}

fn validate_origin(inner: &Inner, headers: &HeaderMap) -> Result<(), StatusCode> {
    if !inner.config.validate_origin {
        return Ok(());
    }
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok());
    let validation = OriginValidation::validate(origin, &inner.config.allowed_origins);
    if validation.passed(inner.config.validate_origin) {
        Ok(())
    } else {
        Err(StatusCode::from(StreamableError::InvalidOrigin(
            origin.unwrap_or_default().to_string(),
        )))
    }
}

fn session_id_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Mcp-Session-Id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn apply_cors_headers(headers: &mut HeaderMap, config: &StreamableConfig, origin: Option<&str>) {
    if !config.enable_cors {
        return;
    }
    let allow_origin = if config.allowed_origins.is_empty() {
        "*".to_string()
    } else {
        origin.map(String::from).unwrap_or_else(|| "*".to_string())
    };
    if let Ok(value) = HeaderValue::from_str(&allow_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    if let Ok(value) = HeaderValue::from_str(&config.cors_allow_methods.join(", ")) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    if let Ok(value) = HeaderValue::from_str(&config.cors_allow_headers.join(", ")) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from(config.cors_max_age),
    );
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// `POST /mcp` (spec §4.2 "POST `/mcp`"): one JSON-RPC request in, either a
/// single JSON response or (if `Accept` asks for it) that same reply framed
/// as one SSE event.
async fn mcp_post(
    State(inner): State<Arc<Inner>>,
    headers: HeaderMap,
    body: AxumBytes,
) -> Result<axum::response::Response, StatusCode> {
    validate_origin(&inner, &headers)?;

    if body.len() > inner.config.max_body_size {
        return Err(StatusCode::from(StreamableError::BodyTooLarge {
            size: body.len(),
            max: inner.config.max_body_size,
        }));
    }

    let session_id = resolve_post_session(&inner, &headers);

    let message_cb = inner
        .message_cb
        .lock()
        .expect("message_cb mutex poisoned")
        .clone()
        .ok_or(StatusCode::INTERNAL_SERVER_ERROR)?;

    let reply = message_cb(Bytes::copy_from_slice(&body))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()).map(String::from);
    let mut response_headers = HeaderMap::new();
    apply_cors_headers(&mut response_headers, &inner.config, origin.as_deref());
    if let Some(ref id) = session_id {
        if let Ok(value) = HeaderValue::from_str(id) {
            response_headers.insert("Mcp-Session-Id", value);
        }
    }

    let Some(reply_bytes) = reply else {
        // Notification: JSON-RPC 2.0 carries no response.
        return Ok((StatusCode::NO_CONTENT, response_headers).into_response());
    };

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let body_text = String::from_utf8_lossy(&reply_bytes).into_owned();

    if accept.contains("text/event-stream") {
        response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        let event = Event::default().event("message").data(body_text);
        let stream = stream::once(async move { Ok::<Event, Infallible>(event) });
        Ok((StatusCode::OK, response_headers, Sse::new(stream)).into_response())
    } else {
        response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok((StatusCode::OK, response_headers, reply_bytes).into_response())
    }
}

/// Resolve/allocate a session id for a POST (spec §4.2 "Session identity"):
/// bump `last_activity` for a known id, leave an unknown id alone (request
/// is treated as session-less), allocate one when sessions are enabled and
/// none was presented.
fn resolve_post_session(inner: &Inner, headers: &HeaderMap) -> Option<String> {
    if !inner.config.enable_sessions {
        return None;
    }
    match session_id_header(headers) {
        Some(id) => {
            if inner.sessions.get(&id).is_some() {
                inner.sessions.touch(&id);
            }
            Some(id)
        }
        None => Some(inner.sessions.create(inner.config.session_timeout())),
    }
}

/// `GET /mcp` (spec §4.2 "GET `/mcp`"): opens a long-lived SSE stream bound
/// to (session, client), replaying missed events by `Last-Event-ID` first.
async fn mcp_get(
    State(inner): State<Arc<Inner>>,
    headers: HeaderMap,
) -> Result<axum::response::Response, StatusCode> {
    validate_origin(&inner, &headers)?;

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !accept.contains("text/event-stream") {
        return Err(StatusCode::NOT_ACCEPTABLE);
    }

    let stream_key = session_id_header(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());
    if inner.config.enable_sessions && inner.sessions.get(&stream_key).is_some() {
        inner.sessions.touch(&stream_key);
    }

    if inner.client_count() >= inner.config.max_sse_clients {
        return Err(StatusCode::from(StreamableError::TooManyStreams {
            count: inner.client_count(),
            max: inner.config.max_sse_clients,
        }));
    }
    if inner.session_client_count(&stream_key) >= inner.config.max_streams_per_session {
        return Err(StatusCode::from(StreamableError::TooManyStreams {
            count: inner.session_client_count(&stream_key),
            max: inner.config.max_streams_per_session,
        }));
    }

    let last_event_id = headers.get("Last-Event-ID").and_then(|v| v.to_str().ok());
    let replay = if inner.config.enable_sse_resumability {
        inner.event_store.replay(&stream_key, last_event_id)
    } else {
        Vec::new()
    };

    let (tx, rx) = mpsc::unbounded_channel::<SseEvent>();
    inner.register_client(&stream_key, tx.clone());

    let connection_event = SseEvent::message(
        serde_json::json!({
            "type": "connection",
            "session_id": stream_key,
            "timestamp": now_millis() as u64,
        })
        .to_string(),
    );

    let heartbeat_interval = inner.config.send_heartbeats.then(|| inner.config.heartbeat_interval());
    let inner_for_stream = inner.clone();
    let stream_key_for_stream = stream_key.clone();
    let tx_for_stream = tx.clone();

    let state = StreamState {
        queued: replay.into_iter().chain(std::iter::once(connection_event)).collect(),
        rx,
        heartbeat: heartbeat_interval.map(tokio::time::interval),
        inner: inner_for_stream,
        stream_key: stream_key_for_stream,
        sender: tx_for_stream,
    };
    let stream = stream::unfold(state, next_sse_item);

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    response_headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    if let Ok(value) = HeaderValue::from_str(&stream_key) {
        response_headers.insert("Mcp-Session-Id", value);
    }
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()).map(String::from);
    apply_cors_headers(&mut response_headers, &inner.config, origin.as_deref());

    let sse = Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(30)));
    Ok((StatusCode::OK, response_headers, sse).into_response())
}

struct StreamState {
    queued: std::collections::VecDeque<SseEvent>,
    rx: mpsc::UnboundedReceiver<SseEvent>,
    heartbeat: Option<tokio::time::Interval>,
    inner: Arc<Inner>,
    stream_key: String,
    sender: SseSender,
}

async fn next_sse_item(mut state: StreamState) -> Option<(Result<Event, Infallible>, StreamState)> {
    if let Some(event) = state.queued.pop_front() {
        return Some((Ok(to_axum_event(event)), state));
    }

    loop {
        let heartbeat_tick = async {
            match &mut state.heartbeat {
                Some(interval) => {
                    interval.tick().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            received = state.rx.recv() => {
                return match received {
                    Some(event) => Some((Ok(to_axum_event(event)), state)),
                    None => {
                        state.inner.unregister_client(&state.stream_key, &state.sender);
                        None
                    }
                };
            }
            _ = heartbeat_tick => {
                let count = state.inner.heartbeat_counter.fetch_add(1, Ordering::Relaxed) + 1;
                return Some((Ok(Event::default().comment(format!("heartbeat {count}"))), state));
            }
        }
    }
}

fn to_axum_event(event: SseEvent) -> Event {
    let mut axum_event = Event::default().data(event.data);
    if let Some(id) = event.id {
        axum_event = axum_event.id(id);
    }
    if let Some(kind) = event.event {
        axum_event = axum_event.event(kind);
    }
    if let Some(retry_ms) = event.retry {
        axum_event = axum_event.retry(Duration::from_millis(retry_ms as u64));
    }
    axum_event
}

/// `DELETE /mcp` (spec §4.2 "DELETE `/mcp`"): terminates the referenced
/// session.
async fn mcp_delete(
    State(inner): State<Arc<Inner>>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    let session_id = session_id_header(&headers)
        .ok_or(StatusCode::from(StreamableError::InvalidRequest("missing Mcp-Session-Id".into())))?;

    if !inner.sessions.terminate(&session_id) {
        return Err(StatusCode::from(StreamableError::SessionNotFound(session_id)));
    }
    inner.clients.remove(&session_id);
    inner.event_store.drop_stream(&session_id);
    Ok(StatusCode::NO_CONTENT)
}

/// `OPTIONS /mcp` (spec §4.2 "OPTIONS `/mcp`"): CORS preflight, no body.
async fn mcp_options(State(inner): State<Arc<Inner>>, headers: HeaderMap) -> impl IntoResponse {
    let origin = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()).map(String::from);
    let mut response_headers = HeaderMap::new();
    apply_cors_headers(&mut response_headers, &inner.config, origin.as_deref());
    (StatusCode::NO_CONTENT, response_headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn echo_cb() -> MessageCallback {
        Arc::new(|bytes: Bytes| Box::pin(async move { Ok(Some(bytes)) }))
    }

    fn noop_error_cb() -> ErrorCallback {
        Arc::new(|_err| {})
    }

    fn test_transport() -> StreamableHttpServerTransport {
        let mut config = StreamableConfig::minimal();
        config.bind_addr = "127.0.0.1:0".to_string();
        StreamableHttpServerTransport::new(config)
    }

    #[tokio::test]
    async fn post_without_sse_accept_returns_json_body() {
        let transport = test_transport();
        *transport.inner.message_cb.lock().unwrap() = Some(echo_cb());
        *transport.inner.error_cb.lock().unwrap() = Some(noop_error_cb());

        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
    }

    #[tokio::test]
    async fn post_allocates_session_id_when_sessions_enabled() {
        let transport = test_transport();
        *transport.inner.message_cb.lock().unwrap() = Some(echo_cb());

        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("Mcp-Session-Id"));
    }

    #[tokio::test]
    async fn post_without_handler_fails_with_500() {
        let transport = test_transport();
        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn delete_unknown_session_returns_404() {
        let transport = test_transport();
        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header("Mcp-Session-Id", "deadbeef")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_known_session_returns_204_and_removes_it() {
        let transport = test_transport();
        let id = transport.inner.sessions.create(Duration::from_secs(60));
        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .header("Mcp-Session-Id", id.clone())
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(transport.inner.sessions.get(&id).is_none());
    }

    #[tokio::test]
    async fn delete_missing_session_header_returns_400() {
        let transport = test_transport();
        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("DELETE")
            .uri("/mcp")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_without_sse_accept_returns_406() {
        let transport = test_transport();
        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("GET")
            .uri("/mcp")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
    }

    #[tokio::test]
    async fn options_reports_cors_headers() {
        let transport = test_transport();
        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("OPTIONS")
            .uri("/mcp")
            .header(header::ORIGIN, "https://example.com")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn invalid_origin_is_rejected_with_400() {
        let mut config = StreamableConfig::minimal();
        config.validate_origin = true;
        config.allowed_origins = vec!["https://good.example.com".to_string()];
        let transport = StreamableHttpServerTransport::new(config);
        *transport.inner.message_cb.lock().unwrap() = Some(echo_cb());

        let app = transport.router();
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/mcp")
            .header(header::ORIGIN, "https://evil.example.com")
            .body(axum::body::Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn _is_object_safe() {
        fn assert_object_safe(_t: &dyn ServerTransport) {}
        let transport = StreamableHttpServerTransport::new(StreamableConfig::minimal());
        assert_object_safe(&transport);
    }
}
