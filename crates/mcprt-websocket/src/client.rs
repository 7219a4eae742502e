//! WebSocket client transport (spec §4.8 connection-pool member): dials a
//! remote URL, reconnecting with the same exponential-backoff-plus-jitter
//! policy as [`mcprt_tcp`]'s client half.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use mcprt_transport::{
    AtomicMetrics, ClientTransport, TransportCapabilities, TransportError, TransportMetrics,
    TransportResult, TransportState, TransportType,
};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::WsConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

pub struct WebSocketClientTransport {
    config: WsConfig,
    sink: Mutex<Option<WsSink>>,
    source: Mutex<Option<WsSource>>,
    state: Arc<StdMutex<TransportState>>,
    metrics: Arc<AtomicMetrics>,
}

impl std::fmt::Debug for WebSocketClientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketClientTransport")
            .field("url", &self.config.url)
            .field("state", &self.state)
            .finish()
    }
}

impl WebSocketClientTransport {
    pub fn new(config: WsConfig) -> Self {
        Self {
            config,
            sink: Mutex::new(None),
            source: Mutex::new(None),
            state: Arc::new(StdMutex::new(TransportState::Disconnected)),
            metrics: Arc::new(AtomicMetrics::default()),
        }
    }

    fn set_state(&self, new_state: TransportState) {
        *self.state.lock().expect("state mutex poisoned") = new_state;
    }

    async fn dial_once(&self) -> TransportResult<WsStream> {
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        match tokio::time::timeout(timeout, tokio_tungstenite::connect_async(&self.config.url)).await
        {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => Err(TransportError::ConnectionFailed(e.to_string())),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn dial_with_reconnect(&self) -> TransportResult<WsStream> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.dial_once().await {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    if !self.config.reconnect.should_retry(attempt) {
                        return Err(e);
                    }
                    let mut delay = self.config.reconnect.base_delay(attempt);
                    if self.config.reconnect.randomize {
                        let jitter = 0.5 + fastrand::f64();
                        delay = Duration::from_secs_f64(delay.as_secs_f64() * jitter);
                    }
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "websocket reconnect attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl ClientTransport for WebSocketClientTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            supports_bidirectional: true,
            supports_streaming: true,
            max_message_size: Some(self.config.max_message_size),
        }
    }

    async fn state(&self) -> TransportState {
        self.state.lock().expect("state mutex poisoned").clone()
    }

    async fn connect(&self) -> TransportResult<()> {
        self.set_state(TransportState::Connecting);
        let stream = if self.config.reconnect.enable {
            self.dial_with_reconnect().await
        } else {
            self.dial_once().await
        };
        match stream {
            Ok(stream) => {
                let (sink, source) = stream.split();
                *self.sink.lock().await = Some(sink);
                *self.source.lock().await = Some(source);
                self.set_state(TransportState::Connected);
                info!(url = %self.config.url, "websocket client connected");
                Ok(())
            }
            Err(e) => {
                self.set_state(TransportState::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.set_state(TransportState::Disconnecting);
        if let Some(mut sink) = self.sink.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        *self.source.lock().await = None;
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    async fn send(&self, payload: Bytes) -> TransportResult<()> {
        if payload.len() > self.config.max_message_size {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max: self.config.max_message_size,
            });
        }
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;
        match sink.send(Message::Binary(payload.to_vec().into())).await {
            Ok(()) => {
                self.metrics.bytes_sent.fetch_add(payload.len() as u64, Ordering::Relaxed);
                self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.set_state(TransportState::Reconnecting);
                Err(TransportError::SendFailed(e.to_string()))
            }
        }
    }

    async fn receive(&self, timeout: Option<Duration>) -> TransportResult<Option<Bytes>> {
        let mut guard = self.source.lock().await;
        let source = guard.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            let next = match timeout {
                Some(d) => match tokio::time::timeout(d, source.next()).await {
                    Ok(n) => n,
                    Err(_) => return Err(TransportError::Timeout),
                },
                None => source.next().await,
            };

            match next {
                Some(Ok(Message::Binary(data))) => {
                    self.metrics.bytes_received.fetch_add(data.len() as u64, Ordering::Relaxed);
                    self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(Bytes::from(data.to_vec())));
                }
                Some(Ok(Message::Text(text))) => {
                    let data = text.as_bytes().to_vec();
                    self.metrics.bytes_received.fetch_add(data.len() as u64, Ordering::Relaxed);
                    self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    return Ok(Some(Bytes::from(data)));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    debug!("websocket connection closed by peer");
                    self.set_state(TransportState::Disconnected);
                    return Ok(None);
                }
                Some(Ok(Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    self.set_state(TransportState::Reconnecting);
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    async fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }
}
