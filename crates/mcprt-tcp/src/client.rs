//! TCP client transport (spec §4.3 "Client"): connects to a fixed remote
//! address, reconnecting with exponential backoff and jitter on loss.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use mcprt_transport::{
    AtomicMetrics, ClientTransport, TransportCapabilities, TransportError, TransportMetrics,
    TransportResult, TransportState, TransportType,
};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::TcpConfig;
use crate::framing::{read_frame, write_frame};

pub struct TcpClientTransport {
    config: TcpConfig,
    stream: Mutex<Option<TcpStream>>,
    state: Arc<StdMutex<TransportState>>,
    metrics: Arc<AtomicMetrics>,
}

impl std::fmt::Debug for TcpClientTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpClientTransport")
            .field("remote_addr", &self.config.remote_addr)
            .field("state", &self.state)
            .finish()
    }
}

impl TcpClientTransport {
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            stream: Mutex::new(None),
            state: Arc::new(StdMutex::new(TransportState::Disconnected)),
            metrics: Arc::new(AtomicMetrics::default()),
        }
    }

    fn set_state(&self, new_state: TransportState) {
        *self.state.lock().expect("state mutex poisoned") = new_state;
    }

    async fn dial_once(&self) -> TransportResult<TcpStream> {
        let remote = self.config.remote_addr.ok_or_else(|| {
            TransportError::Configuration("tcp client requires a remote_addr".into())
        })?;
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        match tokio::time::timeout(timeout, TcpStream::connect(remote)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(TransportError::ConnectionFailed(e.to_string())),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Dial with the configured reconnect policy: retries with backoff and
    /// optional jitter until `should_retry` returns false.
    async fn dial_with_reconnect(&self) -> TransportResult<TcpStream> {
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
                    warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "tcp reconnect attempt failed, backing off");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl ClientTransport for TcpClientTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            supports_bidirectional: true,
            supports_streaming: false,
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
                *self.stream.lock().await = Some(stream);
                self.set_state(TransportState::Connected);
                info!(remote = ?self.config.remote_addr, "tcp client connected");
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
        *self.stream.lock().await = None;
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    async fn send(&self, payload: Bytes) -> TransportResult<()> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            if !self.config.reconnect.enable {
                return Err(TransportError::NotConnected);
            }
            self.set_state(TransportState::Reconnecting);
            *guard = Some(self.dial_with_reconnect().await?);
            self.set_state(TransportState::Connected);
        }
        let stream = guard.as_mut().expect("just populated above");
        match write_frame(stream, &payload).await {
            Ok(()) => {
                self.metrics.bytes_sent.fetch_add(payload.len() as u64, Ordering::Relaxed);
                self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                *guard = None;
                self.set_state(TransportState::Reconnecting);
                Err(e)
            }
        }
    }

    async fn receive(
        &self,
        timeout: Option<Duration>,
    ) -> TransportResult<Option<Bytes>> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let max_message_size = self.config.max_message_size;
        let result = match timeout {
            Some(d) => match tokio::time::timeout(d, read_frame(stream, max_message_size)).await {
                Ok(r) => r,
                Err(_) => return Err(TransportError::Timeout),
            },
            None => read_frame(stream, max_message_size).await,
        };

        match result {
            Ok(Some(payload)) => {
                self.metrics.bytes_received.fetch_add(payload.len() as u64, Ordering::Relaxed);
                self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                Ok(Some(Bytes::from(payload)))
            }
            Ok(None) => {
                debug!("tcp client connection closed by peer");
                *guard = None;
                self.set_state(TransportState::Disconnected);
                Ok(None)
            }
            Err(e) => {
                *guard = None;
                self.set_state(TransportState::Reconnecting);
                Err(e)
            }
        }
    }

    async fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconnectConfig;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn connect_send_receive_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let payload = read_frame(&mut stream, 1024).await.unwrap().unwrap();
            write_frame(&mut stream, &payload).await.unwrap();
        });

        let config = TcpConfig {
            remote_addr: Some(addr),
            reconnect: ReconnectConfig {
                enable: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let client = TcpClientTransport::new(config);
        client.connect().await.unwrap();
        client.send(Bytes::from_static(b"ping")).await.unwrap();
        let reply = client.receive(None).await.unwrap().unwrap();
        assert_eq!(reply, Bytes::from_static(b"ping"));

        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_without_remote_addr_is_configuration_error() {
        let config = TcpConfig {
            remote_addr: None,
            reconnect: ReconnectConfig {
                enable: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let client = TcpClientTransport::new(config);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Configuration(_)));
    }
}
