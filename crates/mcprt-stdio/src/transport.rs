//! Standard I/O transport: reads one JSON-RPC message per line from stdin
//! (or a raw reader), dispatches it to `message_cb`, and writes any reply
//! back as a line on stdout (or a raw writer).
//!
//! # Interior mutability
//!
//! `state` uses `std::sync::Mutex` (short, never held across `.await`);
//! the stream pair and task handle use `tokio::sync::Mutex` because setup
//! and teardown cross `.await` points.

use std::pin::Pin;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use mcprt_transport::{
    AtomicMetrics, ErrorCallback, MessageCallback, ServerTransport, TransportCapabilities,
    TransportError, TransportMetrics, TransportResult, TransportState, TransportType,
};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error, trace};

type BoxedAsyncRead = Pin<Box<dyn AsyncRead + Send + Sync + 'static>>;
type BoxedAsyncWrite = Pin<Box<dyn AsyncWrite + Send + Sync + 'static>>;

enum StreamSource {
    ProcessStdio,
    Raw {
        reader: BoxedAsyncRead,
        writer: BoxedAsyncWrite,
    },
}

impl std::fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProcessStdio => write!(f, "ProcessStdio"),
            Self::Raw { .. } => write!(f, "Raw"),
        }
    }
}

/// A stdio transport over the current process's stdin/stdout, or a raw
/// async reader/writer pair (e.g. for tests, or a spawned subprocess).
pub struct StdioTransport {
    state: Arc<StdMutex<TransportState>>,
    metrics: Arc<AtomicMetrics>,
    stream_source: TokioMutex<Option<StreamSource>>,
    task_handle: TokioMutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("state", &self.state)
            .finish()
    }
}

impl StdioTransport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(StdMutex::new(TransportState::Disconnected)),
            metrics: Arc::new(AtomicMetrics::default()),
            stream_source: TokioMutex::new(Some(StreamSource::ProcessStdio)),
            task_handle: TokioMutex::new(None),
        }
    }

    /// Build a transport over an arbitrary reader/writer pair.
    pub fn from_raw<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Sync + 'static,
        W: AsyncWrite + Send + Sync + 'static,
    {
        Self {
            state: Arc::new(StdMutex::new(TransportState::Disconnected)),
            metrics: Arc::new(AtomicMetrics::default()),
            stream_source: TokioMutex::new(Some(StreamSource::Raw {
                reader: Box::pin(reader),
                writer: Box::pin(writer),
            })),
            task_handle: TokioMutex::new(None),
        }
    }

    fn set_state(&self, new_state: TransportState) {
        *self.state.lock().expect("state mutex poisoned") = new_state;
    }

    /// Messages MUST NOT contain embedded newlines (spec §6): this rejects
    /// a reply that would otherwise corrupt line framing.
    fn validate_no_embedded_newline(line: &str) -> TransportResult<()> {
        if line.contains('\n') || line.contains('\r') {
            return Err(TransportError::Framing(
                "message contains an embedded newline, forbidden by stdio framing".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerTransport for StdioTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            supports_bidirectional: true,
            supports_streaming: false,
            max_message_size: Some(mcprt_protocol::MAX_MESSAGE_SIZE),
        }
    }

    async fn state(&self) -> TransportState {
        self.state.lock().expect("state mutex poisoned").clone()
    }

    async fn start(
        &self,
        message_cb: MessageCallback,
        error_cb: ErrorCallback,
    ) -> TransportResult<()> {
        let source = self
            .stream_source
            .lock()
            .await
            .take()
            .ok_or_else(|| TransportError::Configuration("stdio transport already started".into()))?;

        self.set_state(TransportState::Connecting);

        let (mut lines_in, mut lines_out): (
            FramedRead<BufReader<BoxedAsyncRead>, LinesCodec>,
            FramedWrite<BoxedAsyncWrite, LinesCodec>,
        ) = match source {
            StreamSource::ProcessStdio => {
                let stdin: BoxedAsyncRead = Box::pin(tokio::io::stdin());
                let buffered = BufReader::new(stdin);
                let stdout: BoxedAsyncWrite = Box::pin(tokio::io::stdout());
                (
                    FramedRead::new(buffered, LinesCodec::new()),
                    FramedWrite::new(stdout, LinesCodec::new()),
                )
            }
            StreamSource::Raw { reader, writer } => {
                let buffered = BufReader::new(reader);
                (
                    FramedRead::new(buffered, LinesCodec::new()),
                    FramedWrite::new(writer, LinesCodec::new()),
                )
            }
        };

        let metrics = self.metrics.clone();
        let state = self.state.clone();

        let handle = tokio::spawn(async move {
            while let Some(result) = lines_in.next().await {
                let line = match result {
                    Ok(line) => line,
                    Err(e) => {
                        error!(error = %e, "stdio read failed");
                        error_cb(TransportError::ReceiveFailed(e.to_string()));
                        break;
                    }
                };
                let line = line.trim_end_matches('\r');
                if line.trim().is_empty() {
                    continue;
                }
                trace!(bytes = line.len(), "stdio line received");
                metrics.bytes_received.fetch_add(line.len() as u64, Ordering::Relaxed);
                metrics.messages_received.fetch_add(1, Ordering::Relaxed);

                match message_cb(Bytes::from(line.to_string())).await {
                    Ok(Some(reply)) => {
                        let reply_str = match std::str::from_utf8(&reply) {
                            Ok(s) => s,
                            Err(e) => {
                                error_cb(TransportError::SendFailed(e.to_string()));
                                continue;
                            }
                        };
                        if let Err(e) = StdioTransport::validate_no_embedded_newline(reply_str) {
                            error_cb(e);
                            continue;
                        }
                        if let Err(e) = lines_out.send(reply_str.to_string()).await {
                            error!(error = %e, "stdio write failed");
                            error_cb(TransportError::SendFailed(e.to_string()));
                            break;
                        }
                        metrics.bytes_sent.fetch_add(reply_str.len() as u64, Ordering::Relaxed);
                        metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error_cb(e);
                    }
                }
            }
            debug!("stdio reader loop ended");
            *state.lock().expect("state mutex poisoned") = TransportState::Disconnected;
        });

        *self.task_handle.lock().await = Some(handle);
        self.set_state(TransportState::Connected);
        Ok(())
    }

    async fn stop(&self) -> TransportResult<()> {
        self.set_state(TransportState::Disconnecting);
        if let Some(handle) = self.task_handle.lock().await.take() {
            handle.abort();
        }
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    async fn metrics(&self) -> TransportMetrics {
        self.metrics.snapshot()
    }

    fn endpoint(&self) -> Option<String> {
        Some("stdio://".to_string())
    }
}

/// Registers [`StdioTransport`] under [`TransportType::Stdio`] with a
/// [`mcprt_transport::TransportRegistry`].
#[derive(Debug, Default)]
pub struct StdioServerTransportFactory;

impl mcprt_transport::ServerTransportFactory for StdioServerTransportFactory {
    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }

    fn create(&self, _config: serde_json::Value) -> TransportResult<Arc<dyn ServerTransport>> {
        Ok(Arc::new(StdioTransport::new()))
    }
}
