//! Transport-agnostic capability and state descriptors.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    Tcp,
    WebSocket,
    Http,
    StreamableHttp,
    Stdio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportCapabilities {
    pub supports_bidirectional: bool,
    pub supports_streaming: bool,
    pub max_message_size: Option<usize>,
}

impl Default for TransportCapabilities {
    fn default() -> Self {
        Self {
            supports_bidirectional: false,
            supports_streaming: false,
            max_message_size: Some(mcprt_protocol::MAX_MESSAGE_SIZE),
        }
    }
}

/// Lifecycle state of a transport, mirroring the state machine in spec
/// §4.3 (`Disconnected -> Connecting -> Connected -> Reconnecting -> ...`)
/// generalised to every transport, not just the TCP client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Disconnecting,
    Failed { reason: String },
}
