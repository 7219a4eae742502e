//! WebSocket client transport (spec §4.8): one outbound connection pool
//! member type, alongside `mcprt_tcp::TcpClientTransport`. No server half —
//! this crate only implements [`mcprt_transport::ClientTransport`].

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub, clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;

pub use client::WebSocketClientTransport;
pub use config::{ReconnectConfig, WsConfig};

use std::sync::Arc;

use mcprt_transport::{ClientTransport, ClientTransportFactory, TransportError, TransportResult, TransportType};
use serde_json::Value;

/// Registers [`WebSocketClientTransport`] under [`TransportType::WebSocket`]
/// with a [`mcprt_transport::TransportRegistry`].
#[derive(Debug, Default)]
pub struct WebSocketClientTransportFactory;

impl ClientTransportFactory for WebSocketClientTransportFactory {
    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    fn create(&self, config: Value) -> TransportResult<Arc<dyn ClientTransport>> {
        let config: WsConfig = if config.is_null() {
            WsConfig::default()
        } else {
            serde_json::from_value(config)
                .map_err(|e| TransportError::Configuration(format!("invalid websocket config: {e}")))?
        };
        Ok(Arc::new(WebSocketClientTransport::new(config)))
    }
}
