//! Length-framed TCP transport (spec §4.3): a server half that accepts many
//! peers and a client half that dials one remote address and reconnects
//! with backoff. Both share the `[u32 BE length][payload]` wire format in
//! [`framing`].

#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub, clippy::all)]
#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod framing;
mod server;

pub use client::TcpClientTransport;
pub use config::{ReconnectConfig, TcpConfig, TcpConfigBuilder};
pub use framing::{encode_frame, read_frame, write_frame, LENGTH_PREFIX_BYTES};
pub use server::TcpServerTransport;

use std::sync::Arc;

use mcprt_transport::{
    ClientTransport, ClientTransportFactory, ServerTransport, ServerTransportFactory,
    TransportError, TransportResult, TransportType,
};
use serde_json::Value;

/// Registers [`TcpServerTransport`] under [`TransportType::Tcp`] with a
/// [`mcprt_transport::TransportRegistry`].
#[derive(Debug, Default)]
pub struct TcpServerTransportFactory;

impl ServerTransportFactory for TcpServerTransportFactory {
    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    fn create(&self, config: Value) -> TransportResult<Arc<dyn ServerTransport>> {
        let config: TcpConfig = parse_config(config)?;
        Ok(Arc::new(TcpServerTransport::new(config)))
    }
}

/// Registers [`TcpClientTransport`] under [`TransportType::Tcp`] with a
/// [`mcprt_transport::TransportRegistry`].
#[derive(Debug, Default)]
pub struct TcpClientTransportFactory;

impl ClientTransportFactory for TcpClientTransportFactory {
    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    fn create(&self, config: Value) -> TransportResult<Arc<dyn ClientTransport>> {
        let config: TcpConfig = parse_config(config)?;
        Ok(Arc::new(TcpClientTransport::new(config)))
    }
}

fn parse_config(value: Value) -> TransportResult<TcpConfig> {
    if value.is_null() {
        return Ok(TcpConfig::default());
    }
    serde_json::from_value(value)
        .map_err(|e| TransportError::Configuration(format!("invalid tcp config: {e}")))
}
