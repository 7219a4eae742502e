//! Transport factory (spec §4.1 "a factory picks a concrete transport by a
//! type tag plus a tagged configuration"). Concrete transport crates
//! (`mcprt-tcp`, `mcprt-websocket`, ...) register a factory for the
//! `TransportType` they implement; `mcprt-server` holds the one process-wide
//! [`TransportRegistry`] and never names a concrete transport type directly.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{TransportError, TransportResult};
use crate::traits::{ClientTransport, ServerTransport};
use crate::types::TransportType;

pub trait ServerTransportFactory: Send + Sync + std::fmt::Debug {
    fn transport_type(&self) -> TransportType;
    fn create(&self, config: Value) -> TransportResult<Arc<dyn ServerTransport>>;
}

pub trait ClientTransportFactory: Send + Sync + std::fmt::Debug {
    fn transport_type(&self) -> TransportType;
    fn create(&self, config: Value) -> TransportResult<Arc<dyn ClientTransport>>;
}

/// Either half of the factory pair, so call sites that only care "can this
/// tag be constructed at all" don't need to know which side it implements.
#[derive(Debug)]
pub enum TransportFactory {
    Server(Arc<dyn ServerTransportFactory>),
    Client(Arc<dyn ClientTransportFactory>),
}

#[derive(Debug, Default)]
pub struct TransportRegistry {
    servers: HashMap<TransportType, Arc<dyn ServerTransportFactory>>,
    clients: HashMap<TransportType, Arc<dyn ClientTransportFactory>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_server(&mut self, factory: Arc<dyn ServerTransportFactory>) {
        self.servers.insert(factory.transport_type(), factory);
    }

    pub fn register_client(&mut self, factory: Arc<dyn ClientTransportFactory>) {
        self.clients.insert(factory.transport_type(), factory);
    }

    pub fn create_server(
        &self,
        ty: TransportType,
        config: Value,
    ) -> TransportResult<Arc<dyn ServerTransport>> {
        let factory = self.servers.get(&ty).ok_or_else(|| {
            TransportError::Configuration(format!("no server transport registered for {ty:?}"))
        })?;
        factory.create(config)
    }

    pub fn create_client(
        &self,
        ty: TransportType,
        config: Value,
    ) -> TransportResult<Arc<dyn ClientTransport>> {
        let factory = self.clients.get(&ty).ok_or_else(|| {
            TransportError::Configuration(format!("no client transport registered for {ty:?}"))
        })?;
        factory.create(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NoopClientFactory;

    impl ClientTransportFactory for NoopClientFactory {
        fn transport_type(&self) -> TransportType {
            TransportType::Tcp
        }

        fn create(&self, _config: Value) -> TransportResult<Arc<dyn ClientTransport>> {
            Err(TransportError::Configuration("noop".into()))
        }
    }

    #[test]
    fn unregistered_type_is_a_configuration_error() {
        let registry = TransportRegistry::new();
        let err = registry
            .create_client(TransportType::Tcp, Value::Null)
            .unwrap_err();
        assert!(matches!(err, TransportError::Configuration(_)));
    }

    #[test]
    fn registered_factory_is_used() {
        let mut registry = TransportRegistry::new();
        registry.register_client(Arc::new(NoopClientFactory));
        let err = registry
            .create_client(TransportType::Tcp, Value::Null)
            .unwrap_err();
        assert!(matches!(err, TransportError::Configuration(_)));
    }
}
