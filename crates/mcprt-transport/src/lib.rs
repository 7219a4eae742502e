//! The uniform transport contract (spec §4.1): `start`/`stop`/`send`/`destroy`
//! for servers, plus client-only `receive`, implemented as a `dyn`-safe async
//! trait per the teacher's `turbomcp-transport-traits` crate, and a factory
//! that dispatches on a type tag.

pub mod envelope;
pub mod error;
pub mod factory;
pub mod metrics;
pub mod traits;
pub mod types;

pub use envelope::{TransportMessage, TransportMessageMetadata};
pub use error::{TransportError, TransportResult};
pub use factory::{ClientTransportFactory, ServerTransportFactory, TransportFactory, TransportRegistry};
pub use metrics::{AtomicMetrics, TransportMetrics};
pub use traits::{ClientTransport, ErrorCallback, MessageCallback, ServerTransport};
pub use types::{TransportCapabilities, TransportState, TransportType};
