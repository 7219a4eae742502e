//! The request dispatcher, handler registry, and outbound connection pool
//! tying every transport, the resource cache, and the rate limiter
//! together behind one shared [`Dispatcher`] (spec §4.8, §4.9).

pub mod auth;
pub mod config;
pub mod connpool;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod registry;

pub use auth::{AllowAllVerifier, AuthContext, Credential, CredentialVerifier};
pub use config::{DispatcherConfig, RateLimitKeySource};
pub use connpool::{ConnectionPool, ConnectionPoolConfig, PooledConnection};
pub use dispatcher::{Dispatcher, RequestMeta};
pub use error::DispatchError;
pub use handlers::{BoxFuture, ResourceHandler, SharedResourceHandler, SharedToolHandler, ToolHandler};
pub use metrics::{AtomicPerformanceMetrics, PerformanceMetrics};
pub use registry::Registry;
