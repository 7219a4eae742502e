//! Host-facing handler trait objects (spec §4.9, Supplemented): the
//! registration surface the dispatcher assumes exists. Mirrors the
//! teacher's trait-object handler pattern — a handler is an `Arc<dyn Fn>`
//! returning a boxed future, not a generic type parameter, so the registry
//! can hold a heterogeneous collection of them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mcprt_protocol::{ContentItem, McpError};
use serde_json::Value;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Reads one resource URI (static or bound from a template) into content.
pub trait ResourceHandler: Send + Sync {
    fn read<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<ContentItem>, McpError>>;
}

impl<F, Fut> ResourceHandler for F
where
    F: Fn(&str) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<ContentItem>, McpError>> + Send + 'static,
{
    fn read<'a>(&'a self, uri: &'a str) -> BoxFuture<'a, Result<Vec<ContentItem>, McpError>> {
        Box::pin(self(uri))
    }
}

/// Invokes a tool's business logic with already-schema-validated arguments.
pub trait ToolHandler: Send + Sync {
    fn call<'a>(&'a self, arguments: &'a Value) -> BoxFuture<'a, Result<Value, McpError>>;
}

impl<F, Fut> ToolHandler for F
where
    F: Fn(&Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, McpError>> + Send + 'static,
{
    fn call<'a>(&'a self, arguments: &'a Value) -> BoxFuture<'a, Result<Value, McpError>> {
        Box::pin(self(arguments))
    }
}

pub type SharedResourceHandler = Arc<dyn ResourceHandler>;
pub type SharedToolHandler = Arc<dyn ToolHandler>;
