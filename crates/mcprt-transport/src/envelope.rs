//! [`TransportMessage`]: the framing-agnostic envelope passed between a
//! transport and the dispatcher's `message_callback` (spec §4.1).

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

const MAX_CUSTOM_HEADERS: usize = 64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportMessageMetadata {
    pub content_type: Option<String>,
    pub correlation_id: Option<String>,
    pub headers: HashMap<String, String>,
    pub is_heartbeat: bool,
}

impl TransportMessageMetadata {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.headers.len() > MAX_CUSTOM_HEADERS {
            return Err("too many custom headers");
        }
        Ok(())
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// A single message in flight, carrying its raw payload bytes (already
/// framed/unframed by the owning transport) plus transport-level metadata.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    pub payload: Bytes,
    pub metadata: TransportMessageMetadata,
}

impl TransportMessage {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            metadata: TransportMessageMetadata::default(),
        }
    }

    pub fn with_metadata(payload: impl Into<Bytes>, metadata: TransportMessageMetadata) -> Self {
        Self {
            payload: payload.into(),
            metadata,
        }
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
