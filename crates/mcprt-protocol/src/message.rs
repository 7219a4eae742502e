//! The wire-level JSON-RPC message: a tagged variant rather than the C-style
//! union the original implementation uses (see `SPEC_FULL.md` §9 Design Notes).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier correlating a request with its response.
///
/// The spec's data model fixes this at `u64`; we keep the newtype so call
/// sites read `MessageId` rather than a bare integer, and so a future
/// transport that needs string IDs has one place to widen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl From<u64> for MessageId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// One MCP JSON-RPC message: a request expecting a reply, a response to a
/// prior request, or a notification with no reply expected.
///
/// Deliberately *not* `#[serde(tag = "...")]` — JSON-RPC distinguishes the
/// three shapes structurally (presence of `id`, presence of `method`,
/// presence of `result`/`error`), not by an explicit tag field, so encoding
/// and decoding are implemented by hand in [`Message::from_json`] and
/// [`Message::to_json`].
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request {
        id: MessageId,
        method: String,
        params: Value,
    },
    Response {
        id: MessageId,
        result: Option<Value>,
        error: Option<RpcError>,
    },
    Notification {
        method: String,
        params: Value,
    },
}

impl Message {
    pub fn request(id: impl Into<MessageId>, method: impl Into<String>, params: Value) -> Self {
        Self::Request {
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    pub fn success(id: MessageId, result: Value) -> Self {
        Self::Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: MessageId, error: RpcError) -> Self {
        Self::Response {
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self::Notification {
            method: method.into(),
            params,
        }
    }

    pub fn id(&self) -> Option<MessageId> {
        match self {
            Self::Request { id, .. } | Self::Response { id, .. } => Some(*id),
            Self::Notification { .. } => None,
        }
    }

    /// Parse a single JSON-RPC message from a raw UTF-8 document.
    ///
    /// Returns `Err` with the raw, possibly-absent `id` when the document
    /// parses as JSON but does not conform to JSON-RPC — the dispatcher
    /// uses the recovered id to build a `-32700`/`-32600` error response
    /// when one is recoverable (see spec §7 Propagation policy).
    pub fn from_json(bytes: &[u8]) -> Result<Self, ParseFailure> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|_| ParseFailure { recovered_id: None })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ParseFailure> {
        let Value::Object(map) = &value else {
            return Err(ParseFailure { recovered_id: None });
        };

        let recovered_id = map.get("id").and_then(|v| v.as_u64()).map(MessageId);

        if let Some(method) = map.get("method").and_then(Value::as_str) {
            let params = map.get("params").cloned().unwrap_or(Value::Null);
            return Ok(match recovered_id {
                Some(id) => Message::Request {
                    id,
                    method: method.to_string(),
                    params,
                },
                None => Message::Notification {
                    method: method.to_string(),
                    params,
                },
            });
        }

        if let Some(id) = recovered_id {
            let result = map.get("result").cloned();
            let error = map
                .get("error")
                .cloned()
                .and_then(|e| serde_json::from_value(e).ok());
            if result.is_some() || error.is_some() {
                return Ok(Message::Response { id, result, error });
            }
        }

        Err(ParseFailure { recovered_id })
    }

    pub fn to_json(&self) -> Value {
        match self {
            Message::Request { id, method, params } => serde_json::json!({
                "jsonrpc": "2.0",
                "id": id.0,
                "method": method,
                "params": params,
            }),
            Message::Response { id, result, error } => {
                let mut obj = serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id.0,
                });
                let map = obj.as_object_mut().expect("object literal");
                if let Some(result) = result {
                    map.insert("result".to_string(), result.clone());
                } else if let Some(error) = error {
                    map.insert(
                        "error".to_string(),
                        serde_json::to_value(error).expect("RpcError serializes"),
                    );
                }
                obj
            }
            Message::Notification { method, params } => serde_json::json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
            }),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.to_json()).expect("Message serializes to JSON")
    }
}

/// Raised when a document fails to parse as a JSON-RPC message.
///
/// Carries a recovered `id` when one was extractable before the failure so
/// the caller can still build a `-32700` response addressed to the right
/// request; `None` means the document must be silently dropped (it could
/// not even be established to be a request rather than a notification).
#[derive(Debug, Clone, Copy)]
pub struct ParseFailure {
    pub recovered_id: Option<MessageId>,
}
