//! [`ContentItem`]: the unit of content returned by resource reads and tool
//! calls. May be backed by a pool allocation (see `mcprt-cache::pool`); this
//! crate only defines the owned shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    Json,
    Binary,
}

/// A single piece of content: text, JSON, or opaque binary data, tagged
/// with a MIME type. `size` is tracked separately from `data.len()` because
/// pool-backed instances may reuse a larger backing buffer than the logical
/// content length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub kind: ContentKind,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub size: usize,
}

impl ContentItem {
    pub fn text(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        let data = data.into().into_bytes();
        let size = data.len();
        Self {
            kind: ContentKind::Text,
            mime_type: mime_type.into(),
            data,
            size,
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        let data = serde_json::to_vec(value).expect("value serializes");
        let size = data.len();
        Self {
            kind: ContentKind::Json,
            mime_type: "application/json".to_string(),
            data,
            size,
        }
    }

    pub fn binary(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        let size = data.len();
        Self {
            kind: ContentKind::Binary,
            mime_type: mime_type.into(),
            data,
            size,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        (self.kind == ContentKind::Text)
            .then(|| std::str::from_utf8(&self.data).ok())
            .flatten()
    }

    /// Deep-copy this item, matching the cache's "copy in, copy out"
    /// contract (spec §4.6 Put/Get semantics) rather than sharing the
    /// backing buffer with the cached original.
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_tracks_size() {
        let item = ContentItem::text("text/plain", "hi");
        assert_eq!(item.size, 2);
        assert_eq!(item.as_text(), Some("hi"));
    }

    #[test]
    fn binary_is_not_text() {
        let item = ContentItem::binary("application/octet-stream", vec![0, 1, 2]);
        assert_eq!(item.as_text(), None);
    }
}
