//! `[u32 big-endian length][payload bytes]` framing shared by the server and
//! client halves of this transport (spec §4.3, wire format spec §6).
//!
//! A length of `0` or greater than `max_message_size` is a framing
//! violation and the caller must close the connection (spec §6): "Length 0
//! or > `max_message_size` terminates the connection."

use bytes::{BufMut, Bytes, BytesMut};
use mcprt_transport::{TransportError, TransportResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Encode one frame: 4-byte big-endian length prefix followed by `payload`.
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_BYTES + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Read exactly one frame from `reader`. Returns `Ok(None)` on a clean EOF
/// before any bytes of a new frame arrive (the peer closed between
/// messages); any other failure is a framing violation and the caller must
/// close the connection, per spec §6.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_message_size: usize,
) -> TransportResult<Option<Vec<u8>>> {
    let mut len_buf = [0u8; LENGTH_PREFIX_BYTES];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(TransportError::Io(e.to_string())),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 {
        return Err(TransportError::Framing("zero-length frame".into()));
    }
    if len > max_message_size {
        return Err(TransportError::MessageTooLarge {
            size: len,
            max: max_message_size,
        });
    }
    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| TransportError::Framing(format!("truncated frame: {e}")))?;
    Ok(Some(payload))
}

/// Write one frame, looping (`send_exact` per spec §4.3) until every byte
/// is written or the writer reports an unrecoverable error.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> TransportResult<()> {
    if payload.len() > u32::MAX as usize {
        return Err(TransportError::MessageTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    let frame = encode_frame(payload);
    writer
        .write_all(&frame)
        .await
        .map_err(|e| TransportError::Io(e.to_string()))?;
    writer.flush().await.map_err(|e| TransportError::Io(e.to_string()))
}
