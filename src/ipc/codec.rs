//! Length-prefixed frames carrying JSON-RPC text.
//!
//! Frame format:
//! ```text
//! ┌──────────┬──────────┬────────────────────────┐
//! │ len (4B) │ type(1B) │   UTF-8 JSON payload   │
//! │ u32 BE   │ u8       │                        │
//! └──────────┴──────────┴────────────────────────┘
//! ```
//! Length = sizeof(type byte) + sizeof(payload), NOT including the 4-byte prefix.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Frame type: JSON-RPC request from client.
pub const MSG_REQUEST: u8 = 0x01;
/// Frame type: JSON-RPC response to client.
pub const MSG_RESPONSE: u8 = 0x02;
/// Frame type: protocol-level error to client.
pub const MSG_ERROR: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Request,
    Response,
    Error,
    Unknown(u8),
}

impl From<u8> for FrameKind {
    fn from(byte: u8) -> Self {
        match byte {
            MSG_REQUEST => FrameKind::Request,
            MSG_RESPONSE => FrameKind::Response,
            MSG_ERROR => FrameKind::Error,
            other => FrameKind::Unknown(other),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Request => MSG_REQUEST,
            FrameKind::Response => MSG_RESPONSE,
            FrameKind::Error => MSG_ERROR,
            FrameKind::Unknown(byte) => byte,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn response(text: String) -> Self {
        Self {
            kind: FrameKind::Response,
            payload: text.into_bytes(),
        }
    }

    pub fn error(text: String) -> Self {
        Self {
            kind: FrameKind::Error,
            payload: text.into_bytes(),
        }
    }

    /// Payload as text; invalid UTF-8 is replaced, and then fails JSON decoding.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Read one frame from the stream.
///
/// Returns `None` on clean EOF before a length prefix. A length over
/// `max_frame_bytes` is an `InvalidData` error: the payload is not consumed,
/// so framing is lost and the caller must drop the connection.
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
    max_frame_bytes: u32,
) -> std::io::Result<Option<Frame>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let frame_len = u32::from_be_bytes(len_buf);
    if frame_len > max_frame_bytes {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Frame too large: {} bytes", frame_len),
        ));
    }
    if frame_len < 1 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Frame too short: missing type byte",
        ));
    }

    let mut kind = [0u8; 1];
    reader.read_exact(&mut kind).await?;
    let mut payload = vec![0u8; frame_len as usize - 1];
    reader.read_exact(&mut payload).await?;

    Ok(Some(Frame {
        kind: FrameKind::from(kind[0]),
        payload,
    }))
}

/// Write one frame and flush.
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    frame: &Frame,
) -> std::io::Result<()> {
    let frame_len = u32::try_from(frame.payload.len())
        .ok()
        .and_then(|len| len.checked_add(1))
        .ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Frame payload too large")
        })?;
    writer.write_all(&frame_len.to_be_bytes()).await?;
    writer.write_all(&[u8::from(frame.kind)]).await?;
    writer.write_all(&frame.payload).await?;
    writer.flush().await
}
