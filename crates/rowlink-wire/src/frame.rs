//! Length-prefixed frame codec.
//!
//! A frame is a 4-byte big-endian payload length followed by the encoded
//! message. I/O failures map to [`RowlinkError::Transport`]; a frame that
//! violates the size bound or fails to decode maps to
//! [`RowlinkError::Protocol`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use rowlink_common::{Result, RowlinkError};

/// Upper bound for a single frame. A service answering with more than
/// this in one frame is misbehaving, not just large.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Write one message as a frame.
pub async fn write_frame<W, T>(io: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(msg)
        .map_err(|e| RowlinkError::Protocol(format!("failed to encode frame: {e}")))?;
    if payload.len() > MAX_FRAME_BYTES {
        return Err(RowlinkError::Protocol(format!(
            "outgoing frame of {} bytes exceeds the {} byte limit",
            payload.len(),
            MAX_FRAME_BYTES
        )));
    }

    io.write_all(&(payload.len() as u32).to_be_bytes())
        .await
        .map_err(|e| RowlinkError::Transport(format!("failed to write frame header: {e}")))?;
    io.write_all(&payload)
        .await
        .map_err(|e| RowlinkError::Transport(format!("failed to write frame payload: {e}")))?;
    io.flush()
        .await
        .map_err(|e| RowlinkError::Transport(format!("failed to flush frame: {e}")))?;
    Ok(())
}

/// Read one frame and decode it as `T`.
pub async fn read_frame<R, T>(io: &mut R) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    io.read_exact(&mut len_buf)
        .await
        .map_err(|e| RowlinkError::Transport(format!("failed to read frame header: {e}")))?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(RowlinkError::Protocol(format!(
            "incoming frame of {len} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
        )));
    }

    let mut payload = vec![0u8; len];
    io.read_exact(&mut payload)
        .await
        .map_err(|e| RowlinkError::Transport(format!("failed to read frame payload: {e}")))?;

    serde_json::from_slice(&payload)
        .map_err(|e| RowlinkError::Protocol(format!("failed to decode frame: {e}")))
}
