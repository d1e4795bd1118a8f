//! Framed reads and writes over a TCP stream

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use shared::messages::{check_frame_len, decode_payload, encode_frame};

use crate::error::ClusterResult;

/// Write one length-prefixed bincode frame
pub async fn write_frame<W, T>(stream: &mut W, message: &T) -> ClusterResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = encode_frame(message)?;
    stream.write_all(&frame).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one frame; `Ok(None)` on a clean end of stream before a new frame
pub async fn read_frame<R, T>(stream: &mut R) -> ClusterResult<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    match stream.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = check_frame_len(len_bytes)?;

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok(Some(decode_payload(&payload)?))
}
