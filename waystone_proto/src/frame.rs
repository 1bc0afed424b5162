//! Length-prefixed framing used on the TCP transport.
//!
//! Every frame is a little-endian `u32` byte count followed by the payload.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Largest payload accepted from a peer. Snapshots of very long lists stay
/// well below this.
pub const MAX_FRAME_LEN: u32 = 1 << 20;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame of {0} bytes exceeds limit")]
    TooLarge(u32),
    #[error("frame io failed: {0}")]
    Io(#[from] io::Error),
}

pub fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> io::Result<()> {
    let len = u32::try_from(frame.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    let mut buffer = Vec::with_capacity(4 + frame.len());
    buffer.extend_from_slice(&len.to_le_bytes());
    buffer.extend_from_slice(frame);
    writer.write_all(&buffer)?;
    writer.flush()
}

/// Read one frame. Returns `Ok(None)` when the peer closed the stream
/// between frames.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut header = [0u8; 4];
    // Only EOF before the first header byte is a clean close.
    loop {
        match reader.read(&mut header[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
    reader.read_exact(&mut header[1..])?;
    let len = u32::from_le_bytes(header);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}
