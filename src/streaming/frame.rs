//! Length-prefixed JSON framing for TCP streams
//!
//! ```text
//! ┌──────────────────┬────────────────────┐
//! │ Length (4 bytes) │ Payload (variable) │
//! │ Big-endian u32   │ JSON               │
//! └──────────────────┴────────────────────┘
//! ```
//!
//! Maximum payload size is 1 MiB; an oversized or zero length closes the
//! connection on the reading side.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Maximum accepted payload size
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Serialize a value and write it as one frame
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let payload = serde_json::to_vec(value)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(Error::InvalidFrame(format!(
            "payload of {} bytes exceeds maximum",
            payload.len()
        )));
    }

    writer.write_all(&(payload.len() as u32).to_be_bytes())?;
    writer.write_all(&payload)?;
    Ok(())
}

/// Read one frame and deserialize its payload
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header)?;

    let length = u32::from_be_bytes(header) as usize;
    if length == 0 || length > MAX_FRAME_SIZE {
        return Err(Error::InvalidFrame(format!("bad frame length {}", length)));
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;
    Ok(serde_json::from_slice(&payload)?)
}
