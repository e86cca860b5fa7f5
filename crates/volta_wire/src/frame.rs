//! Checksummed, length-delimited frames.
//!
//! Every message and file is one frame: a 4-byte little-endian header length,
//! a bincode-encoded [`FrameHeader`], then the payload. The header carries
//! magic bytes, the format version, the payload length, and a checksum of
//! the payload, so a truncated or corrupted frame is rejected before the
//! payload is decoded.

use crate::error::WireError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use volta_common::ContentHash;

/// Magic bytes identifying a Volta frame.
const FRAME_MAGIC: [u8; 4] = *b"VOLT";

/// Current frame format version. Increment on breaking changes to the
/// header or to any payload type.
pub const FORMAT_VERSION: u32 = 1;

/// Headers are small; anything larger is garbage.
const MAX_HEADER_LEN: usize = 4096;

/// Header prepended to every payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameHeader {
    /// Magic bytes: must be `b"VOLT"`.
    pub magic: [u8; 4],

    /// Frame format version.
    pub format_version: u32,

    /// Volta version that produced this frame.
    pub volta_version: String,

    /// Length of the payload in bytes.
    pub payload_len: u64,

    /// Content hash of the payload.
    pub checksum: ContentHash,
}

fn config() -> bincode::config::Configuration {
    bincode::config::standard()
}

fn serialization(err: impl std::fmt::Display) -> WireError {
    WireError::Serialization {
        reason: err.to_string(),
    }
}

/// Encodes `value` as a complete frame.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    let payload = bincode::serde::encode_to_vec(value, config()).map_err(serialization)?;
    let header = FrameHeader {
        magic: FRAME_MAGIC,
        format_version: FORMAT_VERSION,
        volta_version: env!("CARGO_PKG_VERSION").to_string(),
        payload_len: payload.len() as u64,
        checksum: ContentHash::from_bytes(&payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, config()).map_err(serialization)?;

    let header_len = header_bytes.len() as u32;
    let mut out = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes a complete frame. Trailing bytes are an error.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    let mut reader = bytes;
    let value = read_frame(&mut reader)?.ok_or(WireError::Truncated)?;
    if !reader.is_empty() {
        return Err(WireError::InvalidHeader {
            reason: format!("{} bytes after the frame", reader.len()),
        });
    }
    Ok(value)
}

/// Writes `value` as one frame and flushes.
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<(), WireError> {
    let frame = encode(value)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    log::trace!("wrote frame of {} bytes", frame.len());
    Ok(())
}

/// Reads one frame.
///
/// Returns `Ok(None)` if the stream ends cleanly before the frame starts.
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>, WireError> {
    let mut len_bytes = [0u8; 4];
    if !read_start(reader, &mut len_bytes)? {
        return Ok(None);
    }
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    if header_len > MAX_HEADER_LEN {
        return Err(WireError::InvalidHeader {
            reason: format!("header length {header_len} exceeds {MAX_HEADER_LEN}"),
        });
    }

    let mut header_bytes = vec![0u8; header_len];
    read_rest(reader, &mut header_bytes)?;
    let (header, _): (FrameHeader, usize) =
        bincode::serde::decode_from_slice(&header_bytes, config()).map_err(|err| {
            WireError::InvalidHeader {
                reason: err.to_string(),
            }
        })?;
    if header.magic != FRAME_MAGIC {
        return Err(WireError::InvalidHeader {
            reason: "missing magic bytes".to_string(),
        });
    }
    if header.format_version != FORMAT_VERSION {
        return Err(WireError::VersionMismatch {
            expected: FORMAT_VERSION,
            actual: header.format_version,
        });
    }

    let payload_len = usize::try_from(header.payload_len).map_err(|_| WireError::InvalidHeader {
        reason: format!("payload length {} does not fit in memory", header.payload_len),
    })?;
    let mut payload = Vec::new();
    reader
        .by_ref()
        .take(header.payload_len)
        .read_to_end(&mut payload)?;
    if payload.len() != payload_len {
        return Err(WireError::Truncated);
    }
    let actual = ContentHash::from_bytes(&payload);
    if actual != header.checksum {
        return Err(WireError::ChecksumMismatch {
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    let (value, _) = bincode::serde::decode_from_slice(&payload, config()).map_err(serialization)?;
    Ok(Some(value))
}

/// Fills `buf`, returning false if the stream was already at its end.
fn read_start<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool, WireError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(WireError::Truncated),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(true)
}

fn read_rest<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), WireError> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        ErrorKind::UnexpectedEof => WireError::Truncated,
        _ => err.into(),
    })
}
