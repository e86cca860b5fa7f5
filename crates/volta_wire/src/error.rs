//! Error types for framing, files, and the remote protocols.

use std::path::PathBuf;

/// Errors raised while encoding, decoding, or exchanging frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Reading or writing the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a file failed.
    #[error("cannot access {path}: {source}")]
    File {
        /// The file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The frame header is missing, malformed, or not a Volta frame.
    #[error("invalid frame header: {reason}")]
    InvalidHeader {
        /// Description of the header problem.
        reason: String,
    },

    /// The frame was written by an incompatible format version.
    #[error("frame format version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The version this build reads.
        expected: u32,
        /// The version found in the frame.
        actual: u32,
    },

    /// The payload does not match the checksum in its header.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The checksum from the header.
        expected: String,
        /// The checksum of the payload as received.
        actual: String,
    },

    /// The stream ended inside a frame.
    #[error("stream ended inside a frame")]
    Truncated,

    /// A value could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// The peer answered with a message of the wrong kind.
    #[error("unexpected message: expected {expected}")]
    UnexpectedMessage {
        /// What the exchange required.
        expected: &'static str,
    },

    /// The solver process could not be run or gave no answer.
    #[error("solver failed: {reason}")]
    Solver {
        /// Why.
        reason: String,
    },
}
