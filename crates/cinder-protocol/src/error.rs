//! Protocol error types for the binary request framing.

use thiserror::Error;

/// Errors that can occur when decoding a request frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A string tuple inside the payload declared more bytes than the
    /// payload has left. The frame can never become valid, so the
    /// connection must be torn down.
    #[error("malformed frame: string length overruns payload")]
    TupleOverrun,

    /// The declared frame size can never fit the connection's read
    /// buffer, so waiting for more bytes would block forever.
    #[error("frame of {0} bytes exceeds maximum message size")]
    FrameTooLarge(usize),

    /// A reply carried a type tag outside the known set.
    #[error("invalid reply tag: {0:#04x}")]
    InvalidReplyTag(u8),
}
