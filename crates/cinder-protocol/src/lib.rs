//! cinder-protocol: wire codec for the cinder key-value server.
//!
//! Requests are length-prefixed argument vectors (big-endian prefixes);
//! replies are tagged typed frames. The connection layer wraps each
//! serialized reply in a 4-byte little-endian total length before it
//! hits the socket.
//!
//! # quick start
//!
//! ```
//! use cinder_protocol::{encode_request, parse_request, Command};
//!
//! let frame = encode_request(&[b"SET", b"greeting", b"hello"]);
//! let (args, consumed) = parse_request(&frame).unwrap().unwrap();
//! assert_eq!(consumed, frame.len());
//!
//! let cmd = Command::parse(&args).unwrap();
//! assert!(matches!(cmd, Command::Set { .. }));
//! ```

pub mod command;
pub mod error;
pub mod reply;
pub mod request;

pub use command::{Command, CommandError, ERR_ARG, ERR_TYPE, ERR_UNKNOWN};
pub use error::ProtocolError;
pub use reply::Reply;
pub use request::{encode_request, parse_request, MAX_MSG_SIZE};
