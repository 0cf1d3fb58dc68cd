//! Request frame codec.
//!
//! A request is length-prefixed: a 4-byte big-endian payload length,
//! then the payload: a sequence of `(4-byte big-endian length, bytes)`
//! tuples running to the end of the payload. Each tuple is one argument
//! of the command vector, e.g. `["SET", "key", "value"]`.
//!
//! The parser operates on a buffered byte slice and never consumes it.
//! An under-sized buffer (missing header bytes, or a payload still in
//! flight) returns `Ok(None)` so the caller can keep reading; only a
//! tuple that overruns its enclosing payload is a hard error, because no
//! amount of further reading can repair the frame.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Hard cap on a single framed message, header included. Matches the
/// connection read-buffer bound: a frame larger than this could never be
/// buffered completely, so it is rejected up front.
pub const MAX_MSG_SIZE: usize = 4096;

/// Size of the length prefix on frames and argument tuples.
const LEN_PREFIX: usize = 4;

/// Tries to decode one request frame from `buf`.
///
/// Returns `Ok(Some((args, consumed)))` when a complete frame was
/// decoded, `Ok(None)` when more bytes are needed, or an error when the
/// frame is malformed beyond repair.
pub fn parse_request(buf: &[u8]) -> Result<Option<(Vec<Bytes>, usize)>, ProtocolError> {
    if buf.len() < LEN_PREFIX {
        return Ok(None);
    }

    let payload_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let frame_len = LEN_PREFIX + payload_len;

    if frame_len > MAX_MSG_SIZE {
        return Err(ProtocolError::FrameTooLarge(frame_len));
    }
    if buf.len() < frame_len {
        return Ok(None);
    }

    let mut args = Vec::new();
    let payload = &buf[LEN_PREFIX..frame_len];
    let mut pos = 0;

    while pos < payload.len() {
        let remaining = payload.len() - pos;
        if remaining < LEN_PREFIX {
            return Err(ProtocolError::TupleOverrun);
        }
        let str_len = u32::from_be_bytes([
            payload[pos],
            payload[pos + 1],
            payload[pos + 2],
            payload[pos + 3],
        ]) as usize;
        pos += LEN_PREFIX;

        if str_len > payload.len() - pos {
            return Err(ProtocolError::TupleOverrun);
        }
        args.push(Bytes::copy_from_slice(&payload[pos..pos + str_len]));
        pos += str_len;
    }

    Ok(Some((args, frame_len)))
}

/// Encodes a command vector as a request frame.
///
/// This is the client half of the codec; the server only parses.
pub fn encode_request(args: &[&[u8]]) -> BytesMut {
    let payload_len: usize = args.iter().map(|a| LEN_PREFIX + a.len()).sum();
    let mut buf = BytesMut::with_capacity(LEN_PREFIX + payload_len);

    buf.put_u32(payload_len as u32);
    for arg in args {
        buf.put_u32(arg.len() as u32);
        buf.put_slice(arg);
    }
    buf
}
