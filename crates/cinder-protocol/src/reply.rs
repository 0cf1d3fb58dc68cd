//! Typed reply frames.
//!
//! Every reply starts with a one-byte type tag. Integer bodies are ASCII
//! decimal terminated by CRLF; Double bodies are the 8 raw bytes of an
//! IEEE-754 double; Error and String carry native-byte-order length
//! words. These encodings reproduce the wire the bundled client code
//! expects, so they must not be "fixed" to a uniform endianness.
//!
//! Serialization writes directly into a `BytesMut`, no intermediate
//! allocations. The parser exists for the client half (tests, tooling);
//! the server never parses replies.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Reply type tags, one byte on the wire.
const TAG_NIL: u8 = 0;
const TAG_ERROR: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_INTEGER: u8 = 3;
const TAG_DOUBLE: u8 = 4;

/// A single typed reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Absent value, e.g. GET on a missing key.
    Nil,
    /// Error with a numeric code and a human-readable message.
    Error { code: i32, message: String },
    /// Binary-safe string value.
    String(Bytes),
    /// 64-bit signed integer.
    Integer(i64),
    /// IEEE-754 double.
    Double(f64),
}

impl Reply {
    /// Shorthand for an error reply.
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Reply::Error {
            code,
            message: message.into(),
        }
    }

    /// Serializes this reply into the provided buffer.
    pub fn serialize(&self, dst: &mut BytesMut) {
        match self {
            Reply::Nil => {
                dst.put_u8(TAG_NIL);
            }
            Reply::Error { code, message } => {
                dst.put_u8(TAG_ERROR);
                dst.put_slice(&code.to_ne_bytes());
                dst.put_slice(&(message.len() as u32).to_ne_bytes());
                dst.put_slice(message.as_bytes());
            }
            Reply::String(data) => {
                dst.put_u8(TAG_STRING);
                dst.put_slice(&(data.len() as u32).to_ne_bytes());
                dst.put_slice(data);
            }
            Reply::Integer(n) => {
                dst.put_u8(TAG_INTEGER);
                let mut buf = itoa::Buffer::new();
                dst.put_slice(buf.format(*n).as_bytes());
                dst.put_slice(b"\r\n");
            }
            Reply::Double(d) => {
                dst.put_u8(TAG_DOUBLE);
                dst.put_slice(&d.to_ne_bytes());
            }
        }
    }

    /// Tries to decode one reply from `buf`.
    ///
    /// Returns `Ok(Some((reply, consumed)))` on success, `Ok(None)` when
    /// more bytes are needed.
    pub fn parse(buf: &[u8]) -> Result<Option<(Reply, usize)>, ProtocolError> {
        let Some(&tag) = buf.first() else {
            return Ok(None);
        };
        let body = &buf[1..];

        match tag {
            TAG_NIL => Ok(Some((Reply::Nil, 1))),
            TAG_ERROR => {
                if body.len() < 8 {
                    return Ok(None);
                }
                let code = i32::from_ne_bytes([body[0], body[1], body[2], body[3]]);
                let len = u32::from_ne_bytes([body[4], body[5], body[6], body[7]]) as usize;
                if body.len() < 8 + len {
                    return Ok(None);
                }
                let message = String::from_utf8_lossy(&body[8..8 + len]).into_owned();
                Ok(Some((Reply::Error { code, message }, 1 + 8 + len)))
            }
            TAG_STRING => {
                if body.len() < 4 {
                    return Ok(None);
                }
                let len = u32::from_ne_bytes([body[0], body[1], body[2], body[3]]) as usize;
                if body.len() < 4 + len {
                    return Ok(None);
                }
                let data = Bytes::copy_from_slice(&body[4..4 + len]);
                Ok(Some((Reply::String(data), 1 + 4 + len)))
            }
            TAG_INTEGER => {
                let Some(crlf) = body.windows(2).position(|w| w == b"\r\n") else {
                    return Ok(None);
                };
                let digits = std::str::from_utf8(&body[..crlf])
                    .map_err(|_| ProtocolError::InvalidReplyTag(tag))?;
                let n: i64 = digits
                    .parse()
                    .map_err(|_| ProtocolError::InvalidReplyTag(tag))?;
                Ok(Some((Reply::Integer(n), 1 + crlf + 2)))
            }
            TAG_DOUBLE => {
                if body.len() < 8 {
                    return Ok(None);
                }
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&body[..8]);
                Ok(Some((Reply::Double(f64::from_ne_bytes(raw)), 9)))
            }
            other => Err(ProtocolError::InvalidReplyTag(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(reply: &Reply) -> BytesMut {
        let mut buf = BytesMut::new();
        reply.serialize(&mut buf);
        buf
    }

    #[test]
    fn nil_is_one_tag_byte() {
        assert_eq!(&serialize(&Reply::Nil)[..], &[TAG_NIL]);
    }

    #[test]
    fn integer_is_ascii_decimal_crlf() {
        assert_eq!(&serialize(&Reply::Integer(42))[..], b"\x0342\r\n");
        assert_eq!(&serialize(&Reply::Integer(-2))[..], b"\x03-2\r\n");
        assert_eq!(&serialize(&Reply::Integer(0))[..], b"\x030\r\n");
    }

    #[test]
    fn string_layout() {
        let buf = serialize(&Reply::String(Bytes::from_static(b"OK")));
        assert_eq!(buf[0], TAG_STRING);
        assert_eq!(
            u32::from_ne_bytes([buf[1], buf[2], buf[3], buf[4]]),
            2
        );
        assert_eq!(&buf[5..], b"OK");
    }

    #[test]
    fn error_layout() {
        let buf = serialize(&Reply::error(-2, "unknown command"));
        assert_eq!(buf[0], TAG_ERROR);
        assert_eq!(
            i32::from_ne_bytes([buf[1], buf[2], buf[3], buf[4]]),
            -2
        );
        assert_eq!(
            u32::from_ne_bytes([buf[5], buf[6], buf[7], buf[8]]) as usize,
            "unknown command".len()
        );
    }

    #[test]
    fn double_is_raw_bits() {
        let buf = serialize(&Reply::Double(1.5));
        assert_eq!(buf[0], TAG_DOUBLE);
        assert_eq!(&buf[1..], &1.5f64.to_ne_bytes());
    }

    #[test]
    fn round_trip_all_variants() {
        let replies = vec![
            Reply::Nil,
            Reply::error(-1, "GET requires one key"),
            Reply::String(Bytes::from_static(b"binary\x00data")),
            Reply::String(Bytes::new()),
            Reply::Integer(i64::MAX),
            Reply::Integer(i64::MIN),
            Reply::Integer(0),
            Reply::Double(-0.125),
        ];

        for original in &replies {
            let buf = serialize(original);
            let (parsed, consumed) = Reply::parse(&buf)
                .expect("round-trip parse should not error")
                .expect("round-trip parse should return a reply");
            assert_eq!(&parsed, original, "round-trip failed for {original:?}");
            assert_eq!(consumed, buf.len());
        }
    }

    #[test]
    fn parse_incomplete_returns_none() {
        let full = serialize(&Reply::String(Bytes::from_static(b"hello")));
        for split in 0..full.len() {
            assert_eq!(Reply::parse(&full[..split]).unwrap(), None);
        }
    }

    #[test]
    fn parse_unknown_tag_is_error() {
        assert!(matches!(
            Reply::parse(&[9, 0, 0]).unwrap_err(),
            ProtocolError::InvalidReplyTag(9)
        ));
    }
}
