//! Blocking TCP connection to a cinder server.
//!
//! Sends command vectors as request frames and reads back the
//! length-wrapped typed reply.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use cinder_protocol::{encode_request, Reply};

/// Errors that can occur while talking to the server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server disconnected")]
    Disconnected,
}

/// A connected client.
pub struct Connection {
    stream: TcpStream,
}

impl Connection {
    /// Connects to a cinder server at the given host and port.
    pub fn connect(host: &str, port: u16) -> Result<Self, ClientError> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        Ok(Self { stream })
    }

    /// Sends one command (as a list of string tokens) and reads the
    /// reply.
    pub fn send_command(&mut self, tokens: &[String]) -> Result<Reply, ClientError> {
        let args: Vec<&[u8]> = tokens.iter().map(|t| t.as_bytes()).collect();
        self.stream.write_all(&encode_request(&args))?;
        self.read_reply()
    }

    /// Reads one length-wrapped reply off the socket.
    fn read_reply(&mut self) -> Result<Reply, ClientError> {
        let mut len_buf = [0u8; 4];
        read_exact(&mut self.stream, &mut len_buf)?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut body = vec![0u8; len];
        read_exact(&mut self.stream, &mut body)?;

        let (reply, consumed) = Reply::parse(&body)
            .map_err(|e| ClientError::Protocol(e.to_string()))?
            .ok_or_else(|| ClientError::Protocol("truncated reply body".into()))?;
        if consumed != len {
            return Err(ClientError::Protocol(format!(
                "reply body has {} trailing bytes",
                len - consumed
            )));
        }
        Ok(reply)
    }
}

fn read_exact(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), ClientError> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ClientError::Disconnected),
        Err(e) => Err(e.into()),
    }
}
