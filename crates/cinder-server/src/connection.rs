//! Per-socket connection state machine.
//!
//! A connection cycles `Request → Response → Request` until EOF, an I/O
//! error, a malformed frame, or the idle timeout ends it. In `Request`
//! it reads into a bounded buffer and processes every complete frame it
//! holds; pipelined requests are answered in arrival order, their
//! replies batched into one write buffer. In `Response` it flushes from
//! the write cursor until drained, then returns to `Request`.
//!
//! All socket I/O is non-blocking: `EINTR` retries transparently,
//! would-block yields back to the reactor, anything else ends the
//! connection. The reactor owns the lifetime; dropping the connection
//! closes the socket.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsFd, BorrowedFd};
use std::time::{Duration, Instant};

use bytes::{Buf, BufMut, BytesMut};
use cinder_core::Keyspace;
use cinder_protocol::{parse_request, MAX_MSG_SIZE};

use crate::dispatch;

/// Connections idle longer than this are closed by the reactor.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Reading request bytes.
    Request,
    /// Flushing reply bytes.
    Response,
    /// Finished; the reactor drops the connection.
    End,
}

/// One client connection and its buffered I/O state.
pub struct Connection {
    stream: TcpStream,
    state: ConnState,
    rbuf: BytesMut,
    wbuf: BytesMut,
    wsent: usize,
    last_active: Instant,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            state: ConnState::Request,
            rbuf: BytesMut::with_capacity(MAX_MSG_SIZE),
            wbuf: BytesMut::with_capacity(MAX_MSG_SIZE),
            wsent: 0,
            last_active: Instant::now(),
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Timestamp of the last successful byte transfer in either
    /// direction; the reactor uses it for the idle sweep.
    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    /// The poll events this connection is interested in.
    pub fn wants_write(&self) -> bool {
        self.state == ConnState::Response
    }

    /// Advances the state machine after a readiness event.
    pub fn on_ready(&mut self, keyspace: &mut Keyspace) {
        match self.state {
            ConnState::Request => self.handle_request(keyspace),
            ConnState::Response => self.handle_response(),
            ConnState::End => {}
        }
    }

    /// Reads until the socket would block (or the buffer is full),
    /// answers every complete frame, and starts flushing the replies.
    fn handle_request(&mut self, keyspace: &mut Keyspace) {
        loop {
            let room = MAX_MSG_SIZE - self.rbuf.len();
            if room == 0 {
                break;
            }
            let mut chunk = [0u8; MAX_MSG_SIZE];
            match self.stream.read(&mut chunk[..room]) {
                Ok(0) => {
                    self.state = ConnState::End;
                    return;
                }
                Ok(n) => {
                    self.rbuf.extend_from_slice(&chunk[..n]);
                    self.last_active = Instant::now();
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::debug!("read error: {e}");
                    self.state = ConnState::End;
                    return;
                }
            }
        }

        self.process_requests(keyspace);

        if self.state != ConnState::End && !self.wbuf.is_empty() {
            self.state = ConnState::Response;
            // optimistic flush; usually saves a poll round-trip
            self.handle_response();
        }
    }

    /// Answers every complete frame in the read buffer. Consumed bytes
    /// are dropped from the front so trailing pipelined requests are
    /// seen on the next pass.
    fn process_requests(&mut self, keyspace: &mut Keyspace) {
        loop {
            match parse_request(&self.rbuf) {
                Ok(Some((args, consumed))) => {
                    let mut reply = BytesMut::with_capacity(64);
                    dispatch::dispatch(&args, keyspace, &mut reply);

                    // each reply is wrapped in its little-endian total length
                    self.wbuf.put_u32_le(reply.len() as u32);
                    self.wbuf.extend_from_slice(&reply);

                    self.rbuf.advance(consumed);
                }
                Ok(None) => break,
                Err(e) => {
                    // unrecoverable framing error: no reply, just hang up
                    tracing::debug!("frame error: {e}");
                    self.state = ConnState::End;
                    return;
                }
            }
        }
    }

    /// Flushes the write buffer from the cursor. Returns to `Request`
    /// once everything is on the wire.
    fn handle_response(&mut self) {
        while self.wsent < self.wbuf.len() {
            match self.stream.write(&self.wbuf[self.wsent..]) {
                Ok(0) => {
                    self.state = ConnState::End;
                    return;
                }
                Ok(n) => {
                    self.wsent += n;
                    self.last_active = Instant::now();
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) => {
                    tracing::debug!("write error: {e}");
                    self.state = ConnState::End;
                    return;
                }
            }
        }

        self.wbuf.clear();
        self.wsent = 0;
        self.state = ConnState::Request;
    }
}

impl AsFd for Connection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}
