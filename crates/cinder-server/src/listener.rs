//! Listening-socket setup.
//!
//! The classic sequence: socket, SO_REUSEADDR, bind, listen, O_NONBLOCK.
//! Everything past this point speaks std types; socket2 is only needed
//! to set options before bind.

use std::net::{SocketAddr, TcpListener};

use socket2::{Domain, Protocol, Socket, Type};

/// Accept backlog.
const BACKLOG: i32 = 128;

/// Creates a non-blocking listening socket bound to `addr`.
pub fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}
