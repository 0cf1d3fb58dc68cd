//! The reactor: a single-threaded readiness loop over the listening
//! socket and every open connection.
//!
//! Each cycle builds the interest set (listener readable; connections
//! readable in `Request`, writable in `Response`), polls with a bounded
//! timeout, sweeps expired keys, drains the accept queue, advances every
//! ready state machine, and closes idle connections. The reactor thread
//! owns the keyspace outright; handlers run to completion between
//! polls, so no locking is needed anywhere in the store.

use std::io;
use std::net::{SocketAddr, TcpListener};
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use cinder_core::{time::now_us, DropHandle, Keyspace};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::connection::{ConnState, Connection, IDLE_TIMEOUT};
use crate::listener;

/// Upper bound on the poll timeout, so TTL sweeps never lag far behind
/// even on a silent server.
const MAX_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

/// The server: listening socket, keyspace, and connection table.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    keyspace: Keyspace,
    connections: AHashMap<RawFd, Connection>,
    stop: Arc<AtomicBool>,
}

impl Server {
    /// Binds the listening socket and prepares an empty keyspace.
    pub fn bind(config: &ServerConfig, stop: Arc<AtomicBool>) -> io::Result<Self> {
        let listener = listener::bind(config.addr())?;
        let local_addr = listener.local_addr()?;
        let keyspace = Keyspace::with_dropper(DropHandle::spawn(config.worker_threads));

        Ok(Self {
            listener,
            local_addr,
            keyspace,
            connections: AHashMap::new(),
            stop,
        })
    }

    /// The bound address; useful when the configured port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Runs the readiness loop until the stop flag is set.
    ///
    /// Returning drops the server, which closes the listening socket and
    /// every remaining connection.
    pub fn run(&mut self) -> io::Result<()> {
        info!("listening on {}", self.local_addr);

        while !self.stop.load(Ordering::SeqCst) {
            let timeout_ms = self.poll_timeout_ms();
            let listener_fd = self.listener.as_raw_fd();

            let mut fds: Vec<RawFd> = Vec::with_capacity(1 + self.connections.len());
            let mut pfds: Vec<PollFd> = Vec::with_capacity(1 + self.connections.len());

            pfds.push(PollFd::new(self.listener.as_fd(), PollFlags::POLLIN));
            fds.push(listener_fd);
            for (&fd, conn) in self.connections.iter() {
                let events = if conn.wants_write() {
                    PollFlags::POLLOUT
                } else {
                    PollFlags::POLLIN
                };
                pfds.push(PollFd::new(conn.as_fd(), events));
                fds.push(fd);
            }

            match poll(&mut pfds, PollTimeout::from(timeout_ms)) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }

            // ready fds, listener first: accept before servicing so a
            // busy connection can't starve new clients
            let ready: Vec<(RawFd, PollFlags)> = pfds
                .iter()
                .zip(&fds)
                .filter_map(|(pfd, &fd)| {
                    let revents = pfd.revents().unwrap_or(PollFlags::empty());
                    (!revents.is_empty()).then_some((fd, revents))
                })
                .collect();
            drop(pfds);

            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            self.keyspace.sweep_expired(now_us());

            for (fd, revents) in ready {
                if fd == listener_fd {
                    if revents.intersects(PollFlags::POLLIN) {
                        self.accept_connections();
                    }
                    continue;
                }

                let Some(conn) = self.connections.get_mut(&fd) else {
                    continue;
                };
                conn.on_ready(&mut self.keyspace);
                if conn.state() == ConnState::End {
                    debug!("closing connection (fd {fd})");
                    self.connections.remove(&fd);
                }
            }

            self.close_idle_connections();
        }

        info!("shutting down");
        Ok(())
    }

    /// Drains the accept queue, registering each new connection as
    /// non-blocking.
    fn accept_connections(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(true) {
                        warn!("failed to set {peer} non-blocking: {e}");
                        continue;
                    }
                    debug!("accepted connection from {peer}");
                    self.connections
                        .insert(stream.as_raw_fd(), Connection::new(stream));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("accept failed: {e}");
                    break;
                }
            }
        }
    }

    /// Poll timeout: at most [`MAX_POLL_TIMEOUT`], or sooner if a
    /// connection's idle deadline or the earliest expiry deadline lands
    /// earlier.
    fn poll_timeout_ms(&self) -> u16 {
        let now = Instant::now();
        let mut timeout = MAX_POLL_TIMEOUT;
        for conn in self.connections.values() {
            let idle_deadline = conn.last_active() + IDLE_TIMEOUT;
            timeout = timeout.min(idle_deadline.saturating_duration_since(now));
        }
        if let Some(deadline_us) = self.keyspace.next_deadline_us() {
            let remaining = Duration::from_micros(deadline_us.saturating_sub(now_us()));
            timeout = timeout.min(remaining);
        }
        timeout.as_millis() as u16
    }

    /// Closes connections that have been idle for [`IDLE_TIMEOUT`].
    fn close_idle_connections(&mut self) {
        let now = Instant::now();
        self.connections.retain(|&fd, conn| {
            if now.duration_since(conn.last_active()) >= IDLE_TIMEOUT {
                debug!("closing idle connection (fd {fd})");
                false
            } else {
                true
            }
        });
    }
}
