//! cinder-server: the TCP front end.
//!
//! A single-threaded poll reactor drives per-connection state machines
//! over the binary request/reply protocol, executing commands against
//! the in-process keyspace.

pub mod config;
pub mod connection;
pub mod dispatch;
pub mod listener;
pub mod server;
pub mod signal;

pub use config::{Cli, ConfigError, ServerConfig};
pub use connection::{ConnState, Connection, IDLE_TIMEOUT};
pub use server::Server;
