//! Server configuration from the command line.
//!
//! Two positional arguments, both optional: the listen port and the
//! background worker-thread count. Validation failures are reported as
//! configuration errors so `main` can exit with status 1.

use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use thiserror::Error;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "cinder-server", version, about = "In-memory key-value server")]
pub struct Cli {
    /// TCP port to listen on (1024-65535).
    #[arg(default_value_t = 1234)]
    pub port: u16,

    /// Worker threads for background value disposal.
    #[arg(default_value_t = 4)]
    pub worker_threads: usize,
}

/// Validated server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub worker_threads: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port number {0}. Use a port between 1024 and 65535")]
    InvalidPort(u16),

    #[error("thread count must be greater than 0")]
    ZeroThreads,
}

impl ServerConfig {
    /// Validates CLI arguments into a runnable configuration.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if cli.port < 1024 {
            return Err(ConfigError::InvalidPort(cli.port));
        }
        if cli.worker_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        Ok(Self {
            port: cli.port,
            worker_threads: cli.worker_threads,
        })
    }

    /// The listen address: all interfaces on the configured port.
    pub fn addr(&self) -> SocketAddr {
        (Ipv4Addr::UNSPECIFIED, self.port).into()
    }
}
