//! cinder-cli: one-shot command-line client for cinder.
//!
//! Sends a single command to the server and pretty-prints the reply,
//! e.g. `cinder-cli SET greeting hello` or `cinder-cli -p 4321 PTTL k`.

mod connection;
mod format;

use std::process::ExitCode;

use clap::Parser;
use cinder_protocol::Reply;
use colored::Colorize;

use crate::connection::Connection;
use crate::format::format_reply;

/// Command-line client for cinder.
#[derive(Parser)]
#[command(name = "cinder-cli", version, about)]
struct Args {
    /// Server hostname.
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port.
    #[arg(short, long, default_value_t = 1234)]
    port: u16,

    /// The command to send, e.g. `SET key value`.
    #[arg(required = true, num_args = 1..)]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut conn = match Connection::connect(&args.host, args.port) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            return ExitCode::from(1);
        }
    };

    match conn.send_command(&args.command) {
        Ok(reply) => {
            println!("{}", format_reply(&reply));
            if matches!(reply, Reply::Error { .. }) {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            ExitCode::from(1)
        }
    }
}
