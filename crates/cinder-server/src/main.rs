use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use cinder_server::{Cli, Server, ServerConfig};
use tracing::{error, info};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinder_server=info,cinder_core=info".into()),
        )
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    let config = match ServerConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(1);
        }
    };

    let stop = Arc::new(AtomicBool::new(false));
    if let Err(e) = cinder_server::signal::install_sigint(Arc::clone(&stop)) {
        error!("failed to install signal handler: {e}");
        return ExitCode::from(1);
    }

    let mut server = match Server::bind(&config, stop) {
        Ok(server) => server,
        Err(e) => {
            error!("failed to initialize server: {e}");
            return ExitCode::from(1);
        }
    };

    info!(
        "server running on port {} with {} worker threads",
        config.port, config.worker_threads
    );

    match server.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal server error: {e}");
            ExitCode::from(1)
        }
    }
}
