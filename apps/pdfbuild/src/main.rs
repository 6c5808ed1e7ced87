//! pdfbuild - Build PDFs from uploaded project archives
//!
//! Loads configuration, installs logging and runs the HTTP server until
//! Ctrl-C or SIGTERM.

mod cli;
mod error;
mod logging;

use crate::cli::Cli;
use crate::error::CliError;
use clap::Parser;
use pdfbuild::AppState;
use pdfbuild_config::Config;
use std::process;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_tracing(cli.json_logs, cli.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting pdfbuild v{}", env!("CARGO_PKG_VERSION"));

    // Precedence: file (or defaults) < environment < CLI flags
    let mut config = Config::load_or_default(cli.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli);
    config.validate()?;

    info!(
        program = %config.build.program,
        build_target = %config.build.target,
        timeout = ?config.build_timeout(),
        ttl = ?config.job_ttl(),
        work_root = %config.work_root().display(),
        "configuration loaded"
    );

    let listener = TcpListener::bind(config.listen_addr()).await?;
    let state = AppState::from_config(&config);
    pdfbuild::serve(listener, state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, cli: &Cli) {
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = &cli.host {
        config.server.host.clone_from(host);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("Shutdown signal received, draining connections");
}
