//! Command line interface definition

use clap::Parser;
use std::path::PathBuf;

/// pdfbuild - Build PDFs from uploaded project archives
#[derive(Parser, Debug)]
#[command(name = "pdfbuild")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build PDFs from uploaded project archives")]
#[command(long_about = None)]
pub struct Cli {
    /// Use alternate config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Port to listen on (overrides config and the PORT variable)
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind (overrides config and PDFBUILD_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}
