//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

/// Atelier fulfillment daemon
#[derive(Debug, Parser)]
#[command(name = "atelierd", version, about = "The Atelier fulfillment daemon")]
pub struct CLIArgs {
    #[arg(
        short,
        long,
        help = "Use the <file name> as the location of the config file",
        required = false
    )]
    pub config: Option<PathBuf>,
    #[arg(long, help = "Do not initialize the tracing subscriber", required = false)]
    pub disable_logging: bool,
}
