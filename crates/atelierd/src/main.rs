//! ATELIERD

use anyhow::Result;
use atelierd::cli::CLIArgs;
use atelierd::config::Settings;
use atelierd::{run_atelierd, setup_tracing};
use clap::Parser;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let rt = Runtime::new()?;

    rt.block_on(async {
        let args = CLIArgs::parse();
        let settings = Settings::new(args.config.as_deref())?;

        if !args.disable_logging {
            setup_tracing();
        }

        run_atelierd(&settings).await
    })
}
