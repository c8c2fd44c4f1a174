//! tw-lal binary entry point

use anyhow::Result;
use lal_cli::run_cli;

fn main() -> Result<()> {
    run_cli()
}
