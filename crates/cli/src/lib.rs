//! tw-lal - Taiwan registered letter (存證信函) generator
//!
//! Library half of the `tw-lal` binary, so the argument handling can be
//! exercised from tests.

mod app;

pub use app::{execute, run_cli, Cli};
