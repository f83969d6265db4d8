//! Subcommand implementations

pub mod build;
pub mod eval;
pub mod run;

use rill_runtime::LoadError;

/// VM exceptions are not `Send`, so load errors cross into `anyhow` as text
pub fn load_failure(err: LoadError) -> anyhow::Error {
    anyhow::anyhow!("{}", err)
}
