use anyhow::Result;
use sitewatch::{
    cli::run_cli,
    utils::runtime::{multi_thread_runtime, run_to_completion},
};
use tracing::error;

fn main() -> Result<()> {
    run_to_completion(multi_thread_runtime()?, run_cli()).inspect_err(|e| {
        error!("Error running cli {e:?}");
    })?;
    Ok(())
}
