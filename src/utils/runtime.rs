use std::{future::Future, time::Duration};

use anyhow::Result;
use tokio::runtime::Runtime;

/// Reading stdin occupies a blocking thread that only finishes with the next input, so the
/// runtime is not allowed to wait for it on exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(250);

pub fn single_thread_runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

pub fn multi_thread_runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

/// Runs `future` and shuts the runtime down without waiting for blocked stdin readers.
pub fn run_to_completion<F: Future>(runtime: Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_TIMEOUT);
    output
}
