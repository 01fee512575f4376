use anyhow::Result;
use clap::Parser;
use sitewatch::{
    daemon::{args::HostArgs, start_daemon},
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, HOST_PREFIX},
        runtime::{run_to_completion, single_thread_runtime},
    },
};
use tracing::error;

fn main() -> Result<()> {
    let args = HostArgs::parse();
    let app_dir = resolve_application_path(args.dir.clone())?;
    enable_logging(HOST_PREFIX, &app_dir.join("logs"), args.log, args.log_console)?;

    run_to_completion(single_thread_runtime()?, start_daemon(app_dir, args.framing))
        .inspect_err(|e| error!("Host failed {e:?}"))
}
