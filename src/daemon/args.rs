use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::messaging::transport::Framing;

/// Arguments of the native messaging host. The browser appends the caller origin and, on
/// Windows, the parent window handle. Both are accepted and ignored.
#[derive(Parser, Debug)]
#[command(name = "sitewatch-host", version, about = "Native messaging host for sitewatch")]
pub struct HostArgs {
    #[arg(long)]
    pub dir: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Framing::Native)]
    pub framing: Framing,
    /// This option is for debugging purposes only. Logs are written to stderr.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
    #[arg(long = "parent-window", hide = true)]
    pub parent_window: Option<i64>,
    #[arg(hide = true)]
    pub origin: Option<String>,
}
