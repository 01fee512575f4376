//! Tracks how long the browser spends focused on each website.
//! The host process receives tab and window events from the browser extension over native
//! messaging, attributes elapsed time to the focused domain every second and keeps lifetime and
//! per-day totals on disk. The cli reads the same storage for reports.
//!

pub mod cli;
pub mod daemon;
pub mod fs;
pub mod utils;
