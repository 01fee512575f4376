pub mod output;
pub mod report;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::Duration;
use clap::{CommandFactory, Parser, Subcommand};
use report::{process_daily_command, process_report_command, DailyCommand, ReportCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{
        messaging::transport::Framing,
        start_daemon,
        storage::{entities::Settings, key_value::FileStore, statistics::StatisticsStore},
        SESSION_MAX_AGE_DAYS, STORAGE_DIR,
    },
    utils::{
        clock::DefaultClock,
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "sitewatch", version, long_about = None)]
#[command(about = "Reports time spent on websites", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to use $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Summary, top sites and recent days")]
    Report {
        #[command(flatten)]
        command: ReportCommand,
    },
    #[command(about = "Time spent during a single day")]
    Daily {
        #[command(flatten)]
        command: DailyCommand,
    },
    #[command(about = "Show or update settings")]
    Settings {
        #[arg(long)]
        tracking: Option<bool>,
        #[arg(long = "auto-pause")]
        auto_pause: Option<bool>,
        #[arg(long = "pause-threshold", help = "Auto pause threshold in minutes")]
        pause_threshold: Option<u32>,
    },
    #[command(about = "Turn tracking on or off")]
    Toggle {},
    #[command(about = "Remove sessions older than the given number of days")]
    Purge {
        #[arg(long, default_value_t = SESSION_MAX_AGE_DAYS as u32)]
        days: u32,
    },
    #[command(about = "Erase all statistics and settings")]
    Clear {
        #[arg(long, help = "Confirm erasing")]
        yes: bool,
    },
    #[command(
        about = "Run the messaging host directly in current console. Used for debugging"
    )]
    Serve {
        #[arg(long, value_enum, default_value_t = Framing::Lines)]
        framing: Framing,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();
    let app_dir = resolve_application_path(args.dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    match args.commands {
        Commands::Serve { framing } => start_daemon(app_dir, framing).await,
        Commands::Report { command } => {
            process_report_command(command, &open_statistics(&app_dir)?).await
        }
        Commands::Daily { command } => {
            process_daily_command(command, &open_statistics(&app_dir)?).await
        }
        Commands::Settings {
            tracking,
            auto_pause,
            pause_threshold,
        } => {
            let statistics = open_statistics(&app_dir)?;
            let settings = update_settings(
                statistics.get_settings().await,
                tracking,
                auto_pause,
                pause_threshold,
            );
            statistics.save_settings(&settings).await;
            print_settings(&settings);
            Ok(())
        }
        Commands::Toggle {} => {
            let statistics = open_statistics(&app_dir)?;
            let mut settings = statistics.get_settings().await;
            settings.tracking_enabled = !settings.tracking_enabled;
            statistics.save_settings(&settings).await;
            println!(
                "Tracking is {}",
                if settings.tracking_enabled { "on" } else { "off" }
            );
            Ok(())
        }
        Commands::Purge { days } => {
            let removed = open_statistics(&app_dir)?
                .purge_old_sessions(Duration::days(days as i64))
                .await;
            println!("Removed {removed} sessions");
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes {
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::MissingRequiredArgument,
                        "Refusing to erase data without --yes",
                    )
                    .into());
            }
            open_statistics(&app_dir)?.clear_all().await;
            println!("All data erased");
            Ok(())
        }
    }
}

fn open_statistics(app_dir: &std::path::Path) -> Result<StatisticsStore> {
    let store = FileStore::new(app_dir.join(STORAGE_DIR))?;
    Ok(StatisticsStore::new(Arc::new(store), Arc::new(DefaultClock)))
}

fn update_settings(
    mut settings: Settings,
    tracking: Option<bool>,
    auto_pause: Option<bool>,
    pause_threshold: Option<u32>,
) -> Settings {
    if let Some(tracking) = tracking {
        settings.tracking_enabled = tracking;
    }
    if let Some(auto_pause) = auto_pause {
        settings.auto_pause = auto_pause;
    }
    if let Some(minutes) = pause_threshold {
        settings.pause_threshold = Duration::minutes(minutes as i64);
    }
    settings
}

fn print_settings(settings: &Settings) {
    println!("Tracking\t{}", settings.tracking_enabled);
    println!("Auto pause\t{}", settings.auto_pause);
    println!(
        "Pause after\t{}",
        output::format_duration(settings.pause_threshold)
    );
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use clap::Parser;

    use crate::daemon::{messaging::transport::Framing, storage::entities::Settings};

    use super::{update_settings, Args, Commands};

    #[test]
    fn test_only_given_settings_change() {
        let settings = update_settings(Settings::default(), None, Some(false), Some(12));
        assert!(settings.tracking_enabled);
        assert!(!settings.auto_pause);
        assert_eq!(settings.pause_threshold, Duration::minutes(12));
    }

    #[test]
    fn test_global_flags_go_after_the_command() {
        let args = Args::parse_from(["sitewatch", "purge", "--dir", "/tmp/sw", "--log"]);
        assert!(args.log);
        assert_eq!(args.dir.as_deref(), Some(std::path::Path::new("/tmp/sw")));
        assert!(matches!(args.commands, Commands::Purge { days: 30 }));

        let args = Args::parse_from(["sitewatch", "serve"]);
        assert!(matches!(
            args.commands,
            Commands::Serve {
                framing: Framing::Lines
            }
        ));
    }
}
