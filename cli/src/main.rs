//! PortPilot CLI - Find and stop processes on listening ports
//!
//! A command-line tool for listing listening TCP ports, terminating the
//! owning processes and managing refresh and display preferences.

mod commands;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use portpilot_core::{
    JsonFileRepository, MemoryRepository, PortPilotEngine, SettingsRepository, SystemBackend,
};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "portpilot")]
#[command(author, version, about = "Find and stop processes on listening ports")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Disable interactive TUI mode
    #[arg(long, global = true)]
    no_tui: bool,

    /// Keep settings in memory instead of ~/.portpilot/settings.json
    #[arg(long, global = true)]
    no_persist: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List all listening ports
    #[command(alias = "ls")]
    List {
        /// Match port, process name or PID
        #[arg(short, long)]
        filter: Option<String>,

        /// Page to show (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Rows per page: 10, 25, 50 or 100
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// Kill the process with the given PID
    Kill {
        /// Process ID to terminate
        #[arg(allow_hyphen_values = true)]
        pid: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Keep printing the port list on every refresh
    Watch {
        /// Refresh interval in milliseconds (500-30000)
        #[arg(short, long)]
        interval: Option<u64>,

        /// Match port, process name or PID
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show or change preferences
    #[command(alias = "config")]
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show every setting
    Show,
    /// Set the auto-refresh interval in milliseconds
    Interval { ms: u64 },
    /// Turn auto refresh on or off
    AutoRefresh { state: Switch },
    /// Show or hide the status bar
    StatusBar { state: Switch },
    /// Set the default page size
    PageSize { size: usize },
    /// Set the colour theme (light, dark, system)
    Theme { theme: String },
    /// Set the interface language code
    Language { code: String },
    /// Manage favorite presets
    #[command(alias = "presets")]
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Save a preset
    Add { label: String, query: String },
    /// Remove a preset by its number in `preset list`
    #[command(alias = "rm")]
    Remove { number: usize },
    /// List saved presets
    #[command(alias = "ls")]
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl From<Switch> for bool {
    fn from(s: Switch) -> bool {
        s == Switch::On
    }
}

fn setup_logging(verbosity: u8, to_file: bool) -> Result<Option<WorkerGuard>> {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if !to_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init();
        return Ok(None);
    }

    // The TUI owns the terminal, so log to a file instead
    let log_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("portpilot")
        .join("logs");

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "portpilot.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(Some(guard))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let interactive =
        cli.command.is_none() && !cli.no_tui && !cli.json && atty::is(atty::Stream::Stdout);

    // Keep the guard alive for the duration of the program
    let _logging_guard = setup_logging(cli.verbose, interactive)?;

    if cli.no_persist {
        dispatch(cli, MemoryRepository::new(), interactive).await
    } else {
        dispatch(cli, JsonFileRepository::new()?, interactive).await
    }
}

async fn dispatch<R: SettingsRepository>(cli: Cli, repo: R, interactive: bool) -> Result<()> {
    let engine = PortPilotEngine::new(SystemBackend::new(), repo).await;

    match cli.command {
        Some(Commands::List {
            filter,
            page,
            page_size,
        }) => {
            commands::list::run(&engine, filter, page, page_size, cli.json).await?;
        }
        Some(Commands::Kill { pid, yes }) => {
            commands::kill::run(&engine, &pid, yes, cli.json).await?;
        }
        Some(Commands::Watch { interval, filter }) => {
            commands::watch::run(&engine, interval, filter, cli.json).await?;
        }
        Some(Commands::Settings { action }) => {
            match action.unwrap_or(SettingsAction::Show) {
                SettingsAction::Show => commands::settings::show(&engine, cli.json)?,
                SettingsAction::Interval { ms } => {
                    commands::settings::interval(&engine, ms).await?
                }
                SettingsAction::AutoRefresh { state } => {
                    commands::settings::auto_refresh(&engine, state.into()).await?
                }
                SettingsAction::StatusBar { state } => {
                    commands::settings::status_bar(&engine, state.into()).await?
                }
                SettingsAction::PageSize { size } => {
                    commands::settings::page_size(&engine, size).await?
                }
                SettingsAction::Theme { theme } => {
                    commands::settings::theme(&engine, &theme).await?
                }
                SettingsAction::Language { code } => {
                    commands::settings::language(&engine, &code).await?
                }
                SettingsAction::Preset { action } => match action {
                    PresetAction::Add { label, query } => {
                        commands::settings::add_preset(&engine, &label, &query).await?
                    }
                    PresetAction::Remove { number } => {
                        commands::settings::remove_preset(&engine, number).await?
                    }
                    PresetAction::List => commands::settings::list_presets(&engine, cli.json)?,
                },
            }
        }
        None => {
            // Default: Launch TUI or list ports
            if interactive {
                tui::run(&engine).await?;
            } else {
                commands::list::run(&engine, None, 1, None, cli.json).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from(["portpilot", "ls", "-f", "node", "--page", "2", "--json"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Some(Commands::List {
                filter,
                page,
                page_size,
            }) => {
                assert_eq!(filter.as_deref(), Some("node"));
                assert_eq!(page, 2);
                assert_eq!(page_size, None);
            }
            _ => panic!("expected list"),
        }
    }

    #[test]
    fn test_parse_kill_keeps_raw_pid() {
        let cli = Cli::try_parse_from(["portpilot", "kill", "-5", "-y"]).unwrap();
        match cli.command {
            Some(Commands::Kill { pid, yes }) => {
                assert_eq!(pid, "-5");
                assert!(yes);
            }
            _ => panic!("expected kill"),
        }
    }

    #[test]
    fn test_parse_settings() {
        let cli = Cli::try_parse_from(["portpilot", "settings", "auto-refresh", "off"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Settings {
                action: Some(SettingsAction::AutoRefresh { state: Switch::Off })
            })
        ));

        let cli =
            Cli::try_parse_from(["portpilot", "settings", "preset", "add", "Redis", "6379"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Settings {
                action: Some(SettingsAction::Preset {
                    action: PresetAction::Add { .. }
                })
            })
        ));

        assert!(Cli::try_parse_from(["portpilot", "settings", "status-bar", "maybe"]).is_err());
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["portpilot", "-vv", "--no-persist"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_persist);
        assert!(cli.command.is_none());
    }
}
