pub mod dates;
pub mod export;
pub mod process;
pub mod settings;
pub mod stats;
pub mod tasks;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use export::{process_export_command, process_import_command, ExportCommand};
use process::{restart_daemon, stop_daemon};
use settings::{process_settings_command, SettingsCommand};
use stats::{process_stats_command, StatsCommand};
use tasks::{
    process_add_command, process_delete_command, process_edit_command, process_list_command,
    process_toggle_command, AddCommand, EditCommand, ListCommand,
};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::start_daemon,
    store::{blob_storage::FileBlobStorage, gateway::PersistenceGateway},
    tracker::{notify::LogNotifier, Tracker},
    utils::{
        clock::DefaultClock,
        dir::resolve_application_path,
        logging::{enable_logging, LogTarget},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Dastime", version, long_about = None)]
#[command(about = "Time tracker logging tasks against DAS categories", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon keeping the running timer up to date")]
    Init {},
    #[command(
        about = "Run a daemon directly in current console. Used for debugging and for environments without the daemon binary"
    )]
    Serve {},
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Add a task")]
    Add {
        #[command(flatten)]
        command: AddCommand,
    },
    #[command(about = "Change a task. Time of a running task keeps counting from the new value")]
    Edit {
        #[command(flatten)]
        command: EditCommand,
    },
    #[command(about = "Delete a task")]
    Delete {
        #[arg(help = "Id of the task")]
        id: i64,
    },
    #[command(about = "Start or stop the timer of a task. Starting a task stops any other one")]
    Toggle {
        #[arg(help = "Id of the task")]
        id: i64,
    },
    #[command(about = "Show today's tasks with their totals")]
    List {
        #[command(flatten)]
        command: ListCommand,
    },
    #[command(about = "Show totals per DAS, overtime and top tasks for a period")]
    Stats {
        #[command(flatten)]
        command: StatsCommand,
    },
    #[command(about = "Export tasks as xlsx, csv, ics or json")]
    Export {
        #[command(flatten)]
        command: ExportCommand,
    },
    #[command(about = "Replace every task and the settings with a json backup")]
    Import {
        #[arg(help = "Backup previously produced by `export json`")]
        file: PathBuf,
    },
    #[command(about = "Show or change settings")]
    Settings {
        #[command(flatten)]
        command: SettingsCommand,
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
    enable_logging(LogTarget::Cli, &app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Init {} => restart_daemon(&app_dir),
        Commands::Stop {} => stop_daemon(),
        Commands::Serve {} => start_daemon(app_dir).await,
        Commands::Add { command } => {
            process_add_command(&mut open_tracker(&app_dir).await?, command).await
        }
        Commands::Edit { command } => {
            process_edit_command(&mut open_tracker(&app_dir).await?, command).await
        }
        Commands::Delete { id } => {
            process_delete_command(&mut open_tracker(&app_dir).await?, id).await
        }
        Commands::Toggle { id } => {
            process_toggle_command(&mut open_tracker(&app_dir).await?, id).await
        }
        Commands::List { command } => {
            process_list_command(&open_tracker(&app_dir).await?, command).await
        }
        Commands::Stats { command } => {
            process_stats_command(&open_tracker(&app_dir).await?, command).await
        }
        Commands::Export { command } => {
            process_export_command(&open_tracker(&app_dir).await?, command).await
        }
        Commands::Import { file } => {
            process_import_command(&mut open_tracker(&app_dir).await?, &file).await
        }
        Commands::Settings { command } => {
            process_settings_command(&mut open_tracker(&app_dir).await?, command).await
        }
    }
}

/// One-shot commands share the daemon's storage but never register as an instance.
async fn open_tracker(app_dir: &Path) -> Result<Tracker<FileBlobStorage>> {
    Tracker::load(
        PersistenceGateway::new(FileBlobStorage::in_application_dir(app_dir)?),
        Box::new(LogNotifier),
        Arc::new(DefaultClock),
    )
    .await
}
