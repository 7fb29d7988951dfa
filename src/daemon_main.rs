// Keeps the daemon from opening a console window on windows.
#![windows_subsystem = "windows"]

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use dastime::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, LogTarget},
        runtime::single_thread_runtime,
    },
};

const PID_FILE_NAME: &str = "daemon.pid";

fn main() -> Result<()> {
    let args = DaemonArgs::parse();
    // Detaching changes the working directory, so relative paths have to be resolved first
    let app_dir = resolve_application_path(args.dir.clone())?.canonicalize()?;

    if !args.force && detach(&app_dir)? {
        return Ok(());
    }
    run(args, app_dir)
}

/// Returns `true` in the process that should exit.
#[cfg(unix)]
fn detach(app_dir: &Path) -> Result<bool> {
    use daemonize::{Daemonize, Outcome, Stdio};

    let outcome = Daemonize::new()
        .working_directory(app_dir)
        .pid_file(app_dir.join(PID_FILE_NAME))
        .stdout(Stdio::devnull())
        .stderr(Stdio::devnull())
        .execute();
    match outcome {
        Outcome::Parent(parent) => {
            parent.map_err(|e| anyhow::anyhow!("Failed to create daemon {e}"))?;
            println!("Created daemon");
            Ok(true)
        }
        Outcome::Child(child) => {
            child.map_err(|e| anyhow::anyhow!("Failed to initialize daemon {e}"))?;
            Ok(false)
        }
    }
}

#[cfg(all(windows, feature = "win"))]
fn detach(app_dir: &Path) -> Result<bool> {
    use std::os::windows::process::CommandExt;
    use windows::Win32::System::Threading::DETACHED_PROCESS;

    let mut command = std::process::Command::new(std::env::current_exe()?);
    command.arg("--force").arg("--dir").arg(app_dir);
    command.creation_flags(DETACHED_PROCESS.0);
    command.stdin(std::process::Stdio::null());
    command.stdout(std::process::Stdio::null());
    command.stderr(std::process::Stdio::null());
    #[allow(clippy::zombie_processes)]
    let child = command.spawn()?;
    std::fs::write(app_dir.join(PID_FILE_NAME), child.id().to_string())?;
    println!("Created daemon");
    Ok(true)
}

/// Without a way to detach the daemon simply runs in the foreground.
#[cfg(not(any(unix, all(windows, feature = "win"))))]
fn detach(_app_dir: &Path) -> Result<bool> {
    Ok(false)
}

fn run(args: DaemonArgs, app_dir: PathBuf) -> Result<()> {
    enable_logging(LogTarget::Daemon, &app_dir, args.log, args.log_console)?;
    single_thread_runtime()?.block_on(start_daemon(app_dir))
}
