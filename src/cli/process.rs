use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::{Context, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

/// The daemon binary is installed next to the cli.
pub fn to_daemon_path(mut path: PathBuf) -> PathBuf {
    path.set_file_name("dastime-daemon");
    #[cfg(windows)]
    {
        path.set_extension("exe");
    }
    path
}

pub fn daemon_executable() -> Result<PathBuf> {
    Ok(to_daemon_path(
        env::current_exe().context("Can't operate without an executable")?,
    ))
}

/// Terminates every process started from `name`, except for the current one. Returns how many
/// were stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow::anyhow!("No current pid {e}"))?;
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            // This will forcefully terminate the process on Windows. The daemon then can't
            // record its close time.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
            killed += 1;
        }
    }
    Ok(killed)
}

/// Stops a running daemon and starts a new one for `app_dir`. The daemon binary detaches by
/// itself.
pub fn restart_daemon(app_dir: &Path) -> Result<()> {
    let daemon = daemon_executable()?;
    let killed = kill_previous_servers(&daemon)?;
    if killed > 0 {
        info!("Stopped {killed} previous daemon(s)");
    }

    let mut command = std::process::Command::new(&daemon);
    command.arg("--dir").arg(app_dir);
    command.stdin(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    info!("Spawning {}", daemon.display());
    let status = command
        .status()
        .with_context(|| format!("Failed to start {}", daemon.display()))?;
    if !status.success() {
        anyhow::bail!("Daemon exited with {status}");
    }
    println!("Daemon started");
    Ok(())
}

pub fn stop_daemon() -> Result<()> {
    let killed = kill_previous_servers(&daemon_executable()?)?;
    if killed == 0 {
        println!("No daemon running");
    } else {
        println!("Stopped daemon");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::to_daemon_path;

    #[test]
    fn test_daemon_path_is_sibling() {
        let path = to_daemon_path(PathBuf::from("/usr/local/bin/dastime"));
        #[cfg(not(windows))]
        assert_eq!(path, PathBuf::from("/usr/local/bin/dastime-daemon"));
        #[cfg(windows)]
        assert_eq!(path, PathBuf::from("/usr/local/bin/dastime-daemon.exe"));
    }
}
