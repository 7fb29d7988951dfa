use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

/// Arguments of the `dastime-daemon` binary. Normally it is started by `dastime init`.
#[derive(Parser, Debug)]
#[command(name = "dastime-daemon", version, about = "Keeps the running timer of dastime up to date")]
pub struct DaemonArgs {
    /// Stay attached to the current console instead of detaching.
    #[arg(long)]
    pub force: bool,
    /// Application directory shared with the cli.
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Also print logs to stdout. Only useful together with `--force`.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use tracing::level_filters::LevelFilter;

    use super::DaemonArgs;

    #[test]
    fn test_parse_daemon_args() {
        DaemonArgs::command().debug_assert();
        let args = DaemonArgs::parse_from([
            "dastime-daemon",
            "--force",
            "--dir",
            "/tmp/dastime",
            "--log-filter",
            "debug",
        ]);
        assert!(args.force);
        assert!(!args.log_console);
        assert_eq!(args.log, Some(LevelFilter::DEBUG));
    }
}
