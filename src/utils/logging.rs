use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

const MAX_LOG_FILES: usize = 5;

/// Process writing the logs. Both share the same directory and are told apart by file prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Cli,
    Daemon,
}

impl LogTarget {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogTarget::Cli => "cli",
            LogTarget::Daemon => "daemon",
        }
    }

    /// Used when neither an explicit level nor `RUST_LOG` is given. One-shot commands only keep
    /// what went wrong.
    fn default_level(&self) -> LevelFilter {
        match self {
            LogTarget::Cli => LevelFilter::WARN,
            LogTarget::Daemon => LevelFilter::INFO,
        }
    }
}

pub fn logs_dir(application_data_path: &Path) -> PathBuf {
    application_data_path.join("logs")
}

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "{}={level}",
        env!("CARGO_PKG_NAME").replace("-", "_")
    ))
}

/// Logs are rotated daily inside [logs_dir]. Standard output is only used when `show_std` is
/// set.
pub fn enable_logging(
    target: LogTarget,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(target.prefix())
        .build(logs_dir(application_data_path))?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    let level = match log_level {
        Some(level) => level.to_string(),
        None => std::env::var("RUST_LOG").unwrap_or_else(|_| target.default_level().to_string()),
    };

    tracing_subscriber::fmt()
        .with_env_filter(crate_filter(&level))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .pretty()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install subscriber {e}"))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{logs_dir, LogTarget};

    #[test]
    fn test_targets_share_directory() {
        assert_eq!(
            logs_dir(Path::new("/var/dastime")),
            Path::new("/var/dastime/logs")
        );
        assert_ne!(LogTarget::Cli.prefix(), LogTarget::Daemon.prefix());
    }
}
