use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Detects signals sent to the process. Both ctrl-c and, on unix, SIGTERM (sent by
/// `dastime stop`) end the session gracefully so the close time gets recorded.
///
/// On Windows detached processes can't detect signals sent to them, there the daemon is
/// terminated without recording its close time.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
                info!("Received shutdown signal");
                cancelation.cancel();
                return;
            }
            Err(e) => warn!("Can't listen for SIGTERM {e:?}"),
        }
    }

    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received ctrl-c");
            cancelation.cancel();
        },
    };
}
