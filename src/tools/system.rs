//! Process termination handling.

use std::sync::LazyLock;
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

static SHUTDOWN: LazyLock<CancellationToken> = LazyLock::new(CancellationToken::new);

/// Cancels [shutdown_token] on SIGINT, SIGTERM or SIGHUP.
///
/// Must be called from within a tokio runtime.
pub fn install_termination_listener() {
    tokio::spawn(async move {
        let mut sig_term = signal(SignalKind::terminate()).ok();
        let mut sig_int = signal(SignalKind::interrupt()).ok();
        let mut sig_hup = signal(SignalKind::hangup()).ok();

        let received = tokio::select! {
            Some(_) = async { sig_int.as_mut()?.recv().await } => "SIGINT",
            Some(_) = async { sig_term.as_mut()?.recv().await } => "SIGTERM",
            Some(_) = async { sig_hup.as_mut()?.recv().await } => "SIGHUP",
            else => {
                tracing::warn!("Cannot listen for termination signals");
                return;
            }
        };

        tracing::info!("Received {}. Shutting down...", received);
        SHUTDOWN.cancel();
    });
}

/// Cancelled once the process is asked to terminate.
pub fn shutdown_token() -> CancellationToken {
    SHUTDOWN.clone()
}

pub fn is_running() -> bool {
    !SHUTDOWN.is_cancelled()
}

pub async fn await_shutdown() {
    SHUTDOWN.cancelled().await
}
