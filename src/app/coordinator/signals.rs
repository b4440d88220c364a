//! Signal handling for graceful shutdown
//!
//! CTRL-C and SIGTERM cancel the run's `CancellationToken`. Transfers
//! waiting for a permit give up immediately; transfers in flight abort
//! their request, close their writer and report a cancelled failure.

use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancels a token when the process is asked to stop
#[derive(Debug, Clone)]
pub struct SignalHandler {
    cancel: CancellationToken,
}

impl SignalHandler {
    /// Create a new signal handler for the given token
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Start listening for CTRL-C and SIGTERM
    ///
    /// The returned task ends when a signal arrives or when the token is
    /// cancelled by someone else.
    pub fn setup(&self) -> JoinHandle<()> {
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut stream) => {
                        stream.recv().await;
                    }
                    Err(e) => {
                        warn!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl+C, cancelling outstanding transfers");
                },
                _ = terminate => {
                    info!("Received terminate signal, cancelling outstanding transfers");
                },
                _ = cancel.cancelled() => return,
            }

            cancel.cancel();
        })
    }
}
