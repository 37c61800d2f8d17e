#[cfg(not(target_os = "windows"))]
use tokio::signal::unix::{SignalKind, signal};

/// Fires `sender` on SIGTERM or Ctrl-C so the server can drain connections.
#[cfg(not(target_os = "windows"))]
pub fn create_term_signal_handler(sender: tokio::sync::oneshot::Sender<()>) {
    tokio::spawn(async move {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                tracing::info!("register terminate signal handler");

                tokio::select! {
                    _ = stream.recv() => tracing::info!("got terminate signal"),
                    _ = tokio::signal::ctrl_c() => tracing::info!("got interrupt signal"),
                }
            }
            Err(e) => {
                tracing::error!("signal error: {e}");

                if tokio::signal::ctrl_c().await.is_err() {
                    // keep the sender alive, dropping it would stop the server
                    std::future::pending::<()>().await;
                }
            }
        }

        let _: Result<(), _> = sender.send(());
    });
}

#[cfg(target_os = "windows")]
pub fn create_term_signal_handler(sender: tokio::sync::oneshot::Sender<()>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("got interrupt signal");
            let _: Result<(), _> = sender.send(());
        }
    });
}
