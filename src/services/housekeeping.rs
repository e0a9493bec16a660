use std::path::Path;
use tracing::{info, warn};

/// Creates the screenshot directory and removes images a crashed run left
/// behind. Returns how many files were removed.
pub async fn prepare_screenshot_dir(dir: &Path) -> anyhow::Result<usize> {
    tokio::fs::create_dir_all(dir).await?;

    let mut removed = 0usize;
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_png = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if !is_png || !entry.file_type().await?.is_file() {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove stale screenshot"),
        }
    }
    if removed > 0 {
        info!(removed, dir = %dir.display(), "swept stale screenshots");
    }
    Ok(removed)
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}
