use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Process-wide handle slot: launched on first use, shared afterwards,
/// emptied once at shutdown.
///
/// The lock is only held while launching or taking; callers get an `Arc`
/// and drive their own pages without blocking each other.
pub struct SharedBrowser<B> {
    slot: Mutex<Option<Arc<B>>>,
    launches: AtomicUsize,
}

impl<B> Default for SharedBrowser<B> {
    fn default() -> Self {
        Self { slot: Mutex::new(None), launches: AtomicUsize::new(0) }
    }
}

impl<B> SharedBrowser<B> {
    pub fn new() -> Self { Self::default() }

    pub async fn get_or_launch<F, Fut, E>(&self, launch: F) -> Result<Arc<B>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B, E>>,
    {
        let mut guard = self.slot.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(Arc::clone(browser));
        }
        let browser = Arc::new(launch().await?);
        self.launches.fetch_add(1, Ordering::SeqCst);
        *guard = Some(Arc::clone(&browser));
        Ok(browser)
    }

    /// Removes the handle so the caller can close it. Later calls return `None`.
    pub async fn take(&self) -> Option<Arc<B>> {
        self.slot.lock().await.take()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}
