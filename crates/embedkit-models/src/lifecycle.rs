use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use embedkit_core::{ClientStatus, EmbedError};
use tokio::sync::Mutex;

const UNINITIALIZED: u8 = 0;
const INITIALIZING: u8 = 1;
const READY: u8 = 2;

/// `Uninitialized → Initializing → Ready` for a lazily built session `T`.
///
/// Initialization is serialized: concurrent callers wait for the first one
/// and then share its session. A failed initialization leaves the lifecycle
/// `Uninitialized` so the next call tries again.
pub struct Lifecycle<T> {
    session: Mutex<Option<Arc<T>>>,
    status: AtomicU8,
}

impl<T> Lifecycle<T> {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            status: AtomicU8::new(UNINITIALIZED),
        }
    }

    pub fn status(&self) -> ClientStatus {
        match self.status.load(Ordering::Acquire) {
            INITIALIZING => ClientStatus::Initializing,
            READY => ClientStatus::Ready,
            _ => ClientStatus::Uninitialized,
        }
    }

    /// The ready session, building it with `init` if there is none yet.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<Arc<T>, EmbedError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, EmbedError>>,
    {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(Arc::clone(session));
        }

        self.status.store(INITIALIZING, Ordering::Release);
        match init().await {
            Ok(session) => {
                let session = Arc::new(session);
                *guard = Some(Arc::clone(&session));
                self.status.store(READY, Ordering::Release);
                Ok(session)
            }
            Err(e) => {
                self.status.store(UNINITIALIZED, Ordering::Release);
                Err(e)
            }
        }
    }

    /// Drop the session and go back to `Uninitialized`. Returns the old
    /// session, if any.
    pub async fn reset(&self) -> Option<Arc<T>> {
        let mut guard = self.session.lock().await;
        self.status.store(UNINITIALIZED, Ordering::Release);
        guard.take()
    }
}

impl<T> Default for Lifecycle<T> {
    fn default() -> Self {
        Self::new()
    }
}
