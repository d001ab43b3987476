use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::Duration;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// A resettable one-shot timer. Scheduling replaces any timer that has not
/// fired yet; once a timer fires its task runs to completion and can no longer
/// be cancelled.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Option<Pending>>>,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let pending = self.pending.clone();
        let delay = self.delay;

        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = pending.lock().unwrap_or_else(PoisonError::into_inner);
                match slot.as_ref() {
                    Some(current) if current.generation == generation => {
                        slot.take();
                    }
                    _ => return,
                }
            }
            task.await;
        });
        *slot = Some(Pending { generation, handle });
    }

    /// Drops the timer if it has not fired. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot();
        match slot.take() {
            Some(previous) => {
                previous.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    /// Recovers a poisoned slot; it only ever holds a timer handle.
    fn slot(&self) -> MutexGuard<'_, Option<Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
