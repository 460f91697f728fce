use std::{
    collections::BTreeSet,
    fmt::Display,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use tokio::{sync::Notify, time::sleep};
use tracing::{debug, info, warn};

struct Inner {
    name: String,
    pending: Mutex<BTreeSet<String>>,
    notify: Notify,
    shutdown: AtomicBool,
    retry_delay: Duration,
}

/// Keyed work queue drained by a single worker. A key waiting in the queue is
/// never queued twice.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

impl TaskQueue {
    pub fn new(name: &str, retry_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.to_owned(),
                pending: Mutex::new(BTreeSet::new()),
                notify: Notify::new(),
                shutdown: AtomicBool::new(false),
                retry_delay,
            }),
        }
    }

    fn pending(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.inner.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, key: &str) {
        if self.is_shut_down() {
            debug!("{} queue is shut down, dropping {key}", self.inner.name);
            return;
        }
        if self.pending().insert(key.to_owned()) {
            self.inner.notify.notify_one();
        }
    }

    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.load(Ordering::SeqCst)
    }

    pub fn shutdown(&self) {
        info!("Shutting down {} queue", self.inner.name);
        self.inner.shutdown.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
    }

    /// Drains the queue until shutdown. A key whose sync fails is queued again
    /// after the retry delay.
    pub async fn run<F, Fut, E>(&self, sync: F)
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: Display,
    {
        info!("{} queue...started", self.inner.name);
        while !self.is_shut_down() {
            let next = self.pending().pop_first();
            match next {
                Some(key) => {
                    debug!("{} queue syncing {key}", self.inner.name);
                    if let Err(e) = sync(key.clone()).await {
                        warn!("{} queue sync of {key} failed, retrying in {:?}: {e}", self.inner.name, self.inner.retry_delay);
                        self.requeue_later(key);
                    }
                },
                None => self.inner.notify.notified().await,
            }
        }
        info!("{} queue...stopped", self.inner.name);
    }

    fn requeue_later(&self, key: String) {
        let queue = self.clone();
        tokio::spawn(async move {
            sleep(queue.inner.retry_delay).await;
            queue.enqueue(&key);
        });
    }
}
