//! Trailing-edge debouncer.
//!
//! Every [`Debouncer::trigger`] restarts the timer; the action runs once the
//! timer expires without a new trigger. A trigger that arrives while the
//! action is running schedules exactly one more run.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Debouncer {
    tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn the debounce loop. Must be called inside a tokio runtime.
    pub fn spawn<F, Fut>(delay: Duration, mut action: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                loop {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => break,
                        more = rx.recv() => {
                            if more.is_none() {
                                return;
                            }
                        }
                    }
                }
                action().await;
            }
        });

        Self { tx, handle }
    }

    /// Request a run. Triggers that arrive while one is already queued coalesce.
    pub fn trigger(&self) {
        // Full means a trigger is already pending; closed means cancelled.
        let _ = self.tx.try_send(());
    }

    /// Stop the loop. A pending run never fires.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
