//! Manages the lifecycle of all spawned background tasks.
use futures::future::join_all;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A centralized owner of the shutdown signal and of every spawned task.
///
/// Tasks subscribe to the signal with [`TaskManager::subscribe`] and are
/// expected to return promptly once it flips to `true`.
#[derive(Clone, Debug)]
pub struct TaskManager {
    handles: Arc<Mutex<Vec<(&'static str, JoinHandle<()>)>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl TaskManager {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            handles: Arc::new(Mutex::new(Vec::new())),
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Spawns a named task and keeps its handle.
    pub fn spawn<F>(&self, name: &'static str, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        debug!(task_name = name, "Spawning task");
        let handle = tokio::spawn(future);
        self.lock_handles().push((name, handle));
    }

    /// Returns a receiver for the shutdown signal.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Signals shutdown and waits for every task to complete.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);

        let handles = self.lock_handles().drain(..).collect::<Vec<_>>();
        info!(
            "TaskManager shutting down. Waiting for {} tasks to complete...",
            handles.len()
        );

        let (task_names, handles): (Vec<&'static str>, Vec<JoinHandle<()>>) =
            handles.into_iter().unzip();
        let results = join_all(handles).await;

        let mut panicked = 0;
        for (task_name, result) in task_names.into_iter().zip(results) {
            match result {
                Ok(()) => debug!(task_name, "Task shut down gracefully."),
                Err(e) => {
                    error!(task_name, error = %e, "Task panicked during shutdown.");
                    panicked += 1;
                }
            }
        }

        if panicked > 0 {
            error!("{} tasks panicked during shutdown.", panicked);
        } else {
            info!("All tasks shut down gracefully.");
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Vec<(&'static str, JoinHandle<()>)>> {
        // A poisoned lock only means a panic happened while pushing a handle.
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
