//! Run generators as isolated tasks.
//!
//! Every task spawned by the [`Supervisor`] runs inside an error boundary: an
//! `Err` returned by the task is logged and the task ends, a panic is caught
//! by the runtime and logged when the task is reaped. Neither reaches the
//! caller of [`Supervisor::spawn`] and neither touches sibling tasks. Nothing
//! is restarted.
//!
//! ## Metrics
//!
//! `generators_running`: Tasks spawned and not yet reaped
//!

use std::{fmt, future::Future};

use metrics::gauge;
use rustc_hash::FxHashMap;
use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info};

#[derive(Debug, Default)]
/// A set of independently failing tasks.
pub struct Supervisor {
    tasks: JoinSet<()>,
    labels: FxHashMap<Id, String>,
}

impl Supervisor {
    /// Create a new, empty [`Supervisor`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the runtime under the name `label`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, E>(&mut self, label: impl Into<String>, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let label = label.into();
        let task_label = label.clone();
        let handle = self.tasks.spawn(async move {
            match task.await {
                Ok(()) => debug!("{task_label} shut down successfully"),
                Err(err) => error!("{task_label} failed with {err}"),
            }
        });
        info!("started {label}");
        self.labels.insert(handle.id(), label);
        gauge!("generators_running").set(self.tasks.len() as f64);
    }

    /// The number of tasks spawned and not yet reaped.
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for the next task to finish and log how it ended, returning its
    /// label. Returns `None` immediately if there are no tasks.
    pub async fn reap(&mut self) -> Option<String> {
        let res = self.tasks.join_next_with_id().await?;
        gauge!("generators_running").set(self.tasks.len() as f64);

        match res {
            Ok((id, ())) => self.labels.remove(&id),
            Err(err) => {
                let label = self.labels.remove(&err.id());
                let name = label.as_deref().unwrap_or("unknown task");
                if err.is_panic() {
                    error!("{name} panicked: {err}");
                } else {
                    debug!("{name} was cancelled");
                }
                label
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use tokio::time::{sleep, timeout};

    use super::Supervisor;

    #[tokio::test]
    async fn failure_is_contained() {
        let ticks = Arc::new(AtomicU64::new(0));
        let mut supervisor = Supervisor::new();

        let counted = Arc::clone(&ticks);
        supervisor.spawn("steady", async move {
            while counted.fetch_add(1, Ordering::Relaxed) < u64::MAX {
                sleep(Duration::from_millis(5)).await;
            }
            Ok::<(), String>(())
        });
        supervisor.spawn("doomed", async { Err::<(), _>("boom".to_string()) });

        let reaped = timeout(Duration::from_secs(1), supervisor.reap())
            .await
            .expect("failed task was not reaped");
        assert_eq!(reaped.as_deref(), Some("doomed"));
        assert_eq!(supervisor.running(), 1);

        let before = ticks.load(Ordering::Relaxed);
        sleep(Duration::from_millis(50)).await;
        assert!(ticks.load(Ordering::Relaxed) > before);
    }

    async fn explode() -> Result<(), String> {
        panic!("generator bug")
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let mut supervisor = Supervisor::new();
        supervisor.spawn("panicky", explode());

        let reaped = timeout(Duration::from_secs(1), supervisor.reap())
            .await
            .expect("panicked task was not reaped");
        assert_eq!(reaped.as_deref(), Some("panicky"));
        assert_eq!(supervisor.running(), 0);
    }

    #[tokio::test]
    async fn reap_on_empty_returns_none() {
        let mut supervisor = Supervisor::new();
        assert!(supervisor.reap().await.is_none());
    }
}
