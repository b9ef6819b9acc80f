//! Counting barrier for background work.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::task::TaskTracker;

/// Tracks every background task a run launches so the run can wait for all of them.
///
/// `launched` is bumped before the task is spawned and `completed` when it returns or
/// unwinds, so after [`TaskSet::join`] the two counters are equal.
#[derive(Clone, Default)]
pub struct TaskSet {
    tracker: TaskTracker,
    launched: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

struct Completion {
    name: String,
    completed: Arc<AtomicUsize>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(task = %self.name, "task finished");
    }
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, name: impl Into<String>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        self.launched.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(task = %name, "task launched");

        let guard = Completion {
            name,
            completed: self.completed.clone(),
        };
        self.tracker.spawn(async move {
            let _guard = guard;
            task.await;
        });
    }

    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Tasks launched and not yet returned.
    pub fn active(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting new tasks and wait for every launched one to return.
    pub async fn join(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl std::fmt::Debug for TaskSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSet")
            .field("launched", &self.launched())
            .field("completed", &self.completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn join_waits_for_every_task() {
        let tasks = TaskSet::new();
        for i in 0..4u64 {
            tasks.spawn(format!("sleeper-{i}"), async move {
                tokio::time::sleep(Duration::from_millis(10 * i)).await;
            });
        }
        assert_eq!(tasks.launched(), 4);

        tasks.join().await;
        assert_eq!(tasks.completed(), 4);
        assert_eq!(tasks.active(), 0);
    }

    #[tokio::test]
    async fn panicking_task_still_counts_as_completed() {
        let tasks = TaskSet::new();
        tasks.spawn("boom", async {
            panic!("task failure");
        });
        tasks.join().await;
        assert_eq!(tasks.launched(), tasks.completed());
    }
}
