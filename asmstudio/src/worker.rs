//! Single background thread that runs submitted tasks one at a time, in submission
//! order, and sends a [`TaskReport`] back for each of them.
//!
//! A task that fails or panics only produces an error report; the thread keeps
//! serving the rest of the queue.

use crate::error::StudioError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub type TaskId = u64;

type BoxedTask<T> = Box<dyn FnOnce() -> Result<T, StudioError> + Send>;

struct Job<T> {
    id: TaskId,
    label: String,
    task: BoxedTask<T>,
}

#[derive(Debug)]
pub struct TaskReport<T> {
    pub id: TaskId,
    pub label: String,
    pub result: Result<T, StudioError>,
}

#[derive(Debug)]
pub struct Worker<T: Send + 'static> {
    /// Job sender; taken on drop to close the queue
    sender: Option<mpsc::Sender<Job<T>>>,
    reports: mpsc::Receiver<TaskReport<T>>,
    handle: Option<thread::JoinHandle<()>>,
    next_id: TaskId,
}

impl<T: Send + 'static> Worker<T> {
    /// Start the worker thread.
    ///
    /// # Errors
    /// Returns an error if the OS refuses to spawn the thread.
    pub fn spawn(name: &str) -> Result<Self, StudioError> {
        let (sender, jobs) = mpsc::channel::<Job<T>>();
        let (report_tx, reports) = mpsc::channel::<TaskReport<T>>();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || serve(&jobs, &report_tx))
            .map_err(|e| StudioError::io("Spawning background worker", &e))?;

        Ok(Self {
            sender: Some(sender),
            reports,
            handle: Some(handle),
            next_id: 0,
        })
    }

    /// Queue a task behind everything submitted before it.
    ///
    /// # Errors
    /// Returns [`StudioError::WorkerClosed`] if the worker thread is gone.
    pub fn submit<F>(&mut self, label: impl Into<String>, task: F) -> Result<TaskId, StudioError>
    where
        F: FnOnce() -> Result<T, StudioError> + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(StudioError::WorkerClosed)?;

        self.next_id += 1;
        let job = Job {
            id: self.next_id,
            label: label.into(),
            task: Box::new(task),
        };
        tracing::trace!(id = job.id, label = %job.label, "submitting task");
        sender.send(job).map_err(|_| StudioError::WorkerClosed)?;
        Ok(self.next_id)
    }

    /// Next finished report, without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<TaskReport<T>> {
        self.reports.try_recv().ok()
    }

    /// All reports finished so far, without blocking.
    #[must_use]
    pub fn drain(&self) -> Vec<TaskReport<T>> {
        self.reports.try_iter().collect()
    }

    /// Block until the next report arrives or `timeout` elapses (`Ok(None)`).
    ///
    /// # Errors
    /// Returns [`StudioError::WorkerClosed`] if no report can ever arrive.
    pub fn wait_next(&self, timeout: Duration) -> Result<Option<TaskReport<T>>, StudioError> {
        match self.reports.recv_timeout(timeout) {
            Ok(report) => Ok(Some(report)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(StudioError::WorkerClosed),
        }
    }
}

impl<T: Send + 'static> Drop for Worker<T> {
    fn drop(&mut self) {
        // Closing the queue lets the thread finish what is left and exit
        drop(self.sender.take());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::error!("background worker thread terminated abnormally");
        }
    }
}

fn serve<T>(jobs: &mpsc::Receiver<Job<T>>, reports: &mpsc::Sender<TaskReport<T>>) {
    for Job { id, label, task } in jobs {
        let _span = tracing::debug_span!("task", id, label = %label).entered();

        let result = match panic::catch_unwind(AssertUnwindSafe(task)) {
            Ok(result) => result,
            Err(payload) => Err(StudioError::TaskPanicked(panic_message(payload.as_ref()))),
        };

        match &result {
            Ok(_) => tracing::debug!("task finished"),
            Err(err) => tracing::warn!(%err, "task failed"),
        }

        if reports.send(TaskReport { id, label, result }).is_err() {
            // Nobody is listening anymore
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
