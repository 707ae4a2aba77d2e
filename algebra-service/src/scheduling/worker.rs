// Fatigue-Weighted Worker
// Long-lived worker thread with a single-slot mailbox and busy/idle accounting

use crate::error::{EngineError, EngineResult};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A unit of work handed to a worker
pub type Task = Box<dyn FnOnce() -> EngineResult<()> + Send + 'static>;

/// Box a closure as a [`Task`]
pub fn task<F>(body: F) -> Task
where
    F: FnOnce() -> EngineResult<()> + Send + 'static,
{
    Box::new(body)
}

/// An error or panic raised inside a task body, contained at the worker
#[derive(Debug, Clone, PartialEq)]
pub struct TaskFailure {
    pub worker: usize,
    pub message: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {}: {}", self.worker, self.message)
    }
}

/// Receives completion notices from workers.
///
/// Called on the worker thread after the task's fatigue has been recorded,
/// so `fatigue` is the worker's up-to-date scheduling key.
pub trait TaskListener: Send + Sync {
    fn task_finished(&self, worker: usize, fatigue: f64, outcome: Result<(), TaskFailure>);
}

/// Lifecycle of a worker thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Running,
    ShuttingDown,
    Stopped,
}

/// Accumulated counters of one worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkerStats {
    /// Busy time in nanoseconds scaled by the worker's multiplier
    pub fatigue: f64,
    pub busy_time: Duration,
    pub idle_time: Duration,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
}

#[derive(Debug)]
struct WorkerInner {
    state: WorkerState,
    stats: WorkerStats,
}

/// A worker thread that runs one task at a time.
///
/// Its fatigue grows with busy time times a multiplier fixed at spawn, which
/// models workers that pay different costs for the same wall-clock work.
pub struct Worker {
    id: usize,
    multiplier: f64,
    inner: Arc<Mutex<WorkerInner>>,
    mailbox: Mutex<Option<Sender<Task>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Start a worker thread named `lae-worker-{id}`
    pub fn spawn(
        id: usize,
        multiplier: f64,
        listener: Option<Arc<dyn TaskListener>>,
    ) -> EngineResult<Self> {
        let (tx, rx) = crossbeam_channel::bounded::<Task>(1);
        let inner = Arc::new(Mutex::new(WorkerInner {
            state: WorkerState::Idle,
            stats: WorkerStats::default(),
        }));

        let thread_inner = Arc::clone(&inner);
        let handle = thread::Builder::new()
            .name(format!("lae-worker-{id}"))
            .spawn(move || run_loop(id, multiplier, rx, thread_inner, listener))
            .map_err(|e| EngineError::Spawn(e.to_string()))?;

        Ok(Self {
            id,
            multiplier,
            inner,
            mailbox: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn state(&self) -> WorkerState {
        self.inner.lock().state
    }

    pub fn stats(&self) -> WorkerStats {
        self.inner.lock().stats.clone()
    }

    pub fn fatigue(&self) -> f64 {
        self.inner.lock().stats.fatigue
    }

    pub fn busy_time(&self) -> Duration {
        self.inner.lock().stats.busy_time
    }

    pub fn idle_time(&self) -> Duration {
        self.inner.lock().stats.idle_time
    }

    /// Place a task in the mailbox
    pub fn assign(&self, task: Task) -> EngineResult<()> {
        let mailbox = self.mailbox.lock();
        let sender = mailbox
            .as_ref()
            .ok_or(EngineError::WorkerShutDown(self.id))?;

        sender.try_send(task).map_err(|err| match err {
            TrySendError::Full(_) => EngineError::WorkerBusy(self.id),
            TrySendError::Disconnected(_) => EngineError::WorkerShutDown(self.id),
        })
    }

    /// Stop accepting tasks; the thread exits once its mailbox is drained.
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            if inner.state != WorkerState::Stopped {
                inner.state = WorkerState::ShuttingDown;
            }
        }
        if self.mailbox.lock().take().is_some() {
            debug!(worker = self.id, "worker shutdown requested");
        }
    }

    /// Block until the thread has exited
    pub fn join(&self) {
        if let Some(handle) = self.handle.lock().take() {
            if handle.join().is_err() {
                warn!(worker = self.id, "worker thread panicked outside a task");
            }
        }
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("multiplier", &self.multiplier)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}

fn run_loop(
    id: usize,
    multiplier: f64,
    rx: Receiver<Task>,
    inner: Arc<Mutex<WorkerInner>>,
    listener: Option<Arc<dyn TaskListener>>,
) {
    debug!(worker = id, multiplier, "worker started");
    let mut idle_since = Instant::now();

    while let Ok(task) = rx.recv() {
        let started = Instant::now();
        {
            let mut inner = inner.lock();
            inner.stats.idle_time += started.duration_since(idle_since);
            if inner.state == WorkerState::Idle {
                inner.state = WorkerState::Running;
            }
        }

        let outcome = execute(id, task);
        let elapsed = started.elapsed();

        let fatigue = {
            let mut inner = inner.lock();
            inner.stats.busy_time += elapsed;
            inner.stats.fatigue += elapsed.as_nanos() as f64 * multiplier;
            inner.stats.tasks_completed += 1;
            if outcome.is_err() {
                inner.stats.tasks_failed += 1;
            }
            if inner.state == WorkerState::Running {
                inner.state = WorkerState::Idle;
            }
            inner.stats.fatigue
        };

        if let Err(failure) = &outcome {
            warn!(worker = id, error = %failure.message, "task failed");
        }

        idle_since = Instant::now();
        if let Some(listener) = &listener {
            listener.task_finished(id, fatigue, outcome);
        }
    }

    let mut inner = inner.lock();
    inner.stats.idle_time += idle_since.elapsed();
    inner.state = WorkerState::Stopped;
    debug!(worker = id, "worker stopped");
}

/// Run a task, turning returned errors and panics into a [`TaskFailure`]
fn execute(worker: usize, task: Task) -> Result<(), TaskFailure> {
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(TaskFailure {
            worker,
            message: err.to_string(),
        }),
        Err(payload) => Err(TaskFailure {
            worker,
            message: format!("task panicked: {}", panic_message(payload.as_ref())),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
