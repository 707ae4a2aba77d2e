// Worker Pool Executor
// Dispatches tasks to the least-fatigued idle worker and provides batch barriers

use crate::error::{EngineError, EngineResult};
use crate::scheduling::config::PoolConfig;
use crate::scheduling::report::{WorkerReport, WorkerSummary};
use crate::scheduling::worker::{Task, TaskFailure, TaskListener, Worker};

use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::{debug, info};

/// Idle-set entry; the heap pops the lowest fatigue first, then the lowest id
#[derive(Debug, Clone, Copy)]
struct IdleWorker {
    fatigue: f64,
    id: usize,
}

impl PartialEq for IdleWorker {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for IdleWorker {}

impl PartialOrd for IdleWorker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdleWorker {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fatigue
            .total_cmp(&self.fatigue)
            .then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Debug)]
struct PoolState {
    /// Exactly the workers not currently executing a task
    idle: BinaryHeap<IdleWorker>,
    /// Tasks accepted but not yet finished
    in_flight: usize,
    /// Failures recorded since the last barrier
    failures: Vec<TaskFailure>,
    accepting: bool,
}

#[derive(Debug)]
struct PoolShared {
    state: Mutex<PoolState>,
    worker_available: Condvar,
    drained: Condvar,
}

impl PoolShared {
    fn release_slot(&self, state: &mut PoolState) {
        state.in_flight -= 1;
        if state.in_flight == 0 {
            self.drained.notify_all();
        }
    }
}

impl TaskListener for PoolShared {
    fn task_finished(&self, worker: usize, fatigue: f64, outcome: Result<(), TaskFailure>) {
        let mut state = self.state.lock();
        state.idle.push(IdleWorker { fatigue, id: worker });
        if let Err(failure) = outcome {
            state.failures.push(failure);
        }
        self.worker_available.notify_one();
        self.release_slot(&mut state);
    }
}

/// Fixed-size pool of fatigue-weighted workers.
///
/// Each task goes to the idle worker with the lowest accumulated fatigue.
/// [`WorkerPool::submit_all`] is a barrier: it returns only after every task
/// of the batch has finished.
///
/// A task body that fails does not abort the rest of its batch. Failures are
/// collected and reported once the batch drains, as
/// [`EngineError::TaskFailed`].
pub struct WorkerPool {
    workers: Vec<Worker>,
    shared: Arc<PoolShared>,
}

impl WorkerPool {
    /// Spawn all workers and mark them idle
    pub fn new(config: &PoolConfig) -> EngineResult<Self> {
        config.validate()?;

        let shared = Arc::new(PoolShared {
            state: Mutex::new(PoolState {
                idle: BinaryHeap::with_capacity(config.workers),
                in_flight: 0,
                failures: Vec::new(),
                accepting: true,
            }),
            worker_available: Condvar::new(),
            drained: Condvar::new(),
        });
        let listener: Arc<dyn TaskListener> = shared.clone();

        let mut workers = Vec::with_capacity(config.workers);
        for (id, multiplier) in config.draw_multipliers().into_iter().enumerate() {
            workers.push(Worker::spawn(id, multiplier, Some(Arc::clone(&listener)))?);
        }

        {
            let mut state = shared.state.lock();
            for worker in &workers {
                state.idle.push(IdleWorker {
                    fatigue: worker.fatigue(),
                    id: worker.id(),
                });
            }
        }

        info!(workers = workers.len(), "worker pool started");
        Ok(Self { workers, shared })
    }

    /// Pool of `workers` threads with default fatigue settings
    pub fn with_workers(workers: usize) -> EngineResult<Self> {
        Self::new(&PoolConfig::default().with_workers(workers))
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Tasks accepted but not yet finished
    pub fn in_flight(&self) -> usize {
        self.shared.state.lock().in_flight
    }

    /// Workers currently waiting for a task
    pub fn idle_workers(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    /// Hand `task` to the least-fatigued idle worker, blocking while none is idle
    pub fn submit(&self, task: Task) -> EngineResult<()> {
        let worker = {
            let mut state = self.shared.state.lock();
            if !state.accepting {
                return Err(EngineError::PoolShutDown);
            }
            state.in_flight += 1;

            loop {
                if let Some(entry) = state.idle.pop() {
                    break entry.id;
                }
                if !state.accepting {
                    self.shared.release_slot(&mut state);
                    return Err(EngineError::PoolShutDown);
                }
                self.shared.worker_available.wait(&mut state);
            }
        };

        if let Err(err) = self.workers[worker].assign(task) {
            let mut state = self.shared.state.lock();
            self.shared.release_slot(&mut state);
            return Err(err);
        }
        Ok(())
    }

    /// Submit every task, then block until all of them have finished
    pub fn submit_all<I>(&self, tasks: I) -> EngineResult<()>
    where
        I: IntoIterator<Item = Task>,
    {
        let mut submitted = 0;
        let mut submit_error = None;
        for task in tasks {
            match self.submit(task) {
                Ok(()) => submitted += 1,
                Err(err) => {
                    submit_error = Some(err);
                    break;
                }
            }
        }

        let failures = self.wait_idle();
        if let Some(err) = submit_error {
            return Err(err);
        }
        if let Some(first) = failures.first() {
            return Err(EngineError::TaskFailed {
                failed: failures.len(),
                total: submitted.max(failures.len()),
                first: first.to_string(),
            });
        }

        debug!(tasks = submitted, "batch drained");
        Ok(())
    }

    /// Block until no task is in flight; returns the failures collected since
    /// the previous barrier
    pub fn wait_idle(&self) -> Vec<TaskFailure> {
        let mut state = self.shared.state.lock();
        while state.in_flight > 0 {
            self.shared.drained.wait(&mut state);
        }
        std::mem::take(&mut state.failures)
    }

    /// Stop every worker and wait for the threads to exit.
    ///
    /// Workers finish the task they are running first. Calling this again is a
    /// no-op.
    pub fn shutdown(&self) {
        let was_accepting = {
            let mut state = self.shared.state.lock();
            let was_accepting = state.accepting;
            state.accepting = false;
            self.shared.worker_available.notify_all();
            was_accepting
        };

        for worker in &self.workers {
            worker.shutdown();
        }
        for worker in &self.workers {
            worker.join();
        }
        self.shared.state.lock().idle.clear();

        if was_accepting {
            info!(workers = self.workers.len(), "worker pool shut down");
        }
    }

    /// Per-worker fatigue and timing with pool-wide fairness figures
    pub fn worker_report(&self) -> WorkerReport {
        WorkerReport::from_workers(self.workers.iter().map(WorkerSummary::from).collect())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
