// Scheduling Module
// Fatigue-weighted workers, the least-fatigue worker pool and load reports

pub mod config;
pub mod executor;
pub mod report;
pub mod worker;

// Re-export key types
pub use config::PoolConfig;
pub use executor::WorkerPool;
pub use report::{WorkerReport, WorkerSummary};
pub use worker::{task, Task, TaskFailure, TaskListener, Worker, WorkerState, WorkerStats};
