// Linear Algebra Engine Service Library
// Row-parallel evaluation of matrix expression trees on a fatigue-weighted worker pool

pub mod engine;
pub mod error;
pub mod io;
pub mod memory;
pub mod scheduling;

// Re-export commonly used types
pub use error::{EngineError, EngineResult};

// Re-export memory types
pub use memory::{Grid, MatrixStore, Orientation, VectorCell};

// Re-export scheduling types
pub use scheduling::{
    task, PoolConfig, Task, TaskFailure, Worker, WorkerPool, WorkerReport, WorkerState,
    WorkerSummary,
};

// Re-export engine types
pub use engine::{
    progress_channel, LinearAlgebraEngine, OperationNode, Operator, ProgressReceiver,
    ProgressSender, ResolutionEvent,
};

// Re-export document types
pub use io::{
    DocumentFormat, FileResultSink, FileTreeSource, JsonResultSink, ResultSink, TreeError,
    TreeParser, TreeSource,
};
