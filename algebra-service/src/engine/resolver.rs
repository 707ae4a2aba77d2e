// Expression Resolver
// Bottom-up evaluation of operation trees as row-parallel batches on the worker pool

use crate::engine::events::{EventSender, ProgressSender, ResolutionEvent};
use crate::engine::tree::{combine_shapes, grid_shape, OperationNode, Operator};
use crate::error::{EngineError, EngineResult};
use crate::memory::{Grid, MatrixStore, VectorCell};
use crate::scheduling::{task, PoolConfig, Task, WorkerPool, WorkerReport};

use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Resolves operation trees on a worker pool.
///
/// Every operation loads its operands into stores scoped to that step,
/// submits one task per output row and reads the left store back once the
/// batch has drained. Shape and arity problems are reported before any task
/// runs.
pub struct LinearAlgebraEngine {
    pool: WorkerPool,
    event_tx: Option<ProgressSender>,
}

impl LinearAlgebraEngine {
    /// Create an engine with its own worker pool
    pub fn new(config: &PoolConfig) -> EngineResult<Self> {
        Ok(Self::with_pool(WorkerPool::new(config)?))
    }

    /// Create an engine with `workers` threads and default fatigue settings
    pub fn with_workers(workers: usize) -> EngineResult<Self> {
        Self::new(&PoolConfig::default().with_workers(workers))
    }

    pub fn with_pool(pool: WorkerPool) -> Self {
        Self {
            pool,
            event_tx: None,
        }
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Resolve `root` to a matrix node; the input tree is left untouched
    pub fn run(&self, root: &OperationNode) -> EngineResult<OperationNode> {
        self.evaluate(root).map(OperationNode::Matrix)
    }

    /// Resolve `root` to its row-major grid
    pub fn evaluate(&self, root: &OperationNode) -> EngineResult<Grid> {
        let started = Instant::now();
        self.event_tx
            .send_event(ResolutionEvent::resolution_started(root.operation_count()));

        // Whole-tree check so nothing reaches the pool for an invalid tree
        let result = root.shape().and_then(|_| self.resolve(root));

        if let Err(err) = &result {
            self.event_tx.send_event(ResolutionEvent::error(err.to_string()));
        }
        self.event_tx.send_event(ResolutionEvent::resolution_completed(
            result.is_ok(),
            started.elapsed(),
        ));
        result
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn worker_report(&self) -> WorkerReport {
        self.pool.worker_report()
    }

    /// Stop the worker pool; later resolutions fail with `PoolShutDown`
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    fn resolve(&self, node: &OperationNode) -> EngineResult<Grid> {
        let operator = match node {
            OperationNode::Matrix(grid) => {
                grid_shape(grid)?;
                return Ok(grid.clone());
            }
            OperationNode::Add(_) => Operator::Add,
            OperationNode::Multiply(_) => Operator::Multiply,
            OperationNode::Negate(_) => Operator::Negate,
            OperationNode::Transpose(_) => Operator::Transpose,
        };

        let children = node.children();
        operator.check_arity(children.len())?;

        let mut operands = Vec::with_capacity(children.len());
        for child in children {
            operands.push(self.resolve(child)?);
        }

        let mut operands = operands.into_iter();
        let Some(first) = operands.next() else {
            return Err(EngineError::MissingArgument(format!(
                "operand of '{}'",
                operator
            )));
        };

        if !operator.is_binary() {
            return self.apply_unary(operator, &first);
        }

        // (A op B op C) is evaluated as ((A op B) op C)
        let mut accumulated = first;
        for operand in operands {
            accumulated = self.apply_binary(operator, &accumulated, &operand)?;
        }
        Ok(accumulated)
    }

    fn apply_binary(&self, operator: Operator, left: &Grid, right: &Grid) -> EngineResult<Grid> {
        let shape = combine_shapes(operator, grid_shape(left)?, grid_shape(right)?)?;
        let started = Instant::now();
        self.event_tx
            .send_event(ResolutionEvent::node_started(operator, shape));
        debug!(%operator, rows = shape.0, columns = shape.1, "resolving binary operation");

        let target = MatrixStore::from_rows(left)?;
        let operand = Arc::new(MatrixStore::new());
        let tasks = match operator {
            Operator::Add => {
                operand.load_row_major(right)?;
                row_tasks(&target, |row, cell| {
                    let source = operand.get(row)?;
                    Ok(task(move || cell.add(&source)))
                })?
            }
            Operator::Multiply => {
                operand.load_column_major(right)?;
                row_tasks(&target, |_, cell| {
                    let columns = Arc::clone(&operand);
                    Ok(task(move || cell.vec_mat_mul(&columns)))
                })?
            }
            Operator::Negate | Operator::Transpose => {
                return Err(EngineError::invalid_argument(format!(
                    "operator '{}' is not binary",
                    operator
                )))
            }
        };

        self.run_batch(operator, tasks)?;
        self.finish(&target, operator, shape, started)
    }

    fn apply_unary(&self, operator: Operator, operand: &Grid) -> EngineResult<Grid> {
        let (rows, columns) = grid_shape(operand)?;
        let shape = match operator {
            Operator::Transpose => (columns, rows),
            _ => (rows, columns),
        };
        let started = Instant::now();
        self.event_tx
            .send_event(ResolutionEvent::node_started(operator, shape));
        debug!(%operator, rows = shape.0, columns = shape.1, "resolving unary operation");

        let target = MatrixStore::from_rows(operand)?;
        let tasks = match operator {
            Operator::Negate => row_tasks(&target, |_, cell| {
                Ok(task(move || {
                    cell.negate();
                    Ok(())
                }))
            })?,
            Operator::Transpose => row_tasks(&target, |_, cell| {
                Ok(task(move || {
                    cell.transpose();
                    Ok(())
                }))
            })?,
            Operator::Add | Operator::Multiply => {
                return Err(EngineError::invalid_argument(format!(
                    "operator '{}' is not unary",
                    operator
                )))
            }
        };

        self.run_batch(operator, tasks)?;
        self.finish(&target, operator, shape, started)
    }

    fn run_batch(&self, operator: Operator, tasks: Vec<Task>) -> EngineResult<()> {
        self.event_tx
            .send_event(ResolutionEvent::batch_submitted(operator, tasks.len()));
        debug!(%operator, tasks = tasks.len(), "submitting row batch");
        self.pool.submit_all(tasks)
    }

    fn finish(
        &self,
        target: &MatrixStore,
        operator: Operator,
        shape: (usize, usize),
        started: Instant,
    ) -> EngineResult<Grid> {
        let result = target.read_row_major()?;
        self.event_tx.send_event(ResolutionEvent::node_completed(
            operator,
            shape,
            started.elapsed(),
        ));
        Ok(result)
    }
}

/// One task per row of `target`, all built before anything is submitted
fn row_tasks<F>(target: &MatrixStore, build: F) -> EngineResult<Vec<Task>>
where
    F: Fn(usize, Arc<VectorCell>) -> EngineResult<Task>,
{
    (0..target.len())
        .map(|row| build(row, target.get(row)?))
        .collect()
}
