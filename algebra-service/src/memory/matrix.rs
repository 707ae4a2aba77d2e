// Shared Matrix Store
// Ordered vector cells holding a matrix as rows or as columns

use crate::error::{EngineError, EngineResult};
use crate::memory::vector::{Orientation, VectorCell};
use crate::memory::Grid;

use parking_lot::RwLock;
use std::sync::Arc;

/// Cell array shared between a store and its in-flight readers
pub type CellArray = Arc<[Arc<VectorCell>]>;

/// A matrix held as an ordered sequence of [`VectorCell`]s.
///
/// The cell array sits behind one swappable pointer, so a reload replaces it
/// wholesale: readers observe the old array or the new one, never a mix.
/// Individual cell contents remain protected only by their own locks.
#[derive(Debug)]
pub struct MatrixStore {
    cells: RwLock<CellArray>,
}

impl MatrixStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(Arc::from(Vec::new())),
        }
    }

    /// Create a store holding `grid` as rows
    pub fn from_rows(grid: &[Vec<f64>]) -> EngineResult<Self> {
        let store = Self::new();
        store.load_row_major(grid)?;
        Ok(store)
    }

    /// Replace the contents with one ROW cell per input row
    pub fn load_row_major(&self, grid: &[Vec<f64>]) -> EngineResult<()> {
        rectangular_width(grid)?;
        let cells: Vec<Arc<VectorCell>> = grid
            .iter()
            .map(|row| Arc::new(VectorCell::row(row.clone())))
            .collect();

        *self.cells.write() = Arc::from(cells);
        Ok(())
    }

    /// Replace the contents with one COLUMN cell per input column
    pub fn load_column_major(&self, grid: &[Vec<f64>]) -> EngineResult<()> {
        let width = rectangular_width(grid)?;
        let cells: Vec<Arc<VectorCell>> = (0..width)
            .map(|column| {
                let values = grid.iter().map(|row| row[column]).collect();
                Arc::new(VectorCell::column(values))
            })
            .collect();

        *self.cells.write() = Arc::from(cells);
        Ok(())
    }

    /// Cell at `index`
    pub fn get(&self, index: usize) -> EngineResult<Arc<VectorCell>> {
        let cells = self.snapshot();
        cells.get(index).cloned().ok_or(EngineError::Index {
            index,
            len: cells.len(),
        })
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.cells.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Orientation shared by the cells
    pub fn orientation(&self) -> EngineResult<Orientation> {
        let cells = self.snapshot();
        cells
            .first()
            .map(|cell| cell.orientation())
            .ok_or(EngineError::EmptyStore)
    }

    /// Logical row count of the stored matrix
    pub fn rows(&self) -> EngineResult<usize> {
        let cells = self.snapshot();
        let first = cells.first().ok_or(EngineError::EmptyStore)?;
        Ok(match first.orientation() {
            Orientation::Row => cells.len(),
            Orientation::Column => first.len(),
        })
    }

    /// Logical column count of the stored matrix
    pub fn columns(&self) -> EngineResult<usize> {
        let cells = self.snapshot();
        let first = cells.first().ok_or(EngineError::EmptyStore)?;
        Ok(match first.orientation() {
            Orientation::Row => first.len(),
            Orientation::Column => cells.len(),
        })
    }

    /// Snapshot read of the whole matrix in row-major layout.
    ///
    /// Read locks on every cell are taken in index order before any cell is
    /// read and released in the same order, so no writer can complete a
    /// partial update while the grid is assembled. Column-oriented stores
    /// come back as the logical transpose of their cells.
    pub fn read_row_major(&self) -> EngineResult<Grid> {
        let cells = self.snapshot();
        if cells.is_empty() {
            return Ok(Vec::new());
        }

        let guards: Vec<_> = cells.iter().map(|cell| cell.read_state()).collect();

        let orientation = guards[0].orientation;
        let len = guards[0].data.len();
        for (index, state) in guards.iter().enumerate() {
            if state.orientation != orientation {
                return Err(EngineError::orientation(format!(
                    "cell {} is {} but cell 0 is {}",
                    index, state.orientation, orientation
                )));
            }
            if state.data.len() != len {
                return Err(EngineError::dimension(format!(
                    "cell {} has length {} but cell 0 has length {}",
                    index,
                    state.data.len(),
                    len
                )));
            }
        }

        let grid = match orientation {
            Orientation::Row => guards.iter().map(|state| state.data.clone()).collect(),
            Orientation::Column => (0..len)
                .map(|row| guards.iter().map(|state| state.data[row]).collect())
                .collect(),
        };

        // Vec drops its elements front to back: locks release in index order.
        drop(guards);
        Ok(grid)
    }

    /// Current cell array, independent of later reloads
    pub fn snapshot(&self) -> CellArray {
        Arc::clone(&self.cells.read())
    }
}

impl Default for MatrixStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Common row length of `grid`, or an error if the rows are ragged
fn rectangular_width(grid: &[Vec<f64>]) -> EngineResult<usize> {
    let width = grid.first().map(Vec::len).unwrap_or(0);
    if let Some((index, row)) = grid
        .iter()
        .enumerate()
        .find(|(_, row)| row.len() != width)
    {
        return Err(EngineError::dimension(format!(
            "row {} has {} elements, expected {}",
            index,
            row.len(),
            width
        )));
    }
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn sample() -> Grid {
        vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]
    }

    #[test]
    fn test_load_row_major() {
        let store = MatrixStore::from_rows(&sample()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.orientation().unwrap(), Orientation::Row);
        assert_eq!(store.rows().unwrap(), 2);
        assert_eq!(store.columns().unwrap(), 3);
        assert_eq!(store.get(1).unwrap().to_vec(), vec![4.0, 5.0, 6.0]);
        assert_eq!(store.read_row_major().unwrap(), sample());
    }

    #[test]
    fn test_load_column_major_reads_back_row_major() {
        let store = MatrixStore::new();
        store.load_column_major(&sample()).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.orientation().unwrap(), Orientation::Column);
        assert_eq!(store.get(0).unwrap().to_vec(), vec![1.0, 4.0]);
        assert_eq!(store.rows().unwrap(), 2);
        assert_eq!(store.columns().unwrap(), 3);
        assert_eq!(store.read_row_major().unwrap(), sample());
    }

    #[test]
    fn test_transposed_rows_read_as_transpose() {
        let store = MatrixStore::from_rows(&sample()).unwrap();
        for index in 0..store.len() {
            store.get(index).unwrap().transpose();
        }
        assert_eq!(
            store.read_row_major().unwrap(),
            vec![vec![1.0, 4.0], vec![2.0, 5.0], vec![3.0, 6.0]]
        );
    }

    #[test]
    fn test_empty_store() {
        let store = MatrixStore::new();
        assert!(store.is_empty());
        assert_eq!(store.orientation().unwrap_err(), EngineError::EmptyStore);
        assert_eq!(store.rows().unwrap_err(), EngineError::EmptyStore);
        assert_eq!(
            store.get(0).unwrap_err(),
            EngineError::Index { index: 0, len: 0 }
        );
        assert!(store.read_row_major().unwrap().is_empty());

        store.load_row_major(&[]).unwrap();
        assert_eq!(store.len(), 0);
        store.load_column_major(&[]).unwrap();
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_ragged_grid_rejected() {
        let store = MatrixStore::from_rows(&sample()).unwrap();
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            store.load_row_major(&ragged),
            Err(EngineError::Dimension(_))
        ));
        assert!(matches!(
            store.load_column_major(&ragged),
            Err(EngineError::Dimension(_))
        ));
        // A failed load leaves the previous contents in place.
        assert_eq!(store.read_row_major().unwrap(), sample());
    }

    #[test]
    fn test_reload_does_not_touch_outstanding_snapshot() {
        let store = MatrixStore::from_rows(&sample()).unwrap();
        let old = store.get(0).unwrap();
        store.load_row_major(&[vec![9.0]]).unwrap();

        assert_eq!(old.to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(store.read_row_major().unwrap(), vec![vec![9.0]]);
    }

    #[test]
    fn test_snapshot_never_mixes_loads() {
        let store = Arc::new(MatrixStore::new());
        let zeros = vec![vec![0.0; 16]; 16];
        let ones = vec![vec![1.0; 16]; 16];
        store.load_row_major(&zeros).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let writer = {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for i in 0..500 {
                    let grid = if i % 2 == 0 { &ones } else { &zeros };
                    store.load_row_major(grid).unwrap();
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        while !done.load(Ordering::SeqCst) {
            let grid = store.read_row_major().unwrap();
            let first = grid[0][0];
            assert!(grid.iter().flatten().all(|&value| value == first));
        }
        writer.join().unwrap();
    }
}
