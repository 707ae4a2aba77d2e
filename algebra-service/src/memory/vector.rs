// Shared Vector Cell
// Fixed-length numeric buffer with an orientation tag, guarded by one reader-writer lock

use crate::error::{EngineError, EngineResult};
use crate::memory::matrix::MatrixStore;

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a cell is read as a row-slice or a column-slice of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Row,
    Column,
}

impl Orientation {
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Row => Orientation::Column,
            Orientation::Column => Orientation::Row,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Row => write!(f, "row"),
            Orientation::Column => write!(f, "column"),
        }
    }
}

/// Lock-protected contents of a cell
#[derive(Debug, Clone)]
pub(crate) struct CellState {
    pub(crate) data: Vec<f64>,
    pub(crate) orientation: Orientation,
}

/// Smallest concurrently-mutable unit of the memory model.
///
/// Every read of the elements or the orientation holds the read lock, every
/// mutation holds the write lock. Two-operand operations lock `self` before
/// `other`. Callers must not run, concurrently, two operations that lock the
/// same pair of cells in reversed roles (`a.add(b)` racing `b.add(a)`): that
/// ordering is a caller obligation and is not enforced here.
#[derive(Debug)]
pub struct VectorCell {
    state: RwLock<CellState>,
}

impl VectorCell {
    pub fn new(data: Vec<f64>, orientation: Orientation) -> Self {
        Self {
            state: RwLock::new(CellState { data, orientation }),
        }
    }

    pub fn row(data: Vec<f64>) -> Self {
        Self::new(data, Orientation::Row)
    }

    pub fn column(data: Vec<f64>) -> Self {
        Self::new(data, Orientation::Column)
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> EngineResult<f64> {
        let state = self.state.read();
        state.data.get(index).copied().ok_or(EngineError::Index {
            index,
            len: state.data.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.state.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn orientation(&self) -> Orientation {
        self.state.read().orientation
    }

    /// Copy of the current elements
    pub fn to_vec(&self) -> Vec<f64> {
        self.state.read().data.clone()
    }

    /// Flip the orientation tag; element order is unchanged
    pub fn transpose(&self) {
        let mut state = self.state.write();
        state.orientation = state.orientation.flipped();
    }

    /// In-place elementwise sign flip
    pub fn negate(&self) {
        let mut state = self.state.write();
        for value in state.data.iter_mut() {
            *value = -*value;
        }
    }

    /// In-place elementwise sum `self += other`
    pub fn add(&self, other: &VectorCell) -> EngineResult<()> {
        if std::ptr::eq(self, other) {
            // Same lock on both sides: a write guard already covers the read.
            let mut state = self.state.write();
            for value in state.data.iter_mut() {
                *value += *value;
            }
            return Ok(());
        }

        let mut target = self.state.write();
        let source = other.state.read();

        if target.data.len() != source.data.len() {
            return Err(EngineError::dimension(format!(
                "cannot add vectors of length {} and {}",
                target.data.len(),
                source.data.len()
            )));
        }
        if target.orientation != source.orientation {
            return Err(EngineError::orientation(format!(
                "cannot add a {} vector to a {} vector",
                source.orientation, target.orientation
            )));
        }

        for (value, addend) in target.data.iter_mut().zip(source.data.iter()) {
            *value += addend;
        }
        Ok(())
    }

    /// Row-by-column contraction; exactly one operand must be a row
    pub fn dot(&self, other: &VectorCell) -> EngineResult<f64> {
        if std::ptr::eq(self, other) {
            let state = self.state.read();
            return Err(EngineError::orientation(format!(
                "dot product needs one row and one column, got two {} vectors",
                state.orientation
            )));
        }

        let left = self.state.read();
        let right = other.state.read();
        dot_locked(&left, &right)
    }

    /// Replace this row with `self × store`, where `store` holds the right
    /// operand's columns.
    ///
    /// The product is computed under read locks only; the new buffer is then
    /// swapped in with a single write-lock acquisition.
    pub fn vec_mat_mul(&self, store: &MatrixStore) -> EngineResult<()> {
        let (orientation, len) = {
            let state = self.state.read();
            (state.orientation, state.data.len())
        };
        if orientation != Orientation::Row {
            return Err(EngineError::orientation(
                "vector-matrix product requires a row vector",
            ));
        }

        let columns = store.snapshot();
        let first = columns.first().ok_or(EngineError::Index { index: 0, len: 0 })?;
        if first.len() != len {
            return Err(EngineError::dimension(format!(
                "row of length {} cannot multiply columns of length {}",
                len,
                first.len()
            )));
        }

        let mut product = Vec::with_capacity(columns.len());
        for column in columns.iter() {
            product.push(self.dot(column)?);
        }

        let mut state = self.state.write();
        state.data = product;
        Ok(())
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, CellState> {
        self.state.read()
    }
}

impl Clone for VectorCell {
    fn clone(&self) -> Self {
        let state = self.state.read();
        Self::new(state.data.clone(), state.orientation)
    }
}

fn dot_locked(left: &CellState, right: &CellState) -> EngineResult<f64> {
    if left.data.len() != right.data.len() {
        return Err(EngineError::dimension(format!(
            "cannot take dot product of vectors of length {} and {}",
            left.data.len(),
            right.data.len()
        )));
    }
    if left.orientation == right.orientation {
        return Err(EngineError::orientation(format!(
            "dot product needs one row and one column, got two {} vectors",
            left.orientation
        )));
    }

    Ok(left
        .data
        .iter()
        .zip(right.data.iter())
        .map(|(a, b)| a * b)
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_get_and_bounds() {
        let cell = VectorCell::row(vec![1.0, 2.0, 3.0]);
        assert_eq!(cell.get(1).unwrap(), 2.0);
        assert_eq!(cell.len(), 3);
        assert_eq!(
            cell.get(3).unwrap_err(),
            EngineError::Index { index: 3, len: 3 }
        );
    }

    #[test]
    fn test_transpose_flips_orientation_only() {
        let cell = VectorCell::row(vec![1.0, 2.0]);
        cell.transpose();
        assert_eq!(cell.orientation(), Orientation::Column);
        assert_eq!(cell.to_vec(), vec![1.0, 2.0]);
        cell.transpose();
        assert_eq!(cell.orientation(), Orientation::Row);
    }

    #[test]
    fn test_negate() {
        let cell = VectorCell::row(vec![1.0, -2.0, 0.0]);
        cell.negate();
        assert_eq!(cell.to_vec(), vec![-1.0, 2.0, -0.0]);
    }

    #[test]
    fn test_add_in_place() {
        let target = VectorCell::row(vec![1.0, 2.0]);
        let source = VectorCell::row(vec![10.0, 20.0]);
        target.add(&source).unwrap();
        assert_eq!(target.to_vec(), vec![11.0, 22.0]);
        assert_eq!(source.to_vec(), vec![10.0, 20.0]);
    }

    #[test]
    fn test_add_rejects_length_and_orientation_mismatch() {
        let target = VectorCell::row(vec![1.0, 2.0]);
        let short = VectorCell::row(vec![1.0]);
        let column = VectorCell::column(vec![1.0, 2.0]);

        assert!(matches!(
            target.add(&short),
            Err(EngineError::Dimension(_))
        ));
        assert!(matches!(
            target.add(&column),
            Err(EngineError::Orientation(_))
        ));
        assert_eq!(target.to_vec(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_add_to_itself_doubles() {
        let cell = VectorCell::row(vec![1.5, -3.0]);
        cell.add(&cell).unwrap();
        assert_eq!(cell.to_vec(), vec![3.0, -6.0]);
    }

    #[test]
    fn test_dot_row_by_column() {
        let row = VectorCell::row(vec![1.0, 2.0, 3.0]);
        let column = VectorCell::column(vec![4.0, 5.0, 6.0]);
        assert_eq!(row.dot(&column).unwrap(), 32.0);
        // Either operand may be the row.
        assert_eq!(column.dot(&row).unwrap(), 32.0);
    }

    #[test]
    fn test_dot_rejects_same_orientation() {
        let a = VectorCell::row(vec![1.0, 2.0]);
        let b = VectorCell::row(vec![3.0, 4.0]);
        assert!(matches!(a.dot(&b), Err(EngineError::Orientation(_))));

        let c = VectorCell::column(vec![1.0, 2.0]);
        let d = VectorCell::column(vec![3.0, 4.0]);
        assert!(matches!(c.dot(&d), Err(EngineError::Orientation(_))));
        assert!(matches!(a.dot(&a), Err(EngineError::Orientation(_))));
    }

    #[test]
    fn test_dot_rejects_length_mismatch() {
        let row = VectorCell::row(vec![1.0, 2.0]);
        let column = VectorCell::column(vec![1.0, 2.0, 3.0]);
        assert!(matches!(row.dot(&column), Err(EngineError::Dimension(_))));
    }

    #[test]
    fn test_vec_mat_mul() {
        // [1 2 3] x [[7 8] [9 1] [2 3]] = [31 19]
        let row = VectorCell::row(vec![1.0, 2.0, 3.0]);
        let store = MatrixStore::new();
        store
            .load_column_major(&[vec![7.0, 8.0], vec![9.0, 1.0], vec![2.0, 3.0]])
            .unwrap();

        row.vec_mat_mul(&store).unwrap();
        assert_eq!(row.to_vec(), vec![31.0, 19.0]);
        assert_eq!(row.orientation(), Orientation::Row);
    }

    #[test]
    fn test_vec_mat_mul_contract() {
        let store = MatrixStore::new();
        store.load_column_major(&[vec![1.0], vec![2.0]]).unwrap();

        let column = VectorCell::column(vec![1.0, 2.0]);
        assert!(matches!(
            column.vec_mat_mul(&store),
            Err(EngineError::Orientation(_))
        ));

        let long = VectorCell::row(vec![1.0, 2.0, 3.0]);
        assert!(matches!(
            long.vec_mat_mul(&store),
            Err(EngineError::Dimension(_))
        ));
        assert_eq!(long.to_vec(), vec![1.0, 2.0, 3.0]);

        let empty = MatrixStore::new();
        assert!(matches!(
            long.vec_mat_mul(&empty),
            Err(EngineError::Index { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_concurrent_accumulation_loses_no_updates() {
        let accumulator = Arc::new(VectorCell::row(vec![0.0]));
        let unit = Arc::new(VectorCell::row(vec![1.0]));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let accumulator = Arc::clone(&accumulator);
                let unit = Arc::clone(&unit);
                thread::spawn(move || {
                    for _ in 0..125 {
                        accumulator.add(&unit).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(accumulator.get(0).unwrap(), 1000.0);
    }
}
