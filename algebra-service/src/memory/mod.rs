// Shared Memory Module
// Concurrently mutable vectors and matrices with row/column orientation

pub mod matrix;
pub mod vector;

// Re-export key types
pub use matrix::{CellArray, MatrixStore};
pub use vector::{Orientation, VectorCell};

/// A rectangular matrix in row-major layout
pub type Grid = Vec<Vec<f64>>;
