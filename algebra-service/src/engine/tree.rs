// Operation Tree
// Expression nodes over matrices and static shape inference

use crate::error::{EngineError, EngineResult};
use crate::memory::Grid;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operators an internal node may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "-")]
    Negate,
    #[serde(rename = "T")]
    Transpose,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Multiply => "*",
            Operator::Negate => "-",
            Operator::Transpose => "T",
        }
    }

    /// Binary operators accept two or more operands, folded left to right
    pub fn is_binary(self) -> bool {
        matches!(self, Operator::Add | Operator::Multiply)
    }

    /// Check an operand count against this operator's arity
    pub fn check_arity(self, operands: usize) -> EngineResult<()> {
        let valid = if self.is_binary() {
            operands >= 2
        } else {
            operands == 1
        };
        if valid {
            return Ok(());
        }
        let expected = if self.is_binary() {
            "at least 2"
        } else {
            "exactly 1"
        };
        Err(EngineError::invalid_argument(format!(
            "operator '{}' takes {} operand(s), got {}",
            self, expected, operands
        )))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(Operator::Add),
            "*" => Ok(Operator::Multiply),
            "-" => Ok(Operator::Negate),
            "T" | "t" => Ok(Operator::Transpose),
            other => Err(EngineError::invalid_argument(format!(
                "unknown operator '{}'",
                other
            ))),
        }
    }
}

/// A node of an expression tree: a matrix leaf or an operator over children
#[derive(Debug, Clone, PartialEq)]
pub enum OperationNode {
    Matrix(Grid),
    Add(Vec<OperationNode>),
    Multiply(Vec<OperationNode>),
    Negate(Vec<OperationNode>),
    Transpose(Vec<OperationNode>),
}

impl OperationNode {
    /// Build an internal node from an operator and its operands
    pub fn operation(operator: Operator, operands: Vec<OperationNode>) -> Self {
        match operator {
            Operator::Add => OperationNode::Add(operands),
            Operator::Multiply => OperationNode::Multiply(operands),
            Operator::Negate => OperationNode::Negate(operands),
            Operator::Transpose => OperationNode::Transpose(operands),
        }
    }

    pub fn matrix(grid: Grid) -> Self {
        OperationNode::Matrix(grid)
    }

    pub fn add(left: OperationNode, right: OperationNode) -> Self {
        OperationNode::Add(vec![left, right])
    }

    pub fn multiply(left: OperationNode, right: OperationNode) -> Self {
        OperationNode::Multiply(vec![left, right])
    }

    pub fn negate(operand: OperationNode) -> Self {
        OperationNode::Negate(vec![operand])
    }

    pub fn transpose(operand: OperationNode) -> Self {
        OperationNode::Transpose(vec![operand])
    }

    /// Operator of an internal node; `None` for a matrix leaf
    pub fn operator(&self) -> Option<Operator> {
        match self {
            OperationNode::Matrix(_) => None,
            OperationNode::Add(_) => Some(Operator::Add),
            OperationNode::Multiply(_) => Some(Operator::Multiply),
            OperationNode::Negate(_) => Some(Operator::Negate),
            OperationNode::Transpose(_) => Some(Operator::Transpose),
        }
    }

    pub fn children(&self) -> &[OperationNode] {
        match self {
            OperationNode::Matrix(_) => &[],
            OperationNode::Add(children)
            | OperationNode::Multiply(children)
            | OperationNode::Negate(children)
            | OperationNode::Transpose(children) => children,
        }
    }

    pub fn as_matrix(&self) -> Option<&Grid> {
        match self {
            OperationNode::Matrix(grid) => Some(grid),
            _ => None,
        }
    }

    /// Number of internal nodes, i.e. the operations a resolution performs
    /// before n-ary folding
    pub fn operation_count(&self) -> usize {
        match self {
            OperationNode::Matrix(_) => 0,
            _ => 1 + self.children().iter().map(Self::operation_count).sum::<usize>(),
        }
    }

    /// Result dimensions `(rows, columns)` of this tree.
    ///
    /// Checks everything a resolution would reject up front: arity, ragged or
    /// empty matrices, and the add/multiply dimension contracts.
    pub fn shape(&self) -> EngineResult<(usize, usize)> {
        let operator = match self {
            OperationNode::Matrix(grid) => return grid_shape(grid),
            OperationNode::Add(_) => Operator::Add,
            OperationNode::Multiply(_) => Operator::Multiply,
            OperationNode::Negate(_) => Operator::Negate,
            OperationNode::Transpose(_) => Operator::Transpose,
        };

        let children = self.children();
        operator.check_arity(children.len())?;

        let mut shape = children[0].shape()?;
        for child in &children[1..] {
            shape = combine_shapes(operator, shape, child.shape()?)?;
        }
        if operator == Operator::Transpose {
            shape = (shape.1, shape.0);
        }
        Ok(shape)
    }
}

/// Dimensions of a rectangular, non-empty grid
pub fn grid_shape(grid: &[Vec<f64>]) -> EngineResult<(usize, usize)> {
    let columns = grid.first().map(Vec::len).unwrap_or(0);
    if columns == 0 {
        return Err(EngineError::EmptyStore);
    }
    if let Some(row) = grid.iter().position(|row| row.len() != columns) {
        return Err(EngineError::dimension(format!(
            "matrix row {} has {} elements, expected {}",
            row,
            grid[row].len(),
            columns
        )));
    }
    Ok((grid.len(), columns))
}

/// Shape of `left <op> right` for a binary operator
pub fn combine_shapes(
    operator: Operator,
    left: (usize, usize),
    right: (usize, usize),
) -> EngineResult<(usize, usize)> {
    match operator {
        Operator::Add if left == right => Ok(left),
        Operator::Add => Err(EngineError::dimension(format!(
            "cannot add a {}x{} matrix to a {}x{} matrix",
            left.0, left.1, right.0, right.1
        ))),
        Operator::Multiply if left.1 == right.0 => Ok((left.0, right.1)),
        Operator::Multiply => Err(EngineError::dimension(format!(
            "cannot multiply a {}x{} matrix by a {}x{} matrix",
            left.0, left.1, right.0, right.1
        ))),
        Operator::Negate | Operator::Transpose => Err(EngineError::invalid_argument(format!(
            "operator '{}' is not binary",
            operator
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: usize, columns: usize) -> OperationNode {
        OperationNode::matrix(vec![vec![1.0; columns]; rows])
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("+".parse::<Operator>().unwrap(), Operator::Add);
        assert_eq!("*".parse::<Operator>().unwrap(), Operator::Multiply);
        assert_eq!("-".parse::<Operator>().unwrap(), Operator::Negate);
        assert_eq!(" T ".parse::<Operator>().unwrap(), Operator::Transpose);
        assert!(matches!(
            "/".parse::<Operator>(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(Operator::Multiply.to_string(), "*");
    }

    #[test]
    fn test_arity() {
        assert!(Operator::Add.check_arity(2).is_ok());
        assert!(Operator::Multiply.check_arity(5).is_ok());
        assert!(Operator::Add.check_arity(1).is_err());
        assert!(Operator::Negate.check_arity(1).is_ok());
        assert!(Operator::Transpose.check_arity(2).is_err());
        assert!(Operator::Negate.check_arity(0).is_err());
    }

    #[test]
    fn test_children_and_operator() {
        let tree = OperationNode::add(m(1, 1), OperationNode::negate(m(1, 1)));
        assert_eq!(tree.operator(), Some(Operator::Add));
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.children()[1].operator(), Some(Operator::Negate));
        assert_eq!(m(1, 1).operator(), None);
        assert!(m(1, 1).children().is_empty());
        assert_eq!(tree.operation_count(), 2);
    }

    #[test]
    fn test_shape_of_composite_tree() {
        // ((2x3 * 3x4) + 2x4)^T -> 4x2
        let tree = OperationNode::transpose(OperationNode::add(
            OperationNode::multiply(m(2, 3), m(3, 4)),
            m(2, 4),
        ));
        assert_eq!(tree.shape().unwrap(), (4, 2));
    }

    #[test]
    fn test_shape_folds_n_ary_multiply() {
        let chain = OperationNode::Multiply(vec![m(2, 3), m(3, 5), m(5, 1)]);
        assert_eq!(chain.shape().unwrap(), (2, 1));

        let broken = OperationNode::Multiply(vec![m(2, 3), m(3, 5), m(4, 1)]);
        assert!(matches!(broken.shape(), Err(EngineError::Dimension(_))));
    }

    #[test]
    fn test_shape_rejects_bad_input() {
        assert!(matches!(
            OperationNode::add(m(2, 2), m(2, 3)).shape(),
            Err(EngineError::Dimension(_))
        ));
        assert!(matches!(
            OperationNode::multiply(m(2, 3), m(2, 2)).shape(),
            Err(EngineError::Dimension(_))
        ));
        assert!(matches!(
            OperationNode::Add(vec![m(1, 1)]).shape(),
            Err(EngineError::InvalidArgument(_))
        ));
        assert_eq!(
            OperationNode::matrix(Vec::new()).shape().unwrap_err(),
            EngineError::EmptyStore
        );
        assert_eq!(
            OperationNode::matrix(vec![vec![]]).shape().unwrap_err(),
            EngineError::EmptyStore
        );
        assert!(matches!(
            OperationNode::matrix(vec![vec![1.0, 2.0], vec![3.0]]).shape(),
            Err(EngineError::Dimension(_))
        ));
    }
}
