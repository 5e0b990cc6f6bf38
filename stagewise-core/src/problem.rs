//! Deterministic problem snapshot.
//!
//! This module defines the fully specified linear program a core model is
//! built from:
//!
//! ```text
//! minimize    c^T x
//! subject to  row_lower <= A x <= row_upper
//!             col_lower <=  x  <= col_upper
//! ```
//!
//! A quadratic objective can be attached to the core model later.

use crate::error::{StageError, StageResult};
use crate::linalg::sparse::SparseMat;

/// Deterministic problem in row-bounded form.
///
/// # Dimensions
///
/// - `nrow`: number of constraints (rows of `matrix`)
/// - `ncol`: number of variables (columns of `matrix`)
/// - `col_lower`, `col_upper`, `objective`: `ncol`
/// - `row_lower`, `row_upper`: `nrow`
#[derive(Debug, Clone)]
pub struct DeterministicProblem {
    /// Constraint matrix (nrow × ncol), CSR or CSC, without duplicate entries.
    pub matrix: SparseMat,

    /// Column lower bounds
    pub col_lower: Vec<f64>,

    /// Column upper bounds
    pub col_upper: Vec<f64>,

    /// Linear objective coefficients
    pub objective: Vec<f64>,

    /// Row lower bounds
    pub row_lower: Vec<f64>,

    /// Row upper bounds
    pub row_upper: Vec<f64>,

    /// External indices of integer columns (binary columns may be listed here too).
    pub integer_cols: Vec<usize>,

    /// External indices of binary columns.
    pub binary_cols: Vec<usize>,
}

impl DeterministicProblem {
    /// Problem over `matrix` with the usual LP defaults: `x >= 0`, free rows,
    /// zero objective.
    pub fn with_defaults(matrix: SparseMat) -> Self {
        let nrow = matrix.rows();
        let ncol = matrix.cols();
        Self {
            matrix,
            col_lower: vec![0.0; ncol],
            col_upper: vec![f64::INFINITY; ncol],
            objective: vec![0.0; ncol],
            row_lower: vec![f64::NEG_INFINITY; nrow],
            row_upper: vec![f64::INFINITY; nrow],
            integer_cols: Vec::new(),
            binary_cols: Vec::new(),
        }
    }

    /// Number of rows (constraints)
    pub fn num_rows(&self) -> usize {
        self.matrix.rows()
    }

    /// Number of columns (variables)
    pub fn num_cols(&self) -> usize {
        self.matrix.cols()
    }

    /// Validate vector lengths and integrality indices against the matrix shape.
    pub fn validate(&self) -> StageResult<()> {
        let nrow = self.num_rows();
        let ncol = self.num_cols();

        let col_vectors = [
            ("col_lower", &self.col_lower),
            ("col_upper", &self.col_upper),
            ("objective", &self.objective),
        ];
        for (what, v) in col_vectors {
            if v.len() != ncol {
                return Err(StageError::DimensionMismatch {
                    what,
                    expected: ncol,
                    actual: v.len(),
                });
            }
        }

        let row_vectors = [("row_lower", &self.row_lower), ("row_upper", &self.row_upper)];
        for (what, v) in row_vectors {
            if v.len() != nrow {
                return Err(StageError::DimensionMismatch {
                    what,
                    expected: nrow,
                    actual: v.len(),
                });
            }
        }

        for (what, cols) in [("integer_cols", &self.integer_cols), ("binary_cols", &self.binary_cols)] {
            if let Some(&bad) = cols.iter().find(|&&c| c >= ncol) {
                return Err(StageError::IndexOutOfRange {
                    what,
                    index: bad,
                    len: ncol,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::sparse;

    fn small() -> DeterministicProblem {
        DeterministicProblem::with_defaults(sparse::from_triplets(
            2,
            3,
            vec![(0, 0, 1.0), (1, 2, 2.0)],
        ))
    }

    #[test]
    fn test_defaults_have_matching_lengths() {
        let prob = small();
        assert_eq!(prob.num_rows(), 2);
        assert_eq!(prob.num_cols(), 3);
        assert!(prob.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_vectors() {
        let mut prob = small();
        prob.row_upper.pop();
        assert_eq!(
            prob.validate(),
            Err(StageError::DimensionMismatch {
                what: "row_upper",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_validate_rejects_bad_integer_index() {
        let mut prob = small();
        prob.integer_cols = vec![0, 3];
        assert!(matches!(
            prob.validate(),
            Err(StageError::IndexOutOfRange { index: 3, .. })
        ));
    }
}
