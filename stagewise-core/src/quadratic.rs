//! Stage-wise split of a quadratic objective.
//!
//! The stage decomposition assumes a block-diagonal quadratic term: every
//! entry Q[i, j] must couple two columns of the same stage. Each stage gets
//! its own CSC block in stage-local numbering.

use sprs::TriMat;

use crate::core::partition::StagePartition;
use crate::error::{StageError, StageResult};
use crate::linalg::sparse::{SparseMat, SparseTriMat};

/// Split column-wise quadratic data (external numbering) into per-stage blocks.
///
/// `starts` has `ncol + 1` entries; column `j` owns
/// `indices[starts[j]..starts[j + 1]]` (row indices) and the matching
/// `values`. Returns `Ok(None)` when there are no terms, and `None` for any
/// stage whose block is empty.
pub fn split_by_stage(
    cols: &StagePartition,
    starts: &[usize],
    indices: &[usize],
    values: &[f64],
) -> StageResult<Option<Vec<Option<SparseMat>>>> {
    let ncol = cols.len();
    if starts.len() != ncol + 1 {
        return Err(StageError::DimensionMismatch {
            what: "quadratic starts",
            expected: ncol + 1,
            actual: starts.len(),
        });
    }
    if indices.len() != values.len() {
        return Err(StageError::DimensionMismatch {
            what: "quadratic values",
            expected: indices.len(),
            actual: values.len(),
        });
    }
    if starts.windows(2).any(|w| w[0] > w[1]) || starts[ncol] > indices.len() {
        return Err(StageError::InvalidProblem(
            "quadratic column starts are not monotone or exceed the entry count".to_string(),
        ));
    }

    let nels = starts[ncol] - starts[0];
    if nels == 0 {
        return Ok(None);
    }

    let nstages = cols.num_stages();
    let mut blocks: Vec<SparseTriMat> = (0..nstages)
        .map(|t| TriMat::new((cols.count(t), cols.count(t))))
        .collect();

    for j in 0..ncol {
        let stage = cols.stage_of(j);
        let local_col = cols.to_stage_local(j);
        for k in starts[j]..starts[j + 1] {
            let i = indices[k];
            let other_stage = cols.try_stage_of(i)?;
            if other_stage != stage {
                return Err(StageError::CrossStageQuadratic { stage, other_stage });
            }
            blocks[stage].add_triplet(cols.to_stage_local(i), local_col, values[k]);
        }
    }

    Ok(Some(
        blocks
            .into_iter()
            .map(|tri| if tri.nnz() == 0 { None } else { Some(tri.to_csc()) })
            .collect(),
    ))
}
