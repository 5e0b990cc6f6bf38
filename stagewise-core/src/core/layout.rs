//! Row and column stage partitions of one deterministic problem.

use super::partition::StagePartition;
use crate::error::{IndexKind, StageError, StageResult};

/// Stage layout shared by the core model and every node built against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLayout {
    nstages: usize,
    rows: StagePartition,
    cols: StagePartition,
}

impl StageLayout {
    /// Partition rows and columns by their stage labels.
    pub fn new(nstages: usize, col_stage: &[usize], row_stage: &[usize]) -> StageResult<Self> {
        let cols = StagePartition::new(IndexKind::Column, col_stage, nstages)?;
        let rows = StagePartition::new(IndexKind::Row, row_stage, nstages)?;
        Ok(Self { nstages, rows, cols })
    }

    /// Number of stages.
    pub fn num_stages(&self) -> usize {
        self.nstages
    }

    /// Row partition.
    pub fn rows(&self) -> &StagePartition {
        &self.rows
    }

    /// Column partition.
    pub fn cols(&self) -> &StagePartition {
        &self.cols
    }

    /// Fail with `NoSuchStage` unless `t < nstages`.
    pub fn check_stage(&self, t: usize) -> StageResult<()> {
        if t < self.nstages {
            Ok(())
        } else {
            Err(StageError::NoSuchStage {
                stage: t,
                nstages: self.nstages,
            })
        }
    }
}
