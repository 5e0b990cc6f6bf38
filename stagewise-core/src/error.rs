//! Error types for stage decomposition and node construction.

use std::fmt;

use thiserror::Error;

/// Which index space an index or stage label refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Matrix rows (constraints).
    Row,
    /// Matrix columns (variables).
    Column,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Row => write!(f, "row"),
            IndexKind::Column => write!(f, "column"),
        }
    }
}

/// Errors raised while building or querying a core model or node delta.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    /// A stage label (or stage argument) lies outside `[0, nstages)`.
    #[error("{kind} {index} has stage {stage}, but the model has {nstages} stages")]
    StageOutOfRange {
        /// Row or column label.
        kind: IndexKind,
        /// External index carrying the label.
        index: usize,
        /// Offending stage.
        stage: usize,
        /// Number of stages in the model.
        nstages: usize,
    },

    /// A stage argument passed to an accessor is out of range.
    #[error("stage {stage} out of range (model has {nstages} stages)")]
    NoSuchStage {
        /// Offending stage.
        stage: usize,
        /// Number of stages in the model.
        nstages: usize,
    },

    /// An array or matrix has the wrong size.
    #[error("{what} has length {actual}, expected {expected}")]
    DimensionMismatch {
        /// Name of the offending input.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// An index points outside its container.
    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        /// Name of the indexed container.
        what: &'static str,
        /// Offending index.
        index: usize,
        /// Container length.
        len: usize,
    },

    /// A quadratic objective term couples columns of two different stages.
    #[error("quadratic data for stage {stage} includes data from stage {other_stage}")]
    CrossStageQuadratic {
        /// Stage of the column owning the term.
        stage: usize,
        /// Stage of the coupled column.
        other_stage: usize,
    },

    /// Quadratic data can only be attached once.
    #[error("quadratic objective already attached to the core model")]
    QuadraticAlreadyAttached,

    /// Any other validation failure.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),
}

/// Result type for stage operations.
pub type StageResult<T> = Result<T, StageError>;
