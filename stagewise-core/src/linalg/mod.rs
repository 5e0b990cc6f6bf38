//! Linear algebra layer.
//!
//! Sparse matrix/vector aliases and the row-major helpers used by stage
//! decomposition.

pub mod sparse;
