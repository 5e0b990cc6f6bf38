//! Merge policies for combining core stage data with node deltas.
//!
//! Every operation takes the core's data (dense or sparse) and a node's
//! sparse delta, and produces the node's effective data. `Overwrite` is the
//! policy used for scenario trees: a delta entry replaces the core value.
//! `Additive` treats delta entries as increments.

use std::fmt;
use std::str::FromStr;

use sprs::CsVec;

use crate::error::StageError;
use crate::linalg::sparse::{SparseSlice, SparseVec};

/// Merge policy applied when reconstructing a node's effective data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombineRule {
    /// Delta entries replace the corresponding core entries.
    #[default]
    Overwrite,

    /// Delta entries are added to the corresponding core entries.
    Additive,
}

impl CombineRule {
    /// Merge one core value with one delta value.
    #[inline]
    pub fn merge(self, core: f64, delta: f64) -> f64 {
        match self {
            CombineRule::Overwrite => delta,
            CombineRule::Additive => core + delta,
        }
    }

    /// Overlay a sparse delta onto a dense array in place.
    ///
    /// Delta indices are shifted by `offset` before indexing `dest`, so a
    /// delta in global internal numbering can be applied to a stage-local
    /// array by passing the stage start. Positions absent from the delta
    /// keep their value.
    pub fn process_dense(self, dest: &mut [f64], offset: usize, delta: SparseSlice<'_>) {
        for (i, v) in delta.iter() {
            let slot = &mut dest[i - offset];
            *slot = self.merge(*slot, v);
        }
    }

    /// Combine a dense core row with a sparse node row into a sparse row.
    ///
    /// The result holds every nonzero of the core row plus every entry of
    /// the node row, in ascending index order. Node indices must be sorted.
    pub fn process_dense_row(self, dense_core_row: &[f64], node_row: SparseSlice<'_>) -> SparseVec {
        let n = dense_core_row.len();
        let mut indices = Vec::with_capacity(node_row.len());
        let mut values = Vec::with_capacity(node_row.len());

        let mut k = 0;
        for (j, &c) in dense_core_row.iter().enumerate() {
            if k < node_row.len() && node_row.indices[k] == j {
                indices.push(j);
                values.push(self.merge(c, node_row.values[k]));
                k += 1;
            } else if c != 0.0 {
                indices.push(j);
                values.push(c);
            }
        }
        debug_assert_eq!(k, node_row.len(), "node row indices unsorted or out of range");

        CsVec::new(n, indices, values)
    }

    /// Combine two sparse rows with sorted indices into their sparse union.
    ///
    /// Indices present in both take the merged value; all others are copied
    /// through unchanged.
    pub fn process_sparse(self, dim: usize, core_row: SparseSlice<'_>, node_row: SparseSlice<'_>) -> SparseVec {
        let mut indices = Vec::with_capacity(core_row.len() + node_row.len());
        let mut values = Vec::with_capacity(core_row.len() + node_row.len());

        let (mut a, mut b) = (0, 0);
        while a < core_row.len() || b < node_row.len() {
            let ia = core_row.indices.get(a).copied().unwrap_or(usize::MAX);
            let ib = node_row.indices.get(b).copied().unwrap_or(usize::MAX);
            if ia < ib {
                indices.push(ia);
                values.push(core_row.values[a]);
                a += 1;
            } else if ib < ia {
                indices.push(ib);
                values.push(node_row.values[b]);
                b += 1;
            } else {
                indices.push(ia);
                values.push(self.merge(core_row.values[a], node_row.values[b]));
                a += 1;
                b += 1;
            }
        }

        CsVec::new(dim, indices, values)
    }
}

impl fmt::Display for CombineRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombineRule::Overwrite => write!(f, "overwrite"),
            CombineRule::Additive => write!(f, "additive"),
        }
    }
}

impl FromStr for CombineRule {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" | "replace" => Ok(CombineRule::Overwrite),
            "additive" | "add" => Ok(CombineRule::Additive),
            other => Err(StageError::InvalidProblem(format!(
                "unknown combine rule '{}'",
                other
            ))),
        }
    }
}
