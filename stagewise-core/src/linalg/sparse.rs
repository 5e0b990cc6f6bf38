//! Sparse matrix and vector types and helpers.
//!
//! Stage decomposition works row-major: every node stores matrix rows, so
//! the helpers here build and normalise CSR matrices and sorted sparse
//! vectors on top of `sprs`.

use std::borrow::Cow;

use sprs::{CsMat, CsVec, TriMat};

/// Sparse matrix (CSR or CSC; converted to CSR where rows are needed).
pub type SparseMat = CsMat<f64>;

/// Sparse vector with sorted, unique indices.
pub type SparseVec = CsVec<f64>;

/// Triplet format sparse matrix builder.
pub type SparseTriMat = TriMat<f64>;

/// Borrowed sparse entries: parallel index and value slices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseSlice<'a> {
    /// Indices, ascending where the producer guarantees it.
    pub indices: &'a [usize],
    /// Values matching `indices`.
    pub values: &'a [f64],
}

impl<'a> SparseSlice<'a> {
    /// Pair index and value slices of equal length.
    pub fn new(indices: &'a [usize], values: &'a [f64]) -> Self {
        debug_assert_eq!(indices.len(), values.len());
        Self { indices, values }
    }

    /// No entries.
    pub fn empty() -> Self {
        Self {
            indices: &[],
            values: &[],
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate (index, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

impl<'a> From<&'a SparseVec> for SparseSlice<'a> {
    fn from(v: &'a SparseVec) -> Self {
        Self::new(v.indices(), v.data())
    }
}

/// Build a sparse CSR matrix from triplets (row, col, value).
///
/// Duplicate (row, col) entries are summed.
pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> SparseMat
where
    I: IntoIterator<Item = (usize, usize, f64)>,
{
    let mut tri = TriMat::new((nrows, ncols));
    for (i, j, v) in triplets {
        tri.add_triplet(i, j, v);
    }
    tri.to_csr()
}

/// Build a sparse vector from (index, value) pairs in any order.
///
/// When an index appears more than once the last value wins.
pub fn sparse_vec<I>(dim: usize, entries: I) -> SparseVec
where
    I: IntoIterator<Item = (usize, f64)>,
{
    let mut pairs: Vec<(usize, f64)> = entries.into_iter().collect();
    pairs.sort_by_key(|&(i, _)| i);

    let mut indices: Vec<usize> = Vec::with_capacity(pairs.len());
    let mut values: Vec<f64> = Vec::with_capacity(pairs.len());
    for (i, v) in pairs {
        if indices.last() == Some(&i) {
            if let Some(last) = values.last_mut() {
                *last = v;
            }
        } else {
            indices.push(i);
            values.push(v);
        }
    }
    CsVec::new(dim, indices, values)
}

/// Convert a dense vector to sparse form, dropping positive zeros.
///
/// `-0.0` is stored, so scattering the result into a zeroed buffer gives
/// back the input bit for bit.
pub fn sparsify(dense: &[f64]) -> SparseVec {
    let mut indices = Vec::new();
    let mut values = Vec::new();
    for (i, &v) in dense.iter().enumerate() {
        if v.to_bits() != 0 {
            indices.push(i);
            values.push(v);
        }
    }
    CsVec::new(dense.len(), indices, values)
}

/// Row-major view of a matrix, converting only when it is stored by column.
pub fn as_csr(mat: &SparseMat) -> Cow<'_, SparseMat> {
    if mat.is_csr() {
        Cow::Borrowed(mat)
    } else {
        Cow::Owned(mat.to_csr())
    }
}

/// Scatter sparse entries into a dense slice: `dense[idx - offset] = val`.
pub fn scatter(dense: &mut [f64], indices: &[usize], values: &[f64], offset: usize) {
    debug_assert_eq!(indices.len(), values.len());
    for (&i, &v) in indices.iter().zip(values) {
        dense[i - offset] = v;
    }
}

/// Sort parallel index/value slices by increasing index.
pub fn sort_by_index(indices: &mut [usize], values: &mut [f64]) {
    debug_assert_eq!(indices.len(), values.len());
    if indices.windows(2).all(|w| w[0] <= w[1]) {
        return;
    }
    let mut pairs: Vec<(usize, f64)> = indices.iter().copied().zip(values.iter().copied()).collect();
    pairs.sort_unstable_by_key(|&(i, _)| i);
    for (k, (i, v)) in pairs.into_iter().enumerate() {
        indices[k] = i;
        values[k] = v;
    }
}
