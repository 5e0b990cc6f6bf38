//! Stable partition of an index space by stage label.
//!
//! Produces the external→internal permutation and its inverse as one owned
//! pair. Internal numbering is stage-contiguous and keeps first-seen order
//! inside each stage.

use crate::error::{IndexKind, StageError, StageResult};

/// Stage-grouped renumbering of one index space (rows or columns).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePartition {
    kind: IndexKind,
    /// Stage label per external index.
    stage_of: Vec<usize>,
    external_to_internal: Vec<usize>,
    internal_to_external: Vec<usize>,
    /// `starts[t]` is the first internal index of stage t; `starts[nstages] == len`.
    starts: Vec<usize>,
}

impl StagePartition {
    /// Partition `labels.len()` indices into `nstages` contiguous blocks.
    ///
    /// Fails with `StageOutOfRange` if any label is `>= nstages`.
    pub fn new(kind: IndexKind, labels: &[usize], nstages: usize) -> StageResult<Self> {
        if let Some((index, &stage)) = labels.iter().enumerate().find(|&(_, &s)| s >= nstages) {
            return Err(StageError::StageOutOfRange {
                kind,
                index,
                stage,
                nstages,
            });
        }

        let mut starts = vec![0usize; nstages + 1];
        for &s in labels {
            starts[s + 1] += 1;
        }
        for t in 0..nstages {
            starts[t + 1] += starts[t];
        }

        // Cursor per stage, advanced as indices are placed.
        let mut cursor = starts[..nstages].to_vec();
        let mut external_to_internal = vec![0usize; labels.len()];
        let mut internal_to_external = vec![0usize; labels.len()];
        for (ext, &s) in labels.iter().enumerate() {
            let int = cursor[s];
            cursor[s] += 1;
            external_to_internal[ext] = int;
            internal_to_external[int] = ext;
        }

        Ok(Self {
            kind,
            stage_of: labels.to_vec(),
            external_to_internal,
            internal_to_external,
            starts,
        })
    }

    /// Row or column space.
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// Total number of indices.
    pub fn len(&self) -> usize {
        self.stage_of.len()
    }

    /// True if the partition holds no indices.
    pub fn is_empty(&self) -> bool {
        self.stage_of.is_empty()
    }

    /// Number of stages.
    pub fn num_stages(&self) -> usize {
        self.starts.len() - 1
    }

    /// First internal index of stage `t` (`t == nstages` gives the sentinel).
    #[inline]
    pub fn start(&self, t: usize) -> usize {
        self.starts[t]
    }

    /// Number of indices in stage `t`.
    #[inline]
    pub fn count(&self, t: usize) -> usize {
        self.starts[t + 1] - self.starts[t]
    }

    /// Internal index range of stage `t`.
    #[inline]
    pub fn range(&self, t: usize) -> std::ops::Range<usize> {
        self.starts[t]..self.starts[t + 1]
    }

    /// All stage starts including the sentinel.
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    /// Stage label of an external index.
    #[inline]
    pub fn stage_of(&self, external: usize) -> usize {
        self.stage_of[external]
    }

    /// Internal index of an external index.
    #[inline]
    pub fn to_internal(&self, external: usize) -> usize {
        self.external_to_internal[external]
    }

    /// External index of an internal index.
    #[inline]
    pub fn to_external(&self, internal: usize) -> usize {
        self.internal_to_external[internal]
    }

    /// Position of an external index inside its stage block.
    #[inline]
    pub fn to_stage_local(&self, external: usize) -> usize {
        self.external_to_internal[external] - self.starts[self.stage_of[external]]
    }

    /// Bounds-checked stage label lookup.
    pub fn try_stage_of(&self, external: usize) -> StageResult<usize> {
        self.stage_of.get(external).copied().ok_or(StageError::IndexOutOfRange {
            what: self.what(),
            index: external,
            len: self.len(),
        })
    }

    /// Bounds-checked external→internal lookup.
    pub fn try_to_internal(&self, external: usize) -> StageResult<usize> {
        self.external_to_internal
            .get(external)
            .copied()
            .ok_or(StageError::IndexOutOfRange {
                what: self.what(),
                index: external,
                len: self.len(),
            })
    }

    /// Bounds-checked internal→external lookup.
    pub fn try_to_external(&self, internal: usize) -> StageResult<usize> {
        self.internal_to_external
            .get(internal)
            .copied()
            .ok_or(StageError::IndexOutOfRange {
                what: self.what(),
                index: internal,
                len: self.len(),
            })
    }

    fn what(&self) -> &'static str {
        match self.kind {
            IndexKind::Row => "row",
            IndexKind::Column => "column",
        }
    }
}
