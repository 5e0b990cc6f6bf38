//! Sparse per-node storage.
//!
//! A [`NodeDelta`] holds the data one node contributes for one stage: the
//! matrix rows of that stage and sparse bound/objective entries whose owning
//! row or column lives in that stage. A core node holds the core's own stage
//! data; a scenario node holds only differences from the core.
//!
//! All entries share one index/value buffer (see [`segment`]). Matrix-row
//! indices use the core's internal column numbering; bound and objective
//! indices are stage-local offsets.

pub mod segment;

use std::cell::OnceCell;

use log::debug;

use crate::core::layout::StageLayout;
use crate::core::CoreModel;
use crate::error::{StageError, StageResult};
use crate::linalg::sparse::{self, SparseMat, SparseSlice, SparseVec};
use segment::{Segment, SegmentOffsets};

/// Sparse node input in external numbering. Any part may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeData<'a> {
    /// Matrix (or matrix differences), `nrow × ncol`, any storage order.
    pub matrix: Option<&'a SparseMat>,
    /// Column lower bounds, dimension `ncol`.
    pub col_lower: Option<&'a SparseVec>,
    /// Column upper bounds, dimension `ncol`.
    pub col_upper: Option<&'a SparseVec>,
    /// Objective coefficients, dimension `ncol`.
    pub objective: Option<&'a SparseVec>,
    /// Row lower bounds, dimension `nrow`.
    pub row_lower: Option<&'a SparseVec>,
    /// Row upper bounds, dimension `nrow`.
    pub row_upper: Option<&'a SparseVec>,
}

impl<'a> NodeData<'a> {
    /// Node input with no data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the matrix (or matrix differences).
    pub fn with_matrix(mut self, matrix: &'a SparseMat) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Set column lower bounds.
    pub fn with_col_lower(mut self, v: &'a SparseVec) -> Self {
        self.col_lower = Some(v);
        self
    }

    /// Set column upper bounds.
    pub fn with_col_upper(mut self, v: &'a SparseVec) -> Self {
        self.col_upper = Some(v);
        self
    }

    /// Set objective coefficients.
    pub fn with_objective(mut self, v: &'a SparseVec) -> Self {
        self.objective = Some(v);
        self
    }

    /// Set row lower bounds.
    pub fn with_row_lower(mut self, v: &'a SparseVec) -> Self {
        self.row_lower = Some(v);
        self
    }

    /// Set row upper bounds.
    pub fn with_row_upper(mut self, v: &'a SparseVec) -> Self {
        self.row_upper = Some(v);
        self
    }

    fn get(&self, seg: Segment) -> Option<&'a SparseVec> {
        match seg {
            Segment::ColLower => self.col_lower,
            Segment::ColUpper => self.col_upper,
            Segment::Objective => self.objective,
            Segment::RowLower => self.row_lower,
            Segment::RowUpper => self.row_upper,
        }
    }

    /// Upper bound on the entries a node built from this input can hold.
    fn max_entries(&self) -> usize {
        let vectors: usize = Segment::ALL
            .iter()
            .filter_map(|&seg| self.get(seg))
            .map(|v| v.nnz())
            .sum();
        self.matrix.map_or(0, |m| m.nnz()) + vectors
    }
}

/// Sparse data of one node for one stage.
#[derive(Debug, Clone)]
pub struct NodeDelta {
    stage: usize,
    is_core_node: bool,
    has_matrix: bool,

    /// Stage block geometry in internal numbering.
    row_start: usize,
    nrow: usize,
    col_start: usize,
    ncol: usize,
    total_cols: usize,

    indices: Vec<usize>,
    values: Vec<f64>,
    offsets: SegmentOffsets,

    /// Dense copy of each stage row, filled on first request.
    dense_rows: Vec<OnceCell<Vec<f64>>>,

    /// Stage-local quadratic objective block (CSC), core nodes only.
    quadratic: Option<SparseMat>,
}

impl NodeDelta {
    /// Build a scenario node for `branch_stage` from differences to the core.
    ///
    /// Only entries whose row (matrix, row bounds) or column (column bounds,
    /// objective) belongs to `branch_stage` are kept; everything else in
    /// `delta` is ignored.
    pub fn scenario(branch_stage: usize, core: &CoreModel, delta: &NodeData<'_>) -> StageResult<Self> {
        Self::build(branch_stage, core.layout(), delta, false)
    }

    pub(crate) fn build(
        stage: usize,
        layout: &StageLayout,
        data: &NodeData<'_>,
        is_core_node: bool,
    ) -> StageResult<Self> {
        layout.check_stage(stage)?;
        let rows = layout.rows();
        let cols = layout.cols();

        if let Some(m) = data.matrix {
            check_len("matrix rows", rows.len(), m.rows())?;
            check_len("matrix cols", cols.len(), m.cols())?;
        }
        for seg in Segment::ALL {
            if let Some(v) = data.get(seg) {
                let expected = if seg.is_column() { cols.len() } else { rows.len() };
                check_len(segment_name(seg), expected, v.dim())?;
            }
        }

        let capacity = data.max_entries();
        let mut indices: Vec<usize> = Vec::with_capacity(capacity);
        let mut values: Vec<f64> = Vec::with_capacity(capacity);

        let nrow = rows.count(stage);
        let row_start = rows.start(stage);
        let mut offsets = SegmentOffsets::with_rows(nrow);

        // Matrix rows of this stage, columns renumbered and re-sorted.
        let csr = data.matrix.map(sparse::as_csr);
        for local in 0..nrow {
            let ext_row = rows.to_external(row_start + local);
            if let Some(row) = csr.as_deref().and_then(|m| m.outer_view(ext_row)) {
                let begin = indices.len();
                for (j, &v) in row.iter() {
                    indices.push(cols.to_internal(j));
                    values.push(v);
                }
                sparse::sort_by_index(&mut indices[begin..], &mut values[begin..]);
            }
            offsets.close(indices.len());
        }
        let has_matrix = data.matrix.is_some_and(|m| m.nnz() > 0);

        for seg in Segment::ALL {
            if let Some(v) = data.get(seg) {
                let part = if seg.is_column() { cols } else { rows };
                for (i, &x) in v.iter() {
                    if part.stage_of(i) == stage {
                        indices.push(part.to_stage_local(i));
                        values.push(x);
                    }
                }
            }
            offsets.close(indices.len());
        }
        debug_assert!(offsets.is_complete());

        indices.shrink_to_fit();
        values.shrink_to_fit();

        debug!(
            "node stage={} core={} rows={} entries={} (reserved {})",
            stage,
            is_core_node,
            nrow,
            indices.len(),
            capacity
        );

        Ok(Self {
            stage,
            is_core_node,
            has_matrix,
            row_start,
            nrow,
            col_start: cols.start(stage),
            ncol: cols.count(stage),
            total_cols: cols.len(),
            indices,
            values,
            offsets,
            dense_rows: (0..nrow).map(|_| OnceCell::new()).collect(),
            quadratic: None,
        })
    }

    /// Stage this node's data belongs to.
    pub fn stage(&self) -> usize {
        self.stage
    }

    /// True for the core's own per-stage node.
    pub fn is_core_node(&self) -> bool {
        self.is_core_node
    }

    /// True if the node was built with a non-empty matrix.
    pub fn has_matrix(&self) -> bool {
        self.has_matrix
    }

    /// Number of rows in the node's stage.
    pub fn num_rows(&self) -> usize {
        self.nrow
    }

    /// Number of columns in the node's stage.
    pub fn num_cols(&self) -> usize {
        self.ncol
    }

    /// First internal row of the node's stage.
    pub fn row_start(&self) -> usize {
        self.row_start
    }

    /// First internal column of the node's stage.
    pub fn col_start(&self) -> usize {
        self.col_start
    }

    /// Entries stored across all categories.
    pub fn num_entries(&self) -> usize {
        self.offsets.total()
    }

    /// Matrix entries stored across all rows.
    pub fn matrix_nnz(&self) -> usize {
        self.offsets.matrix().len()
    }

    /// Number of entries stored for internal row `row`.
    pub fn row_length(&self, row: usize) -> StageResult<usize> {
        let local = self.local_row(row)?;
        Ok(self.offsets.row(local).len())
    }

    /// Entries of internal row `row`, ascending by internal column.
    pub fn row(&self, row: usize) -> StageResult<SparseSlice<'_>> {
        let local = self.local_row(row)?;
        Ok(self.slice(self.offsets.row(local)))
    }

    /// Entries of one bound/objective category, stage-local indices.
    pub fn segment(&self, seg: Segment) -> SparseSlice<'_> {
        self.slice(self.offsets.segment(seg))
    }

    /// Column lower bound entries, stage-local indices.
    pub fn col_lower(&self) -> SparseSlice<'_> {
        self.segment(Segment::ColLower)
    }

    /// Column upper bound entries, stage-local indices.
    pub fn col_upper(&self) -> SparseSlice<'_> {
        self.segment(Segment::ColUpper)
    }

    /// Objective entries, stage-local indices.
    pub fn objective(&self) -> SparseSlice<'_> {
        self.segment(Segment::Objective)
    }

    /// Row lower bound entries, stage-local indices.
    pub fn row_lower(&self) -> SparseSlice<'_> {
        self.segment(Segment::RowLower)
    }

    /// Row upper bound entries, stage-local indices.
    pub fn row_upper(&self) -> SparseSlice<'_> {
        self.segment(Segment::RowUpper)
    }

    /// Dense copy of internal row `row` over all internal columns.
    ///
    /// Computed on the first call and cached for the node's lifetime; node
    /// content never changes after construction, so later calls return the
    /// same array.
    pub fn dense_row(&self, row: usize) -> StageResult<&[f64]> {
        let local = self.local_row(row)?;
        let dense = self.dense_rows[local].get_or_init(|| {
            let mut d = vec![0.0; self.total_cols];
            let r = self.slice(self.offsets.row(local));
            sparse::scatter(&mut d, r.indices, r.values, 0);
            d
        });
        Ok(dense)
    }

    /// Effective row lower bounds of the node's stage.
    pub fn copy_row_lower(&self, core: &CoreModel, dest: &mut [f64]) -> StageResult<()> {
        core.copy_row_lower(dest, self.stage)?;
        self.overlay(core, dest, Segment::RowLower)
    }

    /// Effective row upper bounds of the node's stage.
    pub fn copy_row_upper(&self, core: &CoreModel, dest: &mut [f64]) -> StageResult<()> {
        core.copy_row_upper(dest, self.stage)?;
        self.overlay(core, dest, Segment::RowUpper)
    }

    /// Effective column lower bounds of the node's stage.
    pub fn copy_col_lower(&self, core: &CoreModel, dest: &mut [f64]) -> StageResult<()> {
        core.copy_col_lower(dest, self.stage)?;
        self.overlay(core, dest, Segment::ColLower)
    }

    /// Effective column upper bounds of the node's stage.
    pub fn copy_col_upper(&self, core: &CoreModel, dest: &mut [f64]) -> StageResult<()> {
        core.copy_col_upper(dest, self.stage)?;
        self.overlay(core, dest, Segment::ColUpper)
    }

    /// Effective objective coefficients of the node's stage.
    pub fn copy_objective(&self, core: &CoreModel, dest: &mut [f64]) -> StageResult<()> {
        core.copy_objective(dest, self.stage)?;
        self.overlay(core, dest, Segment::Objective)
    }

    /// Effective matrix row: the core row merged with this node's row.
    pub fn combined_row(&self, core: &CoreModel, row: usize) -> StageResult<SparseVec> {
        let own = self.row(row)?;
        if self.is_core_node {
            return Ok(SparseVec::new(self.total_cols, own.indices.to_vec(), own.values.to_vec()));
        }
        self.check_core(core)?;
        let core_row = core.node(self.stage)?.row(row)?;
        Ok(core.combine_rule().process_sparse(self.total_cols, core_row, own))
    }

    /// Effective matrix row computed through the core node's dense row.
    ///
    /// Same result as [`combined_row`](Self::combined_row) for the default
    /// rule, except that explicit zeros stored in the core are dropped.
    pub fn combine_with_dense_core_row(&self, core: &CoreModel, row: usize) -> StageResult<SparseVec> {
        self.check_core(core)?;
        let dense = core.node(self.stage)?.dense_row(row)?;
        let own = if self.is_core_node {
            SparseSlice::empty()
        } else {
            self.row(row)?
        };
        Ok(core.combine_rule().process_dense_row(dense, own))
    }

    /// Stage-local quadratic objective block, if attached.
    pub fn quadratic(&self) -> Option<&SparseMat> {
        self.quadratic.as_ref()
    }

    /// True if a quadratic objective block is attached.
    pub fn has_quadratic(&self) -> bool {
        self.quadratic.is_some()
    }

    pub(crate) fn set_quadratic(&mut self, block: Option<SparseMat>) {
        self.quadratic = block;
    }

    fn overlay(&self, core: &CoreModel, dest: &mut [f64], seg: Segment) -> StageResult<()> {
        if self.is_core_node {
            return Ok(());
        }
        self.check_core(core)?;
        core.combine_rule().process_dense(dest, 0, self.segment(seg));
        Ok(())
    }

    /// Reject a core whose stage geometry differs from the one this node was built for.
    fn check_core(&self, core: &CoreModel) -> StageResult<()> {
        core.layout().check_stage(self.stage)?;
        check_len("core stage rows", self.nrow, core.num_rows_in_stage(self.stage))?;
        check_len("core stage cols", self.ncol, core.num_cols_in_stage(self.stage))?;
        check_len("core cols", self.total_cols, core.num_cols())
    }

    fn local_row(&self, row: usize) -> StageResult<usize> {
        if row >= self.row_start && row < self.row_start + self.nrow {
            Ok(row - self.row_start)
        } else {
            Err(StageError::IndexOutOfRange {
                what: "stage row",
                index: row,
                len: self.row_start + self.nrow,
            })
        }
    }

    fn slice(&self, range: std::ops::Range<usize>) -> SparseSlice<'_> {
        SparseSlice::new(&self.indices[range.clone()], &self.values[range])
    }
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> StageResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(StageError::DimensionMismatch {
            what,
            expected,
            actual,
        })
    }
}

fn segment_name(seg: Segment) -> &'static str {
    match seg {
        Segment::ColLower => "col_lower",
        Segment::ColUpper => "col_upper",
        Segment::Objective => "objective",
        Segment::RowLower => "row_lower",
        Segment::RowUpper => "row_upper",
    }
}
