//! Core model: stage partition, index remapping and dense stage data.
//!
//! The core model is built once from a deterministic problem and a stage
//! label per row and column. It renumbers rows and columns so that every
//! stage occupies a contiguous internal block, stores one core
//! [`NodeDelta`] per stage, and keeps dense bound/objective arrays per stage
//! for fast combination with scenario deltas.

pub mod layout;
pub mod partition;

use log::{debug, info, warn};

use crate::combine::CombineRule;
use crate::error::{StageError, StageResult};
use crate::linalg::sparse::{self, SparseMat, SparseSlice};
use crate::node::segment::Segment;
use crate::node::{NodeData, NodeDelta};
use crate::problem::DeterministicProblem;
use crate::quadratic;
use crate::settings::CoreSettings;
use layout::StageLayout;

/// Dense bound/objective arrays restricted to one stage.
#[derive(Debug, Clone)]
struct StageArrays {
    col_lower: Vec<f64>,
    col_upper: Vec<f64>,
    objective: Vec<f64>,
    row_lower: Vec<f64>,
    row_upper: Vec<f64>,
}

impl StageArrays {
    /// Scatter a core node's sparse segments into stage-sized buffers.
    fn from_node(node: &NodeDelta) -> Self {
        let dense = |seg: Segment, len: usize| {
            let mut d = vec![0.0; len];
            let s: SparseSlice<'_> = node.segment(seg);
            sparse::scatter(&mut d, s.indices, s.values, 0);
            d
        };
        let (ncol, nrow) = (node.num_cols(), node.num_rows());
        Self {
            col_lower: dense(Segment::ColLower, ncol),
            col_upper: dense(Segment::ColUpper, ncol),
            objective: dense(Segment::Objective, ncol),
            row_lower: dense(Segment::RowLower, nrow),
            row_upper: dense(Segment::RowUpper, nrow),
        }
    }

    fn get(&self, seg: Segment) -> &[f64] {
        match seg {
            Segment::ColLower => &self.col_lower,
            Segment::ColUpper => &self.col_upper,
            Segment::Objective => &self.objective,
            Segment::RowLower => &self.row_lower,
            Segment::RowUpper => &self.row_upper,
        }
    }
}

/// Stage-decomposed deterministic problem shared by all scenario nodes.
#[derive(Debug, Clone)]
pub struct CoreModel {
    layout: StageLayout,
    settings: CoreSettings,

    /// One core node per stage.
    nodes: Vec<NodeDelta>,

    /// Dense stage arrays derived from `nodes`.
    dense: Vec<StageArrays>,

    integer_cols: Vec<usize>,
    binary_cols: Vec<usize>,

    /// Stage-local offsets of integer columns, per stage.
    integer_cols_by_stage: Vec<Vec<usize>>,

    has_quadratic: bool,
}

impl CoreModel {
    /// Build a core model with default settings.
    ///
    /// `col_stage[c]` and `row_stage[r]` give the stage of every external
    /// column and row; each must lie in `[0, nstages)`.
    pub fn new(
        problem: &DeterministicProblem,
        nstages: usize,
        col_stage: &[usize],
        row_stage: &[usize],
    ) -> StageResult<Self> {
        Self::with_settings(problem, nstages, col_stage, row_stage, CoreSettings::default())
    }

    /// Build a core model with explicit settings.
    pub fn with_settings(
        problem: &DeterministicProblem,
        nstages: usize,
        col_stage: &[usize],
        row_stage: &[usize],
        settings: CoreSettings,
    ) -> StageResult<Self> {
        problem.validate()?;
        let nrow = problem.num_rows();
        let ncol = problem.num_cols();

        if col_stage.len() != ncol {
            return Err(StageError::DimensionMismatch {
                what: "col_stage",
                expected: ncol,
                actual: col_stage.len(),
            });
        }
        if row_stage.len() != nrow {
            return Err(StageError::DimensionMismatch {
                what: "row_stage",
                expected: nrow,
                actual: row_stage.len(),
            });
        }
        if nstages == 0 && (nrow > 0 || ncol > 0) {
            return Err(StageError::InvalidProblem(
                "a non-empty problem needs at least one stage".to_string(),
            ));
        }

        let layout = StageLayout::new(nstages, col_stage, row_stage)?;
        for t in 0..nstages {
            debug!(
                "stage {}: rows {}..{} cols {}..{}",
                t,
                layout.rows().start(t),
                layout.rows().start(t + 1),
                layout.cols().start(t),
                layout.cols().start(t + 1)
            );
        }

        // Row-major once, shared by every stage.
        let matrix = sparse::as_csr(&problem.matrix);
        let col_lower = sparse::sparsify(&problem.col_lower);
        let col_upper = sparse::sparsify(&problem.col_upper);
        let objective = sparse::sparsify(&problem.objective);
        let row_lower = sparse::sparsify(&problem.row_lower);
        let row_upper = sparse::sparsify(&problem.row_upper);
        let data = NodeData {
            matrix: Some(&*matrix),
            col_lower: Some(&col_lower),
            col_upper: Some(&col_upper),
            objective: Some(&objective),
            row_lower: Some(&row_lower),
            row_upper: Some(&row_upper),
        };

        let mut nodes = Vec::with_capacity(nstages);
        let mut dense = Vec::with_capacity(nstages);
        for t in 0..nstages {
            let node = NodeDelta::build(t, &layout, &data, true)?;
            dense.push(StageArrays::from_node(&node));
            nodes.push(node);
        }

        let mut integer_cols_by_stage = vec![Vec::new(); nstages];
        for &c in &problem.integer_cols {
            integer_cols_by_stage[layout.cols().stage_of(c)].push(layout.cols().to_stage_local(c));
        }

        let stored: usize = nodes.iter().map(NodeDelta::num_entries).sum();
        info!(
            "core model: {} stages, {} rows, {} cols, {} nonzeros, {} stored entries",
            nstages,
            nrow,
            ncol,
            problem.matrix.nnz(),
            stored
        );

        Ok(Self {
            layout,
            settings,
            nodes,
            dense,
            integer_cols: problem.integer_cols.clone(),
            binary_cols: problem.binary_cols.clone(),
            integer_cols_by_stage,
            has_quadratic: false,
        })
    }

    /// Attach a column-wise quadratic objective (external numbering).
    ///
    /// Column `j` owns `indices[starts[j]..starts[j + 1]]` and the matching
    /// `values`. Every term must couple two columns of the same stage;
    /// otherwise `CrossStageQuadratic` is returned and the core stays
    /// without quadratic data. Empty data is ignored.
    pub fn add_quadratic_objective(
        &mut self,
        starts: &[usize],
        indices: &[usize],
        values: &[f64],
    ) -> StageResult<()> {
        if self.has_quadratic {
            return Err(StageError::QuadraticAlreadyAttached);
        }

        let Some(blocks) = quadratic::split_by_stage(self.layout.cols(), starts, indices, values)? else {
            warn!("no quadratic data found, core model left linear");
            return Ok(());
        };

        for (node, block) in self.nodes.iter_mut().zip(blocks) {
            node.set_quadratic(block);
        }
        self.has_quadratic = true;
        debug!(
            "quadratic objective attached: {} stage blocks",
            self.nodes.iter().filter(|n| n.has_quadratic()).count()
        );
        Ok(())
    }

    /// Attach a quadratic objective given as a sparse `ncol × ncol` matrix.
    pub fn add_quadratic_objective_matrix(&mut self, q: &SparseMat) -> StageResult<()> {
        let ncol = self.num_cols();
        if q.rows() != ncol || q.cols() != ncol {
            return Err(StageError::InvalidProblem(format!(
                "Q has shape {}×{}, expected {}×{}",
                q.rows(),
                q.cols(),
                ncol,
                ncol
            )));
        }
        let csc = if q.is_csc() { std::borrow::Cow::Borrowed(q) } else { std::borrow::Cow::Owned(q.to_csc()) };

        let mut starts = Vec::with_capacity(ncol + 1);
        let mut indices = Vec::with_capacity(csc.nnz());
        let mut values = Vec::with_capacity(csc.nnz());
        starts.push(0);
        for col in csc.outer_iterator() {
            for (i, &v) in col.iter() {
                indices.push(i);
                values.push(v);
            }
            starts.push(indices.len());
        }
        self.add_quadratic_objective(&starts, &indices, &values)
    }

    pub(crate) fn layout(&self) -> &StageLayout {
        &self.layout
    }

    /// Number of stages
    pub fn num_stages(&self) -> usize {
        self.layout.num_stages()
    }

    /// Total number of rows
    pub fn num_rows(&self) -> usize {
        self.layout.rows().len()
    }

    /// Total number of columns
    pub fn num_cols(&self) -> usize {
        self.layout.cols().len()
    }

    /// Number of rows in stage `t`.
    ///
    /// # Panics
    ///
    /// If `t >= num_stages()`.
    pub fn num_rows_in_stage(&self, t: usize) -> usize {
        self.layout.rows().count(t)
    }

    /// Number of columns in stage `t`.
    ///
    /// # Panics
    ///
    /// If `t >= num_stages()`.
    pub fn num_cols_in_stage(&self, t: usize) -> usize {
        self.layout.cols().count(t)
    }

    /// First internal row of stage `t`; `t == num_stages()` gives `num_rows()`.
    pub fn row_start(&self, t: usize) -> usize {
        self.layout.rows().start(t)
    }

    /// First internal column of stage `t`; `t == num_stages()` gives `num_cols()`.
    pub fn col_start(&self, t: usize) -> usize {
        self.layout.cols().start(t)
    }

    /// Stage of external column `c`.
    pub fn col_stage(&self, c: usize) -> usize {
        self.layout.cols().stage_of(c)
    }

    /// Stage of external row `r`.
    pub fn row_stage(&self, r: usize) -> usize {
        self.layout.rows().stage_of(r)
    }

    /// Internal index of external column `c`.
    pub fn col_internal_index(&self, c: usize) -> usize {
        self.layout.cols().to_internal(c)
    }

    /// External index of internal column `i`.
    pub fn col_external_index(&self, i: usize) -> usize {
        self.layout.cols().to_external(i)
    }

    /// Internal index of external row `r`.
    pub fn row_internal_index(&self, r: usize) -> usize {
        self.layout.rows().to_internal(r)
    }

    /// External index of internal row `i`.
    pub fn row_external_index(&self, i: usize) -> usize {
        self.layout.rows().to_external(i)
    }

    /// Core node of stage `t`.
    pub fn node(&self, t: usize) -> StageResult<&NodeDelta> {
        self.layout.check_stage(t)?;
        Ok(&self.nodes[t])
    }

    /// Core nodes, one per stage.
    pub fn nodes(&self) -> &[NodeDelta] {
        &self.nodes
    }

    /// Dense column lower bounds of stage `t`.
    pub fn col_lower(&self, t: usize) -> StageResult<&[f64]> {
        self.stage_array(t, Segment::ColLower)
    }

    /// Dense column upper bounds of stage `t`.
    pub fn col_upper(&self, t: usize) -> StageResult<&[f64]> {
        self.stage_array(t, Segment::ColUpper)
    }

    /// Dense objective coefficients of stage `t`.
    pub fn objective(&self, t: usize) -> StageResult<&[f64]> {
        self.stage_array(t, Segment::Objective)
    }

    /// Dense row lower bounds of stage `t`.
    pub fn row_lower(&self, t: usize) -> StageResult<&[f64]> {
        self.stage_array(t, Segment::RowLower)
    }

    /// Dense row upper bounds of stage `t`.
    pub fn row_upper(&self, t: usize) -> StageResult<&[f64]> {
        self.stage_array(t, Segment::RowUpper)
    }

    /// Copy the column lower bounds of stage `t` into `dest`.
    pub fn copy_col_lower(&self, dest: &mut [f64], t: usize) -> StageResult<()> {
        self.copy_stage_array(dest, t, Segment::ColLower)
    }

    /// Copy the column upper bounds of stage `t` into `dest`.
    pub fn copy_col_upper(&self, dest: &mut [f64], t: usize) -> StageResult<()> {
        self.copy_stage_array(dest, t, Segment::ColUpper)
    }

    /// Copy the objective coefficients of stage `t` into `dest`.
    pub fn copy_objective(&self, dest: &mut [f64], t: usize) -> StageResult<()> {
        self.copy_stage_array(dest, t, Segment::Objective)
    }

    /// Copy the row lower bounds of stage `t` into `dest`.
    pub fn copy_row_lower(&self, dest: &mut [f64], t: usize) -> StageResult<()> {
        self.copy_stage_array(dest, t, Segment::RowLower)
    }

    /// Copy the row upper bounds of stage `t` into `dest`.
    pub fn copy_row_upper(&self, dest: &mut [f64], t: usize) -> StageResult<()> {
        self.copy_stage_array(dest, t, Segment::RowUpper)
    }

    /// Stage-local offsets of the integer columns of stage `t`.
    pub fn integer_cols(&self, t: usize) -> StageResult<&[usize]> {
        self.layout.check_stage(t)?;
        Ok(&self.integer_cols_by_stage[t])
    }

    /// External indices of all integer columns.
    pub fn integer_indices(&self) -> &[usize] {
        &self.integer_cols
    }

    /// External indices of all binary columns.
    pub fn binary_indices(&self) -> &[usize] {
        &self.binary_cols
    }

    /// Value standing for an absent bound.
    pub fn infinity(&self) -> f64 {
        self.settings.infinity
    }

    /// Merge policy used by nodes built against this core.
    pub fn combine_rule(&self) -> CombineRule {
        self.settings.combine_rule
    }

    /// Settings the core was built with.
    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    /// True once a non-empty quadratic objective is attached.
    pub fn has_quadratic(&self) -> bool {
        self.has_quadratic
    }

    /// Stage-local quadratic block of stage `t`, if any.
    pub fn quadratic(&self, t: usize) -> StageResult<Option<&SparseMat>> {
        Ok(self.node(t)?.quadratic())
    }

    fn stage_array(&self, t: usize, seg: Segment) -> StageResult<&[f64]> {
        self.layout.check_stage(t)?;
        Ok(self.dense[t].get(seg))
    }

    fn copy_stage_array(&self, dest: &mut [f64], t: usize, seg: Segment) -> StageResult<()> {
        let src = self.stage_array(t, seg)?;
        if dest.len() != src.len() {
            return Err(StageError::DimensionMismatch {
                what: "destination",
                expected: src.len(),
                actual: dest.len(),
            });
        }
        dest.copy_from_slice(src);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Columns with stages [1, 0, 1, 0], rows with stages [1, 0].
    fn interleaved() -> (DeterministicProblem, Vec<usize>, Vec<usize>) {
        let matrix = sparse::from_triplets(
            2,
            4,
            vec![(0, 0, 1.0), (0, 1, 2.0), (0, 2, 3.0), (1, 3, 4.0)],
        );
        let mut prob = DeterministicProblem::with_defaults(matrix);
        prob.objective = vec![10.0, 11.0, 12.0, 13.0];
        prob.col_lower = vec![-1.0, 0.0, -3.0, 0.0];
        prob.row_lower = vec![5.0, 6.0];
        prob.row_upper = vec![7.0, 8.0];
        prob.integer_cols = vec![2, 3];
        (prob, vec![1, 0, 1, 0], vec![1, 0])
    }

    #[test]
    fn test_stage_blocks_and_maps() {
        let (prob, cs, rs) = interleaved();
        let core = CoreModel::new(&prob, 2, &cs, &rs).unwrap();

        assert_eq!(core.num_stages(), 2);
        assert_eq!(core.num_cols_in_stage(0), 2);
        assert_eq!(core.num_cols_in_stage(1), 2);
        assert_eq!(core.col_start(1), 2);
        assert_eq!(core.col_start(2), 4);
        assert_eq!(core.row_start(2), 2);

        // stage 0 columns: externals 1, 3; stage 1: externals 0, 2
        assert_eq!(core.col_internal_index(1), 0);
        assert_eq!(core.col_internal_index(3), 1);
        assert_eq!(core.col_internal_index(0), 2);
        assert_eq!(core.col_external_index(3), 2);
        assert_eq!(core.row_internal_index(0), 1);
    }

    #[test]
    fn test_dense_stage_arrays() {
        let (prob, cs, rs) = interleaved();
        let core = CoreModel::new(&prob, 2, &cs, &rs).unwrap();

        assert_eq!(core.objective(0).unwrap(), &[11.0, 13.0]);
        assert_eq!(core.objective(1).unwrap(), &[10.0, 12.0]);
        assert_eq!(core.col_lower(1).unwrap(), &[-1.0, -3.0]);
        assert_eq!(core.col_upper(0).unwrap(), &[f64::INFINITY, f64::INFINITY]);
        assert_eq!(core.row_lower(0).unwrap(), &[6.0]);
        assert_eq!(core.row_upper(1).unwrap(), &[7.0]);

        let mut dest = vec![0.0; 2];
        core.copy_objective(&mut dest, 1).unwrap();
        assert_eq!(dest, vec![10.0, 12.0]);
        assert!(core.copy_objective(&mut dest, 2).is_err());
        assert!(core.copy_row_lower(&mut dest, 0).is_err());
    }

    #[test]
    fn test_signed_zero_bounds_survive() {
        let (mut prob, cs, rs) = interleaved();
        prob.col_upper = vec![-0.0, 1.0, 0.0, 2.0];
        let core = CoreModel::new(&prob, 2, &cs, &rs).unwrap();

        // stage 1 holds externals 0 and 2
        let upper = core.col_upper(1).unwrap();
        assert_eq!(upper[0].to_bits(), (-0.0f64).to_bits());
        assert_eq!(upper[1].to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_integer_cols_are_stage_local() {
        let (prob, cs, rs) = interleaved();
        let core = CoreModel::new(&prob, 2, &cs, &rs).unwrap();
        assert_eq!(core.integer_cols(0).unwrap(), &[1]);
        assert_eq!(core.integer_cols(1).unwrap(), &[1]);
        assert_eq!(core.integer_indices(), &[2, 3]);
    }

    #[test]
    fn test_rejects_bad_labels() {
        let (prob, cs, _) = interleaved();
        assert!(matches!(
            CoreModel::new(&prob, 2, &cs, &[0, 2]),
            Err(StageError::StageOutOfRange { stage: 2, .. })
        ));
        assert!(matches!(
            CoreModel::new(&prob, 2, &cs[..3], &[0, 0]),
            Err(StageError::DimensionMismatch { what: "col_stage", .. })
        ));
        assert!(matches!(
            CoreModel::new(&prob, 0, &cs, &[0, 0]),
            Err(StageError::InvalidProblem(_))
        ));
    }

    #[test]
    fn test_quadratic_attached_once() {
        let (prob, cs, rs) = interleaved();
        let mut core = CoreModel::new(&prob, 2, &cs, &rs).unwrap();

        // Q[1,1] = 2 (stage 0), Q[3,1] (stage 0 / stage 0)
        let starts = [0, 0, 2, 2, 2];
        core.add_quadratic_objective(&starts, &[1, 3], &[2.0, 0.5]).unwrap();
        assert!(core.has_quadratic());
        assert!(core.quadratic(0).unwrap().is_some());
        assert!(core.quadratic(1).unwrap().is_none());

        assert_eq!(
            core.add_quadratic_objective(&starts, &[1, 3], &[2.0, 0.5]),
            Err(StageError::QuadraticAlreadyAttached)
        );
    }

    #[test]
    fn test_quadratic_cross_stage_leaves_core_linear() {
        let (prob, cs, rs) = interleaved();
        let mut core = CoreModel::new(&prob, 2, &cs, &rs).unwrap();

        // column 1 (stage 0) coupled with column 0 (stage 1)
        let starts = [0, 0, 1, 1, 1];
        assert_eq!(
            core.add_quadratic_objective(&starts, &[0], &[1.0]),
            Err(StageError::CrossStageQuadratic { stage: 0, other_stage: 1 })
        );
        assert!(!core.has_quadratic());
        assert!(core.nodes().iter().all(|n| !n.has_quadratic()));
    }

    #[test]
    fn test_empty_quadratic_is_skipped() {
        let (prob, cs, rs) = interleaved();
        let mut core = CoreModel::new(&prob, 2, &cs, &rs).unwrap();
        core.add_quadratic_objective(&[0, 0, 0, 0, 0], &[], &[]).unwrap();
        assert!(!core.has_quadratic());
    }

    #[test]
    fn test_quadratic_from_matrix() {
        let (prob, cs, rs) = interleaved();
        let mut core = CoreModel::new(&prob, 2, &cs, &rs).unwrap();
        let q = sparse::from_triplets(4, 4, vec![(0, 0, 1.0), (2, 0, 0.5), (0, 2, 0.5)]);
        core.add_quadratic_objective_matrix(&q).unwrap();
        let q1 = core.quadratic(1).unwrap().unwrap();
        assert_eq!(q1.nnz(), 3);
        assert_eq!(q1.get(1, 0), Some(&0.5));
    }
}
