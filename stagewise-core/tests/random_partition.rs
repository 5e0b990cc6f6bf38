//! Seeded randomized tests for stage partitioning and node combination.
//!
//! Each case draws a problem with random stage labels and checks the
//! results against a direct computation in external numbering.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use stagewise_core::linalg::sparse::{from_triplets, sparse_vec};
use stagewise_core::{
    CombineRule, CoreModel, CoreSettings, DeterministicProblem, IndexKind, NodeData, NodeDelta,
    SparseMat, StagePartition,
};

const CASES: usize = 50;

fn random_labels(rng: &mut ChaCha8Rng, n: usize, nstages: usize) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..nstages)).collect()
}

fn random_matrix(rng: &mut ChaCha8Rng, nrow: usize, ncol: usize, density: f64) -> SparseMat {
    let mut triplets = Vec::new();
    for i in 0..nrow {
        for j in 0..ncol {
            if rng.gen_bool(density) {
                triplets.push((i, j, rng.gen_range(1.0..2.0)));
            }
        }
    }
    from_triplets(nrow, ncol, triplets)
}

struct Case {
    prob: DeterministicProblem,
    nstages: usize,
    col_stage: Vec<usize>,
    row_stage: Vec<usize>,
}

impl Case {
    /// Core with the overwrite rule regardless of `STAGEWISE_COMBINE`.
    fn core(&self) -> CoreModel {
        let settings = CoreSettings::default().with_combine_rule(CombineRule::Overwrite);
        CoreModel::with_settings(&self.prob, self.nstages, &self.col_stage, &self.row_stage, settings).unwrap()
    }
}

fn random_case(rng: &mut ChaCha8Rng) -> Case {
    let nstages = rng.gen_range(1..5);
    let nrow = rng.gen_range(1..15);
    let ncol = rng.gen_range(1..20);

    let mut prob = DeterministicProblem::with_defaults(random_matrix(rng, nrow, ncol, 0.3));
    prob.col_lower = (0..ncol).map(|_| rng.gen_range(-5.0..0.0)).collect();
    prob.col_upper = (0..ncol).map(|_| rng.gen_range(1.0..5.0)).collect();
    prob.objective = (0..ncol).map(|_| rng.gen_range(-1.0..1.0)).collect();
    prob.integer_cols = (0..ncol).filter(|_| rng.gen_bool(0.3)).collect();

    Case {
        col_stage: random_labels(rng, ncol, nstages),
        row_stage: random_labels(rng, nrow, nstages),
        prob,
        nstages,
    }
}

#[test]
fn test_partition_is_stable_bijection() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..CASES {
        let nstages = rng.gen_range(1..6);
        let n = rng.gen_range(0..40);
        let labels = random_labels(&mut rng, n, nstages);
        let part = StagePartition::new(IndexKind::Column, &labels, nstages).unwrap();

        assert_eq!(part.len(), n);
        assert_eq!(part.starts().len(), nstages + 1);
        assert_eq!(part.start(nstages), n);
        for t in 0..nstages {
            let count = labels.iter().filter(|&&s| s == t).count();
            assert_eq!(part.count(t), count);
        }

        for ext in 0..n {
            let int = part.to_internal(ext);
            assert_eq!(part.to_external(int), ext);
            assert!(part.range(labels[ext]).contains(&int));
            assert_eq!(part.to_stage_local(ext), int - part.start(labels[ext]));
        }

        // first-seen order inside each stage
        for t in 0..nstages {
            let externals: Vec<usize> = part.range(t).map(|i| part.to_external(i)).collect();
            assert!(externals.windows(2).all(|w| w[0] < w[1]));
        }
    }
}

#[test]
fn test_dense_arrays_match_external_data() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..CASES {
        let case = random_case(&mut rng);
        let core = case.core();

        for c in 0..core.num_cols() {
            let t = core.col_stage(c);
            let local = core.col_internal_index(c) - core.col_start(t);
            assert_eq!(core.col_lower(t).unwrap()[local], case.prob.col_lower[c]);
            assert_eq!(core.col_upper(t).unwrap()[local], case.prob.col_upper[c]);
            assert_eq!(core.objective(t).unwrap()[local], case.prob.objective[c]);
        }

        for t in 0..core.num_stages() {
            let expected: Vec<usize> = case
                .prob
                .integer_cols
                .iter()
                .filter(|&&c| core.col_stage(c) == t)
                .map(|&c| core.col_internal_index(c) - core.col_start(t))
                .collect();
            assert_eq!(core.integer_cols(t).unwrap(), expected.as_slice());
        }
    }
}

#[test]
fn test_bound_override_matches_direct_overwrite() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    for _ in 0..CASES {
        let case = random_case(&mut rng);
        let core = case.core();
        let ncol = core.num_cols();

        let mut entries: Vec<(usize, f64)> = Vec::new();
        for c in 0..ncol {
            if rng.gen_bool(0.4) {
                entries.push((c, rng.gen_range(-10.0..-6.0)));
            }
        }
        let lower = sparse_vec(ncol, entries.clone());

        let t = rng.gen_range(0..case.nstages);
        let node = NodeDelta::scenario(t, &core, &NodeData::new().with_col_lower(&lower)).unwrap();

        let mut expected = core.col_lower(t).unwrap().to_vec();
        for &(c, v) in &entries {
            if core.col_stage(c) == t {
                expected[core.col_internal_index(c) - core.col_start(t)] = v;
            }
        }

        let mut dest = vec![0.0; core.num_cols_in_stage(t)];
        node.copy_col_lower(&core, &mut dest).unwrap();
        assert_eq!(dest, expected);
    }
}

#[test]
fn test_combined_rows_match_direct_overwrite() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..CASES {
        let case = random_case(&mut rng);
        let core = case.core();
        let (nrow, ncol) = (core.num_rows(), core.num_cols());

        let delta = random_matrix(&mut rng, nrow, ncol, 0.2);
        let t = rng.gen_range(0..case.nstages);
        let node = NodeDelta::scenario(t, &core, &NodeData::new().with_matrix(&delta)).unwrap();

        for r in (0..nrow).filter(|&r| core.row_stage(r) == t) {
            // direct computation in external numbering, mapped to internal columns
            let mut expected = vec![0.0; ncol];
            if let Some(row) = case.prob.matrix.outer_view(r) {
                for (j, &v) in row.iter() {
                    expected[core.col_internal_index(j)] = v;
                }
            }
            if let Some(row) = delta.outer_view(r) {
                for (j, &v) in row.iter() {
                    expected[core.col_internal_index(j)] = v;
                }
            }

            let i = core.row_internal_index(r);
            for combined in [
                node.combined_row(&core, i).unwrap(),
                node.combine_with_dense_core_row(&core, i).unwrap(),
            ] {
                assert!(combined.indices().windows(2).all(|w| w[0] < w[1]));
                let mut dense = vec![0.0; ncol];
                for (j, &v) in combined.iter() {
                    dense[j] = v;
                }
                assert_eq!(dense, expected);
            }

            let dense_row = node.dense_row(i).unwrap();
            assert_eq!(dense_row.len(), ncol);
            assert_eq!(dense_row, node.dense_row(i).unwrap());
        }
    }
}
