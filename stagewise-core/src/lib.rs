//! Stagewise: stage-decomposed core models for scenario trees
//!
//! This library stores a multi-stage linear/quadratic program once, split
//! into per-stage blocks, and lets every node of a scenario tree keep only
//! the sparse data that differs from that shared core. It supports:
//!
//! - **Stage partition**: stable renumbering of rows and columns so that each
//!   stage occupies a contiguous internal block, with inverse maps
//! - **Node deltas**: one compact index/value buffer per node holding matrix
//!   rows, bound and objective differences for a single stage
//! - **Combination**: effective bounds, objective and matrix rows rebuilt on
//!   demand from the core's dense stage arrays and a node's sparse delta
//! - **Quadratic objectives**: block-diagonal per stage, rejected when a term
//!   couples two stages
//!
//! # Example
//!
//! ```ignore
//! use stagewise_core::{CoreModel, DeterministicProblem, NodeData, NodeDelta};
//! use stagewise_core::linalg::sparse::from_triplets;
//!
//! let matrix = from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, 2.0)]);
//! let prob = DeterministicProblem::with_defaults(matrix);
//! let core = CoreModel::new(&prob, 2, &[0, 1], &[1])?;
//!
//! // Scenario changes the stage-1 coefficient from 2.0 to 3.0
//! let delta = from_triplets(1, 2, vec![(0, 1, 3.0)]);
//! let node = NodeDelta::scenario(1, &core, &NodeData::new().with_matrix(&delta))?;
//!
//! let row = node.combined_row(&core, 0)?;
//! println!("{:?}", row);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod combine;
pub mod core;
pub mod error;
pub mod linalg;
pub mod node;
pub mod problem;
pub mod quadratic;
pub mod settings;

// Re-export main types
pub use combine::CombineRule;
pub use crate::core::partition::StagePartition;
pub use crate::core::CoreModel;
pub use error::{IndexKind, StageError, StageResult};
pub use linalg::sparse::{SparseMat, SparseSlice, SparseVec};
pub use node::segment::Segment;
pub use node::{NodeData, NodeDelta};
pub use problem::DeterministicProblem;
pub use settings::CoreSettings;
