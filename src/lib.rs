//! Constraint-based student grouping: balanced partitions with gender and
//! ability balancing, support-partner pairing and pairwise separations.

pub mod balancer;
pub mod config;
pub mod data;
pub mod partition;
pub mod roster;
pub mod separation;
pub mod server;
pub mod solver;

pub use data::{
    Gender, GroupingOptions, GroupingRequest, GroupingResult, StudentId, StudentRecord, Strategy,
    UnmetObjective,
};
pub use solver::generate_groups;
