//! # Dependency Graph
//!
//! Builds per-environment dependency graphs of configs and sorts them into
//! independently deployable components.
//!
//! ## Edge Direction
//!
//! An edge `A -> B` means A depends on B (A references a property of B, or
//! declares B as a dependency). Sorting reverses the edge direction, so B is
//! always deployed before A.
//!
//! ## Key Types
//!
//! - [`ConfigGraph`] - Graph of the configs of one environment
//! - [`SortedComponent`] - A weakly connected component with its deployment order
//! - [`SortError`] - Cycles that cannot be tolerated

mod builder;
mod sort;

pub use builder::{build_graphs, ConfigGraph, ConfigGraphPerEnvironment, ConfigNode};
pub use sort::{independently_sorted_components, weakly_connected_components, SortError, SortedComponent};
