// src/dag/mod.rs

//! Dependency resolution.
//!
//! - [`builder`] resolves a root task into an execution plan, detecting cycles.
//! - [`plan`] holds the plan tree itself.
//! - [`graph`] is the registry-wide graph used for validation.

pub mod builder;
pub mod graph;
pub mod plan;

pub use builder::PlanBuilder;
pub use graph::DependencyGraph;
pub use plan::ExecutionNode;
