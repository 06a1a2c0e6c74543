// src/assets/mod.rs

//! Source discovery and the incremental-copy filter.

pub mod incremental;
pub mod sources;

pub use incremental::{CopyEntry, CopyStats, IncrementalCopy};
pub use sources::{expand_sources, walk_files, SourceFile};
