// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling glob patterns into [`PatternSet`]s and routes.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing bursts of events per route.
//!
//! It does **not** know about the task graph; it only turns filesystem changes
//! into payloads (for the session, a [`crate::engine::Trigger`]).

pub mod debounce;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use debounce::Debouncer;
pub use patterns::{build_bindings, split_glob_base, PatternSet, WatchBinding, WatchRoute};
pub use watcher::{run_event_loop, spawn_watcher, WatcherHandle};
