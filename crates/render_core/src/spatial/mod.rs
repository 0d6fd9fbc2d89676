//! Spatial partitioning structures
//!
//! Provides the lazily expanding bounding-volume tree that turns a
//! hierarchical scene into per-pass lists of visible render jobs.

mod kd_tree;

pub use kd_tree::KdTree;
