//! Container load planning.
//!
//! Expands SKUs into item instances, loads them into a rectangular container
//! with a deterministic shelf heuristic (row, layer, container), slides the
//! result toward the origin, and reports utilization, weight and center of
//! gravity. Manual moves from a viewer are validated against the same
//! geometry without re-planning.

pub mod api;
pub mod compaction;
pub mod config;
pub mod geometry;
pub mod metrics;
pub mod model;
pub mod optimizer;
pub mod orientation;
pub mod overrides;
pub mod types;

pub use model::{Container, ItemInstance, Placement, Sku, Solution};
pub use optimizer::{SolverConfig, solve};
pub use overrides::validate_override;
