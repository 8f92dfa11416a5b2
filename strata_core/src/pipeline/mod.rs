// strata_core/src/pipeline/mod.rs

//! The per-scan stages, in execution order:
//! transform -> intersect -> filter -> project.
//!
//! Every stage except `intersect` is a plain data-parallel function over
//! slices. `intersect` is the only point where a scan may suspend.

pub mod filter;
pub mod intersect;
pub mod project;
pub mod transform;

pub use filter::filter_hits;
pub use intersect::{intersect_rays, GeometryEngine, ParallelCaster, SceneQuery};
pub use project::{project_points, ProjectionFrame};
pub use transform::transform_rays;

/// Number of rays each worker handles per work item.
pub const RAY_BATCH_SIZE: usize = 64;
