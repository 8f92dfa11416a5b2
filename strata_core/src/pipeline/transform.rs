// strata_core/src/pipeline/transform.rs

use nalgebra::{Isometry3, Point3};
use rayon::prelude::*;

use super::RAY_BATCH_SIZE;
use crate::error::{try_buffer, ResourceError};
use crate::geometry::RayGeometryCache;
use crate::types::WorldRay;

/// Places every cached beam into the world using the sensor pose sampled at
/// scan start. Output order matches the cache's ray order.
pub fn transform_rays(
    cache: &RayGeometryCache,
    pose: &Isometry3<f64>,
    max_range: f64,
) -> Result<Vec<WorldRay>, ResourceError> {
    let mut rays = try_buffer("world ray", cache.len())?;
    rays.par_extend(
        cache
            .origins()
            .par_iter()
            .zip(cache.directions().par_iter())
            .with_min_len(RAY_BATCH_SIZE)
            .map(|(origin, direction)| WorldRay {
                origin: pose * Point3::from(*origin),
                direction: pose.rotation * direction,
                max_range,
            }),
    );
    Ok(rays)
}
