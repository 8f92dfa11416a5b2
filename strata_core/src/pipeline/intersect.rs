// strata_core/src/pipeline/intersect.rs

use rayon::prelude::*;
use std::future::Future;

use super::RAY_BATCH_SIZE;
use crate::error::GeometryEngineError;
use crate::types::{HitRecord, WorldRay};

/// The contract for the external scene/physics engine.
///
/// Given N world rays, the engine answers with N hit records in the same
/// order: entry `i` is the nearest intersection of ray `i` within its max
/// range, or a miss (`distance <= 0`). The returned future is the only place
/// a scan may suspend, so engines that batch work on their own threads (or a
/// GPU) can resolve it later without blocking the host loop.
pub trait GeometryEngine: Send + Sync {
    fn intersect_batch(
        &self,
        rays: &[WorldRay],
    ) -> impl Future<Output = Result<Vec<HitRecord>, GeometryEngineError>> + Send;
}

/// A scene that can answer one ray at a time. Wrap it in a `ParallelCaster`
/// to use it as a `GeometryEngine`.
pub trait SceneQuery: Send + Sync {
    /// Nearest hit of `ray` within `ray.max_range`, or `HitRecord::miss()`.
    fn cast_ray(&self, ray: &WorldRay) -> HitRecord;
}

/// Fans a batch out over the rayon pool, `RAY_BATCH_SIZE` rays per work item.
#[derive(Debug, Clone, Default)]
pub struct ParallelCaster<S> {
    pub scene: S,
}

impl<S: SceneQuery> ParallelCaster<S> {
    pub fn new(scene: S) -> Self {
        Self { scene }
    }
}

impl<S: SceneQuery> GeometryEngine for ParallelCaster<S> {
    fn intersect_batch(
        &self,
        rays: &[WorldRay],
    ) -> impl Future<Output = Result<Vec<HitRecord>, GeometryEngineError>> + Send {
        async move {
            Ok(rays
                .par_iter()
                .with_min_len(RAY_BATCH_SIZE)
                .map(|ray| self.scene.cast_ray(ray))
                .collect())
        }
    }
}

/// Runs one batch through the engine and checks the response shape.
pub async fn intersect_rays<E: GeometryEngine + ?Sized>(
    engine: &E,
    rays: &[WorldRay],
) -> Result<Vec<HitRecord>, GeometryEngineError> {
    let hits = engine.intersect_batch(rays).await?;
    if hits.len() != rays.len() {
        return Err(GeometryEngineError::CardinalityMismatch {
            expected: rays.len(),
            got: hits.len(),
        });
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    /// A floor at z = 0 seen from above.
    struct Floor;

    impl SceneQuery for Floor {
        fn cast_ray(&self, ray: &WorldRay) -> HitRecord {
            if ray.direction.z >= 0.0 {
                return HitRecord::miss();
            }
            let distance = -ray.origin.z / ray.direction.z;
            if distance > ray.max_range {
                return HitRecord::miss();
            }
            HitRecord {
                point: ray.point_at(distance),
                normal: Vector3::z(),
                distance,
            }
        }
    }

    struct Truncating;

    impl GeometryEngine for Truncating {
        async fn intersect_batch(
            &self,
            rays: &[WorldRay],
        ) -> Result<Vec<HitRecord>, GeometryEngineError> {
            Ok(vec![HitRecord::miss(); rays.len().saturating_sub(1)])
        }
    }

    fn ray(z_dir: f64) -> WorldRay {
        WorldRay {
            origin: Point3::new(0.0, 0.0, 2.0),
            direction: Vector3::new(1.0, 0.0, z_dir).normalize(),
            max_range: 10.0,
        }
    }

    #[test]
    fn parallel_caster_preserves_order() {
        let rays: Vec<WorldRay> = (0..200)
            .map(|i| ray(if i % 3 == 0 { -1.0 } else { 0.5 }))
            .collect();
        let engine = ParallelCaster::new(Floor);
        let hits = pollster::block_on(intersect_rays(&engine, &rays)).unwrap();

        assert_eq!(hits.len(), rays.len());
        for (i, hit) in hits.iter().enumerate() {
            assert_eq!(hit.is_hit(), i % 3 == 0, "ray {i}");
        }
    }

    #[test]
    fn wrong_cardinality_is_rejected() {
        let rays = vec![ray(-1.0); 5];
        let result = pollster::block_on(intersect_rays(&Truncating, &rays));
        match result {
            Err(GeometryEngineError::CardinalityMismatch { expected, got }) => {
                assert_eq!((expected, got), (5, 4));
            }
            other => panic!("expected CardinalityMismatch, got {other:?}"),
        }
    }
}
