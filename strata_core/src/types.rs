// strata_core/src/types.rs

use nalgebra::{Point3, Vector3};

// --- Core Identifier ---
// A framework-agnostic identifier for the sensor that produced a scan.
// In the Bevy sim, we use the bits of the sensor Entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FrameHandle(pub u64);

impl FrameHandle {
    // A convenience method for use in the Bevy adapter crate.
    #[cfg(feature = "bevy")] // This will only compile if the "bevy" feature is enabled
    pub fn from_entity(entity: bevy_ecs::prelude::Entity) -> Self {
        Self(entity.to_bits())
    }

    #[cfg(feature = "bevy")]
    pub fn to_entity(self) -> bevy_ecs::prelude::Entity {
        bevy_ecs::prelude::Entity::from_bits(self.0)
    }
}

// =========================================================================
// == Ray & Hit Data ==
// =========================================================================

/// One laser beam in the SENSOR's local frame, as stored by the geometry cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayDescriptor {
    /// Stable index of the beam, layer-major, then vertical angle, then azimuth step.
    pub index: usize,
    /// Offset of the emitter from the sensor origin (the layer's mount position).
    pub origin: Vector3<f64>,
    /// Unit direction of the beam.
    pub direction: Vector3<f64>,
}

/// A ray ready to be handed to the geometry engine. All vectors are in WORLD space.
/// Only ever lives for the duration of one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRay {
    pub origin: Point3<f64>,
    /// Unit direction.
    pub direction: Vector3<f64>,
    pub max_range: f64,
}

impl WorldRay {
    pub fn point_at(&self, distance: f64) -> Point3<f64> {
        self.origin + self.direction * distance
    }
}

/// The geometry engine's answer for one ray. All vectors are in WORLD space.
/// A `distance <= 0` means the ray did not hit anything within range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitRecord {
    pub point: Point3<f64>,
    pub normal: Vector3<f64>,
    pub distance: f64,
}

impl HitRecord {
    /// The "no hit" sentinel.
    pub fn miss() -> Self {
        Self {
            point: Point3::origin(),
            normal: Vector3::zeros(),
            distance: 0.0,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.distance > 0.0
    }
}

impl Default for HitRecord {
    fn default() -> Self {
        Self::miss()
    }
}
