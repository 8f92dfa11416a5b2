// strata_core/src/geometry.rs

//! The fixed scan pattern of a sensor. Every beam's local origin and
//! direction is computed once from the configuration and then shared,
//! read-only, by every scan for the lifetime of the sensor.

use nalgebra::{UnitQuaternion, Vector3};
use rayon::prelude::*;
use std::f64::consts::TAU;

use crate::config::{LaserLayerConfig, SensorGroupConfig};
use crate::types::RayDescriptor;

/// Parallel arrays of beam origins and unit directions, indexed by ray index.
///
/// Ordering is layer-major, then vertical angle, then azimuth step, and never
/// changes for a given configuration, so consumers can map a ray index back
/// to a physical beam.
#[derive(Debug, Clone)]
pub struct RayGeometryCache {
    origins: Vec<Vector3<f64>>,
    directions: Vec<Vector3<f64>>,
}

impl RayGeometryCache {
    pub fn new(config: &SensorGroupConfig) -> Self {
        let ray_count = config.ray_count();
        let mut origins = Vec::with_capacity(ray_count);
        let mut directions = Vec::with_capacity(ray_count);

        for layer in config.layers() {
            let steps = layer.horizontal_resolution;
            for &vertical_angle in &layer.vertical_angles {
                // Each (layer, angle) row is independent, so fill it in parallel.
                let row_start = directions.len();
                directions.resize(row_start + steps as usize, Vector3::zeros());
                directions[row_start..]
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(step, dir)| {
                        *dir = beam_direction(layer, vertical_angle, step as u32);
                    });
                origins.resize(origins.len() + steps as usize, layer.position);
            }
        }

        debug_assert_eq!(origins.len(), ray_count);
        debug_assert_eq!(directions.len(), ray_count);

        Self {
            origins,
            directions,
        }
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Local emitter offsets, one per ray.
    pub fn origins(&self) -> &[Vector3<f64>] {
        &self.origins
    }

    /// Local unit directions, one per ray.
    pub fn directions(&self) -> &[Vector3<f64>] {
        &self.directions
    }

    pub fn get(&self, index: usize) -> Option<RayDescriptor> {
        Some(RayDescriptor {
            index,
            origin: *self.origins.get(index)?,
            direction: *self.directions.get(index)?,
        })
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = RayDescriptor> + '_ {
        self.origins
            .iter()
            .zip(&self.directions)
            .enumerate()
            .map(|(index, (origin, direction))| RayDescriptor {
                index,
                origin: *origin,
                direction: *direction,
            })
    }
}

/// Direction of one beam in the sensor frame (+X forward, +Z up).
///
/// The canonical forward vector is pitched up by the vertical angle, swept
/// counter-clockwise about +Z by `360 * step / resolution` degrees, and
/// finally carried by the layer's mount rotation.
pub fn beam_direction(layer: &LaserLayerConfig, vertical_angle_deg: f64, step: u32) -> Vector3<f64> {
    let azimuth = TAU * step as f64 / layer.horizontal_resolution as f64;
    // Rotating +X about +Y by a negative angle lifts it toward +Z.
    let elevation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -vertical_angle_deg.to_radians());
    let sweep = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), azimuth);

    (layer.rotation * sweep * elevation * Vector3::x()).normalize()
}
