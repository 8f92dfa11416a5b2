// strata_sim/src/simulation/plugins/world/scene.rs

//! A static collision scene the LiDAR rays are cast against.

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use parry3d_f64::query::{Ray, RayCast};
use parry3d_f64::shape::SharedShape;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f64::consts::FRAC_PI_2;
use std::fmt;

use crate::simulation::core::config::{ClutterConfig, ObstacleConfig, ShapeConfig};
use strata_core::pipeline::SceneQuery;
use strata_core::types::{HitRecord, WorldRay};

/// One rigid obstacle, posed in the ENU world frame.
#[derive(Clone)]
pub struct SceneBody {
    pub name: String,
    pub shape: SharedShape,
    pub pose: Isometry3<f64>,
}

impl fmt::Debug for SceneBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneBody")
            .field("name", &self.name)
            .field("shape", &self.shape.shape_type())
            .field("pose", &self.pose)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticScene {
    bodies: Vec<SceneBody>,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bodies(&self) -> &[SceneBody] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn add_body(&mut self, name: impl Into<String>, shape: SharedShape, pose: Isometry3<f64>) {
        self.bodies.push(SceneBody {
            name: name.into(),
            shape,
            pose,
        });
    }

    /// Adds an obstacle described in a scenario file.
    pub fn add_obstacle(&mut self, obstacle: &ObstacleConfig) {
        let pose = obstacle.pose.to_isometry();
        match &obstacle.shape {
            ShapeConfig::Cuboid { half_extents: [x, y, z] } => {
                self.add_body(&obstacle.name, SharedShape::cuboid(*x, *y, *z), pose)
            }
            ShapeConfig::Ball { radius } => {
                self.add_body(&obstacle.name, SharedShape::ball(*radius), pose)
            }
            ShapeConfig::Cylinder { half_height, radius } => self.add_body(
                &obstacle.name,
                SharedShape::cylinder(*half_height, *radius),
                // parry's cylinders stand along +Y; ours stand along +Z.
                pose * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
            ),
            ShapeConfig::HalfSpace { normal: [x, y, z] } => self.add_body(
                &obstacle.name,
                SharedShape::halfspace(Unit::new_normalize(Vector3::new(*x, *y, *z))),
                pose,
            ),
        }
    }

    /// Scatters upright pillars over the clutter area. Placement draws only
    /// from `rng`, so a seeded generator rebuilds the same scene.
    pub fn add_clutter(&mut self, clutter: &ClutterConfig, rng: &mut ChaCha8Rng) -> usize {
        let extent = clutter.area_half_extent.abs();
        let keep_clear = clutter.keep_clear_radius.max(0.0);
        let half_height = clutter.height * 0.5;
        let shape = SharedShape::cylinder(half_height, clutter.radius);
        let upright = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);

        let mut placed = 0;
        // Bounded so an impossible keep-clear radius cannot spin forever.
        let max_attempts = clutter.count.saturating_mul(20);
        // `gen_range` panics on an empty or non-finite range.
        if !extent.is_finite() || extent <= 0.0 {
            return 0;
        }
        for _ in 0..max_attempts {
            if placed == clutter.count {
                break;
            }
            let x = rng.gen_range(-extent..=extent);
            let y = rng.gen_range(-extent..=extent);
            if x.hypot(y) < keep_clear {
                continue;
            }
            let pose = Isometry3::from_parts(Translation3::new(x, y, half_height), upright);
            self.add_body(format!("clutter_{placed}"), shape.clone(), pose);
            placed += 1;
        }
        placed
    }
}

impl SceneQuery for StaticScene {
    fn cast_ray(&self, ray: &WorldRay) -> HitRecord {
        let query = Ray::new(ray.origin, ray.direction);
        self.bodies
            .iter()
            .filter_map(|body| {
                body.shape
                    .cast_ray_and_get_normal(&body.pose, &query, ray.max_range, true)
            })
            // A ray starting inside a solid reports a zero-distance hit, which reads as a miss.
            .filter(|hit| hit.time_of_impact > 0.0)
            .min_by(|a, b| a.time_of_impact.total_cmp(&b.time_of_impact))
            .map(|hit| HitRecord {
                point: ray.point_at(hit.time_of_impact),
                normal: hit.normal,
                distance: hit.time_of_impact,
            })
            .unwrap_or_else(HitRecord::miss)
    }
}
