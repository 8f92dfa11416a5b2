// strata_sim/src/simulation/core/config.rs

use bevy::prelude::{Resource, Transform};
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;
use std::path::PathBuf;

use crate::simulation::core::transforms::enu_pose_to_transform;
use strata_core::utils::serde_helpers;

// =========================================================================
// == Top-Level Scenario Resource ==
// =========================================================================

/// # ScenarioConfig
/// The root of a `scenario.toml` file: how long to run, what the world
/// contains, and which LiDARs are mounted where.
#[derive(Resource, Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: SimulationSettings,

    #[serde(default)]
    pub world: WorldConfig,

    // The TOML has `[[sensors]]`, which becomes a Vec of SensorMountConfig structs.
    #[serde(default)]
    pub sensors: Vec<SensorMountConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Wall-clock length of the run in seconds. Defaults to 10 s whether the
    /// key or the whole `[simulation]` table is left out.
    #[serde(default = "default_duration")]
    pub duration_seconds: Option<f64>,
}

fn default_duration() -> Option<f64> {
    Some(10.0)
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: default_duration(),
        }
    }
}

// =========================================================================
// == World ==
// =========================================================================

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct WorldConfig {
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    /// Randomly scattered pillars, placed with the simulation PRNG.
    pub clutter: Option<ClutterConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ObstacleConfig {
    pub name: String,
    pub shape: ShapeConfig,
    #[serde(default)]
    pub pose: Pose,
}

/// Collision shapes the scene understands. All dimensions in meters, ENU frame.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind")] // This tells Serde to use the "kind" field to decide which variant to parse
#[serde(rename_all = "PascalCase")]
pub enum ShapeConfig {
    Cuboid { half_extents: [f64; 3] },
    Ball { radius: f64 },
    /// Upright cylinder, axis along +Z.
    Cylinder { half_height: f64, radius: f64 },
    /// Infinite plane; everything behind `normal` is solid.
    HalfSpace { normal: [f64; 3] },
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ClutterConfig {
    pub count: usize,
    pub radius: f64,
    pub height: f64,
    /// Pillars are placed in `[-extent, extent]` on both horizontal axes.
    pub area_half_extent: f64,
    /// No pillar is placed closer than this to the world origin.
    #[serde(default)]
    pub keep_clear_radius: f64,
}

// =========================================================================
// == Sensors ==
// =========================================================================

/// One LiDAR mounted in the world. The scan pattern comes either from a
/// catalog preset (e.g. `"velodyne.vlp16"`) or from an explicit JSON file.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SensorMountConfig {
    pub name: String,
    pub preset: Option<String>,
    pub config_file: Option<PathBuf>,
    #[serde(default)]
    pub pose: Pose,
    /// Spin the whole mount about the vertical axis, in degrees per second.
    #[serde(default)]
    pub yaw_rate_deg: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

// =========================================================================
// == Helper Structs for Nested Configuration ==
// =========================================================================

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    #[serde(with = "serde_helpers::vec3", default = "zero_translation")]
    pub translation: Vector3<f64>,

    #[serde(with = "serde_helpers::quat_from_euler_deg", default = "no_rotation")]
    pub rotation: UnitQuaternion<f64>,
}

fn zero_translation() -> Vector3<f64> {
    Vector3::zeros()
}

fn no_rotation() -> UnitQuaternion<f64> {
    UnitQuaternion::identity()
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: zero_translation(),
            rotation: no_rotation(),
        }
    }
}

impl Pose {
    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    pub fn to_bevy_transform(&self) -> Transform {
        enu_pose_to_transform(&self.to_isometry())
    }
}
