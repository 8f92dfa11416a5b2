// strata_sim/src/simulation/core/app_state.rs

use bevy::{ecs::schedule::SystemSet, prelude::States};

/// Defines the major phases of the application's lifecycle.
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    /// The initial state. Sensor presets are read and the scenario's
    /// sensor mounts are resolved against them.
    #[default]
    AssetLoading,

    /// Configuration is resolved. The static scene and the sensor entities
    /// are being spawned.
    SceneBuilding,

    /// The scene is built. Sensors tick every frame until the run ends.
    Running,
}

/// System sets to control the order of execution during the SceneBuilding state.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneBuildSet {
    /// Pass 1: Build the collision scene the LiDARs cast against.
    World,

    /// Pass 2: Spawn one entity per resolved sensor mount.
    Sensors,

    /// Pass 3: Report what was built and move on to `Running`.
    Finalize,
}

// =========================================================================
// == Main Simulation Sets ==
// =========================================================================

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Operator commands (enable/disable toggles).
    Input,
    /// Moves sensor mounts before they sample their pose.
    Motion,
    /// Collects finished scans, then starts new ones.
    Sensors,
    /// Consumers of `PointCloudEvent`s and scan statistics.
    Reporting,
}
