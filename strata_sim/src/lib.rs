// strata_sim/src/lib.rs

use bevy::prelude::*;

use crate::simulation::config::ConfigPlugin;
use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
use crate::simulation::plugins::debugging::scan_stats::ScanStatsPlugin;
use crate::simulation::plugins::sensors::lidar::LidarPlugin;
use crate::simulation::plugins::world::WorldScenePlugin;

// This prelude is for convenience for other files WITHIN the strata_sim crate.
pub mod prelude;

pub mod cli;
pub mod simulation;

/// The main plugin that brings together all the simulation parts.
///
/// Expects a `ScenarioConfig` resource (and optionally a `Cli`) to be
/// inserted, and `AppState` to be initialised, before it is added.
pub struct StrataSimulationPlugin;

impl Plugin for StrataSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            // Reads the sensor catalog and resolves the scenario's mounts.
            ConfigPlugin,
            // Core setup: PRNG, events, schedule sets, run length.
            SimulationSetupPlugin,
            // The static collision scene.
            WorldScenePlugin,
            LidarPlugin,
            ScanStatsPlugin,
        ));
    }
}
