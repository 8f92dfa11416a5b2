// strata_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// Re-export the strata_core prelude so the pure types (`LidarSensor`,
// `PointCloud`, `FrameHandle`, ...) are one import away.
pub use strata_core::prelude::*;

// Re-export common simulation-specific types for easy access in other plugins.
pub use crate::simulation::core::config::*;
pub use crate::simulation::core::app_state::{AppState, SceneBuildSet, SimulationSet};
pub use crate::simulation::core::events::{LidarToggleEvent, PointCloudEvent, ScanFailedEvent};
pub use crate::simulation::plugins::sensors::lidar::{Lidar, LidarPlugin, Spin};
pub use crate::simulation::plugins::world::{SceneGeometry, StaticScene};
pub use crate::StrataSimulationPlugin;
