// strata_sim/src/simulation/core/events.rs

use bevy::prelude::{Entity, Event};
use strata_core::messages::PointCloud;

/// A finished scan, published once per delivered point cloud.
#[derive(Event, Clone, Debug)]
pub struct PointCloudEvent {
    pub sensor: Entity,
    pub cloud: PointCloud,
}

/// A scan that was abandoned; the sensor will start a fresh one on its next
/// eligible tick.
#[derive(Event, Clone, Debug)]
pub struct ScanFailedEvent {
    pub sensor: Entity,
    pub scan_index: u64,
    pub reason: String,
}

/// Flips the enabled flag of one LiDAR, or of every LiDAR when `sensor` is `None`.
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct LidarToggleEvent {
    pub sensor: Option<Entity>,
}
