// strata_sim/src/simulation/plugins/debugging/scan_stats.rs

use std::collections::BTreeMap;

use crate::prelude::*;

/// How often the running totals are logged, in seconds of app time.
const REPORT_INTERVAL_SECS: f32 = 1.0;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SensorScanStats {
    pub scans: u64,
    pub failures: u64,
    pub points: u64,
    pub last_scan_index: u64,
    pub last_timestamp: f64,
}

impl SensorScanStats {
    pub fn mean_points_per_scan(&self) -> f64 {
        if self.scans == 0 {
            0.0
        } else {
            self.points as f64 / self.scans as f64
        }
    }
}

/// Per-sensor scan bookkeeping, keyed by sensor entity.
#[derive(Resource, Debug, Default)]
pub struct ScanStatistics {
    pub sensors: BTreeMap<Entity, SensorScanStats>,
}

impl ScanStatistics {
    pub fn record_cloud(&mut self, sensor: Entity, cloud: &PointCloud) {
        let stats = self.sensors.entry(sensor).or_default();
        stats.scans += 1;
        stats.points += cloud.len() as u64;
        stats.last_scan_index = cloud.scan_index;
        stats.last_timestamp = cloud.timestamp;
    }

    pub fn record_failure(&mut self, sensor: Entity) {
        self.sensors.entry(sensor).or_default().failures += 1;
    }

    pub fn total_scans(&self) -> u64 {
        self.sensors.values().map(|s| s.scans).sum()
    }
}

// =========================================================================
// == Plugin Definition ==
// =========================================================================

pub struct ScanStatsPlugin;

impl Plugin for ScanStatsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScanStatistics>()
            .add_systems(
                Update,
                (accumulate_scan_stats, log_scan_stats)
                    .chain()
                    .in_set(SimulationSet::Reporting),
            )
            .add_systems(Last, log_final_summary);
    }
}

fn accumulate_scan_stats(
    mut clouds: EventReader<PointCloudEvent>,
    mut failures: EventReader<ScanFailedEvent>,
    mut stats: ResMut<ScanStatistics>,
) {
    for event in clouds.read() {
        stats.record_cloud(event.sensor, &event.cloud);
    }
    for event in failures.read() {
        warn!(
            "Scan {} of {:?} failed: {}",
            event.scan_index, event.sensor, event.reason
        );
        stats.record_failure(event.sensor);
    }
}

fn log_scan_stats(
    time: Res<Time>,
    mut timer: Local<Option<Timer>>,
    stats: Res<ScanStatistics>,
    names: Query<&Name>,
) {
    let timer =
        timer.get_or_insert_with(|| Timer::from_seconds(REPORT_INTERVAL_SECS, TimerMode::Repeating));
    if !timer.tick(time.delta()).just_finished() {
        return;
    }

    for (entity, s) in &stats.sensors {
        let name = names.get(*entity).map(Name::as_str).unwrap_or("<despawned>");
        info!(
            "LiDAR '{}' | scans: {} | failed: {} | last: #{} @ {:.2}s | mean pts/scan: {:.1}",
            name,
            s.scans,
            s.failures,
            s.last_scan_index,
            s.last_timestamp,
            s.mean_points_per_scan()
        );
    }
}

fn log_final_summary(mut exit: EventReader<AppExit>, stats: Res<ScanStatistics>) {
    if exit.read().next().is_none() {
        return;
    }
    info!(
        "Run finished: {} scan(s) delivered across {} sensor(s).",
        stats.total_scans(),
        stats.sensors.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(scan_index: u64, points: usize) -> PointCloud {
        PointCloud {
            sensor: FrameHandle(0),
            scan_index,
            timestamp: scan_index as f64 * 0.1,
            points: vec![
                PointSample {
                    position: nalgebra::Point3::origin(),
                    intensity: 0.5,
                };
                points
            ],
            ray_indices: (0..points).collect(),
        }
    }

    #[test]
    fn statistics_accumulate_per_sensor() {
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let mut stats = ScanStatistics::default();

        stats.record_cloud(a, &cloud(1, 10));
        stats.record_cloud(a, &cloud(2, 20));
        stats.record_cloud(b, &cloud(1, 0));
        stats.record_failure(b);

        let sa = stats.sensors[&a];
        assert_eq!(sa.scans, 2);
        assert_eq!(sa.last_scan_index, 2);
        assert_eq!(sa.mean_points_per_scan(), 15.0);

        let sb = stats.sensors[&b];
        assert_eq!(sb.failures, 1);
        assert_eq!(sb.mean_points_per_scan(), 0.0);
        assert_eq!(stats.total_scans(), 3);
    }
}
