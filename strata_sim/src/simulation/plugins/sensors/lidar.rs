// strata_sim/src/simulation/plugins/sensors/lidar.rs

//! Hosts `strata_core::LidarSensor`s inside Bevy.
//!
//! Each frame, in `SimulationSet::Sensors`:
//! 1. Finished scan tasks are collected and their point clouds published
//!    as `PointCloudEvent`s.
//! 2. Every sensor is ticked with the app clock and its current pose. A scan
//!    that comes due is spawned on the `AsyncComputeTaskPool` so the frame
//!    never waits on ray casting.

use bevy::tasks::{block_on, futures_lite::future, AsyncComputeTaskPool, Task};
use std::sync::{Arc, Mutex, PoisonError};

use crate::prelude::*;
use crate::simulation::config::ResolvedSensors;
use crate::simulation::core::transforms::transform_to_enu_pose;
use crate::simulation::plugins::world::SceneGeometry;

type ScanTask = Task<Result<ScanReport, ScanError>>;

/// The Bevy side of one LiDAR.
#[derive(Component)]
pub struct Lidar {
    pub sensor: LidarSensor,
    in_flight: Option<(u64, ScanTask)>,
    /// Filled by the sensor's consumer on the task thread, drained on the main thread.
    outbox: Arc<Mutex<Vec<PointCloud>>>,
}

impl Lidar {
    pub fn new(sensor: LidarSensor) -> Self {
        let outbox: Arc<Mutex<Vec<PointCloud>>> = Arc::default();
        let sink = outbox.clone();
        sensor.set_sink(move |cloud: &PointCloud| {
            sink.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(cloud.clone());
        });
        Self {
            sensor,
            in_flight: None,
            outbox,
        }
    }

    /// Index of the scan currently running on the task pool, if any.
    pub fn scan_in_flight(&self) -> Option<u64> {
        self.in_flight.as_ref().map(|(index, _)| *index)
    }

    fn drain_outbox(&self) -> Vec<PointCloud> {
        std::mem::take(&mut *self.outbox.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Rotates the whole mount about the world vertical axis.
#[derive(Component, Debug, Clone, Copy)]
pub struct Spin {
    /// Radians per second, counter-clockwise seen from above.
    pub yaw_rate: f64,
}

pub struct LidarPlugin;

impl Plugin for LidarPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            spawn_lidars.in_set(SceneBuildSet::Sensors),
        )
        .add_systems(
            Update,
            (
                apply_lidar_toggles.in_set(SimulationSet::Input),
                spin_mounts.in_set(SimulationSet::Motion),
                (collect_finished_scans, trigger_scans)
                    .chain()
                    .in_set(SimulationSet::Sensors),
            ),
        )
        .add_systems(Last, shutdown_lidars_on_exit);
    }
}

fn spawn_lidars(mut commands: Commands, resolved: Res<ResolvedSensors>) {
    for resolved in &resolved.0 {
        let mount = &resolved.mount;
        let entity = commands.spawn_empty().id();

        let mut sensor = LidarSensor::new(resolved.config.clone())
            .with_handle(FrameHandle::from_entity(entity));
        sensor.set_enabled(mount.enabled);

        info!(
            "[SPAWN] LiDAR '{}' ({} rays at {:.1} Hz)",
            mount.name,
            sensor.ray_count(),
            sensor.config().frequency()
        );

        let mut entity_commands = commands.entity(entity);
        entity_commands.insert((
            Name::new(mount.name.clone()),
            mount.pose.to_bevy_transform(),
            Lidar::new(sensor),
        ));
        if mount.yaw_rate_deg != 0.0 {
            entity_commands.insert(Spin {
                yaw_rate: mount.yaw_rate_deg.to_radians(),
            });
        }
    }
}

fn apply_lidar_toggles(mut events: EventReader<LidarToggleEvent>, mut lidars: Query<&mut Lidar>) {
    for event in events.read() {
        match event.sensor {
            Some(entity) => match lidars.get_mut(entity) {
                Ok(mut lidar) => {
                    lidar.sensor.toggle_enabled();
                }
                Err(_) => warn!("Toggle requested for {entity:?}, which is not a LiDAR."),
            },
            None => {
                for mut lidar in &mut lidars {
                    lidar.sensor.toggle_enabled();
                }
            }
        }
    }
}

fn spin_mounts(time: Res<Time>, mut query: Query<(&Spin, &mut Transform)>) {
    let dt = time.delta_secs_f64();
    for (spin, mut transform) in &mut query {
        // ENU yaw is a turn about Bevy's +Y.
        transform.rotate_y((spin.yaw_rate * dt) as f32);
    }
}

fn collect_finished_scans(
    mut lidars: Query<(Entity, &mut Lidar)>,
    mut clouds: EventWriter<PointCloudEvent>,
    mut failures: EventWriter<ScanFailedEvent>,
) {
    for (entity, mut lidar) in &mut lidars {
        let Some((scan_index, task)) = lidar.in_flight.as_mut() else {
            continue;
        };
        let scan_index = *scan_index;
        let Some(result) = block_on(future::poll_once(task)) else {
            continue;
        };
        lidar.in_flight = None;

        match result {
            Ok(report) => {
                if !report.delivered {
                    debug!("Scan {} of {entity:?} finished without delivery.", report.scan_index);
                }
                for cloud in lidar.drain_outbox() {
                    clouds.write(PointCloudEvent {
                        sensor: entity,
                        cloud,
                    });
                }
            }
            Err(e) => {
                failures.write(ScanFailedEvent {
                    sensor: entity,
                    scan_index,
                    reason: e.to_string(),
                });
            }
        }
    }
}

fn trigger_scans(
    time: Res<Time>,
    geometry: Res<SceneGeometry>,
    mut lidars: Query<(Entity, &mut Lidar, &Transform)>,
) {
    let now = time.elapsed_secs_f64();
    let pool = AsyncComputeTaskPool::get();

    for (entity, mut lidar, transform) in &mut lidars {
        // A task that finished after this frame's collection still holds a
        // result; it is picked up next frame before another scan may start.
        if lidar.in_flight.is_some() {
            continue;
        }
        let pose = transform_to_enu_pose(transform);
        let Some(job) = lidar.sensor.tick(now, &pose) else {
            continue;
        };

        trace!("Spawning scan {} for {entity:?}", job.scan_index());
        let scan_index = job.scan_index();
        let engine = geometry.engine.clone();
        let task = pool.spawn(async move { job.run(&*engine).await });
        lidar.in_flight = Some((scan_index, task));
    }
}

/// Stops every sensor before the app tears down. Dropping the pending task
/// cancels it; the evicted scan never delivers.
fn shutdown_lidars_on_exit(mut exit: EventReader<AppExit>, mut lidars: Query<&mut Lidar>) {
    if exit.read().next().is_none() {
        return;
    }
    for mut lidar in &mut lidars {
        lidar.sensor.shutdown();
        lidar.in_flight = None;
        lidar.drain_outbox();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::config::{ResolvedSensor, SensorCatalog};
    use crate::simulation::plugins::world::StaticScene;
    use nalgebra::{Isometry3, UnitQuaternion, Vector3};
    use strata_core::config::LaserLayerConfig;

    fn ring(frequency: f64) -> SensorGroupConfig {
        SensorGroupConfig::new(
            vec![LaserLayerConfig::new(
                vec![0.0],
                4,
                Vector3::zeros(),
                UnitQuaternion::identity(),
            )],
            frequency,
            Vector3::zeros(),
        )
        .expect("valid config")
    }

    fn walled_scene() -> StaticScene {
        let mut scene = StaticScene::new();
        for (name, x, y) in [("e", 10.0, 0.0), ("n", 0.0, 10.0), ("w", -10.0, 0.0), ("s", 0.0, -10.0)] {
            scene.add_body(
                name,
                parry3d_f64::shape::SharedShape::cuboid(0.5, 0.5, 0.5),
                Isometry3::translation(x, y, 0.0),
            );
        }
        scene
    }

    #[test]
    fn scan_job_runs_against_the_static_scene() {
        let mut sensor = LidarSensor::new(ring(10.0));
        let clouds: Arc<Mutex<Vec<PointCloud>>> = Arc::default();
        let sink = clouds.clone();
        sensor.set_sink(move |cloud: &PointCloud| sink.lock().unwrap().push(cloud.clone()));

        let geometry = SceneGeometry::new(walled_scene());
        let job = sensor.tick(0.1, &Isometry3::identity()).expect("scan due");
        let report = pollster::block_on(job.run(&*geometry.engine)).expect("scan succeeds");

        assert_eq!(report.ray_count, 4);
        assert_eq!(report.point_count, 4);
        assert!(report.delivered);

        let clouds = clouds.lock().unwrap();
        let cloud = &clouds[0];
        for point in &cloud.points {
            // Each face sits 9.5 m out and faces the sensor head-on.
            approx::assert_relative_eq!(point.position.coords.norm(), 9.5, epsilon = 1e-9);
            approx::assert_relative_eq!(point.intensity, 1.0 - 9.5 / 50.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn lidar_component_collects_through_its_outbox() {
        let mut lidar = Lidar::new(LidarSensor::new(ring(10.0)));
        let geometry = SceneGeometry::new(walled_scene());

        let job = lidar
            .sensor
            .tick(0.1, &Isometry3::identity())
            .expect("scan due");
        pollster::block_on(job.run(&*geometry.engine)).expect("scan succeeds");

        let drained = lidar.drain_outbox();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].len(), 4);
        assert!(lidar.drain_outbox().is_empty());
    }

    #[test]
    fn uncollected_task_blocks_the_next_scan() {
        use bevy::time::TimeUpdateStrategy;
        use std::time::Duration;

        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(200)))
            .init_resource::<SceneGeometry>()
            .add_systems(Update, trigger_scans);

        // A scan whose task has already finished but was never collected.
        let finished: ScanTask = AsyncComputeTaskPool::get().spawn(async {
            Ok(ScanReport {
                scan_index: 7,
                timestamp: 0.0,
                ray_count: 4,
                point_count: 0,
                delivered: true,
            })
        });
        let mut lidar = Lidar::new(LidarSensor::new(ring(10.0)));
        lidar.in_flight = Some((7, finished));
        let entity = app.world_mut().spawn((lidar, Transform::default())).id();

        for _ in 0..4 {
            app.update();
        }

        let lidar = app.world().get::<Lidar>(entity).expect("lidar survives");
        assert_eq!(lidar.scan_in_flight(), Some(7));
        assert_eq!(lidar.sensor.state(), ScanState::Idle);
    }

    #[test]
    fn headless_app_publishes_point_clouds() {
        use bevy::state::app::StatesPlugin;
        use bevy::time::TimeUpdateStrategy;
        use std::time::Duration;

        #[derive(Resource, Default)]
        struct Received(Vec<PointCloudEvent>);

        fn record(mut events: EventReader<PointCloudEvent>, mut received: ResMut<Received>) {
            received.0.extend(events.read().cloned());
        }

        let mut catalog = SensorCatalog::default();
        catalog.insert("ring", ring(10.0));

        let scenario = ScenarioConfig {
            simulation: SimulationSettings {
                seed: Some(1),
                duration_seconds: None,
            },
            sensors: vec![SensorMountConfig {
                name: "roof".into(),
                preset: Some("ring".into()),
                config_file: None,
                pose: Pose::default(),
                yaw_rate_deg: 0.0,
                enabled: true,
            }],
            ..Default::default()
        };

        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(50)))
            .insert_resource(scenario)
            .insert_resource(catalog)
            .init_state::<AppState>()
            .add_plugins(crate::StrataSimulationPlugin)
            .init_resource::<Received>()
            .add_systems(Update, record.in_set(SimulationSet::Reporting));
        for _ in 0..400 {
            app.update();
            if !app.world().resource::<Received>().0.is_empty() {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }

        let received = &app.world().resource::<Received>().0;
        assert!(!received.is_empty(), "no point cloud was published");
        let first = &received[0];
        assert_eq!(first.cloud.scan_index, 1);
        // The default scene is empty, so every ray misses.
        assert!(first.cloud.is_empty());
        assert_eq!(first.cloud.sensor, FrameHandle::from_entity(first.sensor));
    }

    #[test]
    fn resolved_sensor_spawns_with_its_mount() {
        use bevy::state::app::StatesPlugin;

        let mut app = App::new();
        app.add_plugins((MinimalPlugins, StatesPlugin))
            .init_state::<AppState>()
            .insert_resource(ResolvedSensors(vec![ResolvedSensor {
                mount: SensorMountConfig {
                    name: "spinner".into(),
                    preset: None,
                    config_file: None,
                    pose: Pose::default(),
                    yaw_rate_deg: 90.0,
                    enabled: false,
                },
                config: ring(5.0),
            }]))
            .add_systems(Startup, spawn_lidars);
        app.update();

        let world = app.world_mut();
        let mut query = world.query::<(Entity, &Name, &Lidar, &Spin)>();
        let (entity, name, lidar, spin) = query.single(world).expect("one LiDAR");
        assert_eq!(name.as_str(), "spinner");
        assert!(!lidar.sensor.is_enabled());
        assert_eq!(lidar.sensor.handle(), FrameHandle::from_entity(entity));
        approx::assert_relative_eq!(spin.yaw_rate, std::f64::consts::FRAC_PI_2);
    }
}
