// strata_sim/src/simulation/config/mod.rs

//! Loading and resolving everything the simulation reads from disk: the
//! scenario TOML and the catalog of LiDAR presets it refers to.

mod catalog;

use bevy::prelude::*;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::cli::Cli;
use crate::prelude::AppState;
use strata_core::config::SensorGroupConfig;
use strata_core::error::ConfigError;

pub use catalog::SensorCatalog;
pub use crate::simulation::core::config::{ScenarioConfig, SensorMountConfig};

/// Where sensor presets live when no `--catalog` is given.
pub const DEFAULT_CATALOG_DIR: &str = "assets/sensors";

#[derive(Debug, Error)]
pub enum SimConfigError {
    #[error("scenario file not found at '{0}'")]
    NotFound(PathBuf),

    #[error("failed to load scenario: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("sensor '{sensor}': {source}")]
    Sensor {
        sensor: String,
        #[source]
        source: ConfigError,
    },

    #[error("sensor '{sensor}' refers to unknown preset '{preset}'")]
    UnknownPreset { sensor: String, preset: String },

    #[error("sensor '{0}' names neither a `preset` nor a `config_file`")]
    MissingSource(String),
}

/// Reads a scenario file. Any value can be overridden from the environment,
/// e.g. `STRATA_SIMULATION__DURATION_SECONDS=30`.
pub fn load_scenario(path: impl AsRef<Path>) -> Result<ScenarioConfig, SimConfigError> {
    let path = path.as_ref();
    // Figment treats a missing file as an empty provider; we want a hard error.
    if !path.exists() {
        return Err(SimConfigError::NotFound(path.to_path_buf()));
    }
    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("STRATA_").split("__"))
        .extract()
        .map_err(|e| SimConfigError::Figment(Box::new(e)))
}

/// A sensor mount paired with the validated scan pattern it will use.
#[derive(Debug, Clone)]
pub struct ResolvedSensor {
    pub mount: SensorMountConfig,
    pub config: SensorGroupConfig,
}

#[derive(Resource, Default, Debug)]
pub struct ResolvedSensors(pub Vec<ResolvedSensor>);

/// Picks the scan pattern for one mount: an explicit `config_file` wins
/// over a catalog `preset`.
pub fn resolve_sensor(
    mount: &SensorMountConfig,
    catalog: &SensorCatalog,
) -> Result<ResolvedSensor, SimConfigError> {
    let config = match (&mount.config_file, &mount.preset) {
        (Some(path), _) => {
            SensorGroupConfig::load(path).map_err(|source| SimConfigError::Sensor {
                sensor: mount.name.clone(),
                source,
            })?
        }
        (None, Some(preset)) => catalog
            .get(preset)
            .cloned()
            .ok_or_else(|| SimConfigError::UnknownPreset {
                sensor: mount.name.clone(),
                preset: preset.clone(),
            })?,
        (None, None) => return Err(SimConfigError::MissingSource(mount.name.clone())),
    };

    Ok(ResolvedSensor {
        mount: mount.clone(),
        config,
    })
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ResolvedSensors>()
            .init_resource::<SensorCatalog>()
            .add_systems(
                OnEnter(AppState::AssetLoading),
                (
                    load_catalog_from_disk,
                    resolve_sensor_mounts,
                    transition_to_scene_building,
                )
                    .chain(),
            );
    }
}

fn load_catalog_from_disk(cli: Option<Res<Cli>>, mut catalog: ResMut<SensorCatalog>) {
    let root = cli
        .map(|cli| cli.catalog.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_DIR));
    // Presets registered in code before startup take precedence.
    for (key, config) in SensorCatalog::load_from_dir(&root).0 {
        catalog.0.entry(key).or_insert(config);
    }
}

fn resolve_sensor_mounts(
    scenario: Res<ScenarioConfig>,
    catalog: Res<SensorCatalog>,
    mut resolved: ResMut<ResolvedSensors>,
) {
    for mount in &scenario.sensors {
        match resolve_sensor(mount, &catalog) {
            Ok(sensor) => {
                info!(
                    "Resolved sensor '{}': {} rays per scan",
                    sensor.mount.name,
                    sensor.config.ray_count()
                );
                resolved.0.push(sensor);
            }
            Err(e) => {
                error!("Failed to resolve sensor config: {}. Skipping sensor.", e);
            }
        }
    }
}

fn transition_to_scene_building(mut next_state: ResMut<NextState<AppState>>) {
    info!("Configuration loading and resolution complete. Transitioning to SceneBuilding state.");
    next_state.set(AppState::SceneBuilding);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::core::config::{Pose, ShapeConfig};
    use nalgebra::{UnitQuaternion, Vector3};
    use strata_core::config::LaserLayerConfig;

    const SCENARIO: &str = r#"
        [simulation]
        seed = 7
        duration_seconds = 2.5

        [[world.obstacles]]
        name = "ground"
        shape = { kind = "HalfSpace", normal = [0.0, 0.0, 1.0] }

        [[world.obstacles]]
        name = "crate"
        shape = { kind = "Cuboid", half_extents = [0.5, 0.5, 0.5] }
        pose = { translation = [5.0, 0.0, 0.5], rotation = [0.0, 0.0, 45.0] }

        [[sensors]]
        name = "roof"
        preset = "ring"
        pose = { translation = { x = 0.0, y = 0.0, z = 1.8 } }
        yaw_rate_deg = 90.0
    "#;

    fn parse(toml: &str) -> ScenarioConfig {
        Figment::new()
            .merge(Toml::string(toml))
            .extract()
            .expect("scenario parses")
    }

    fn ring_preset() -> SensorGroupConfig {
        SensorGroupConfig::new(
            vec![LaserLayerConfig::new(
                vec![0.0],
                8,
                Vector3::zeros(),
                UnitQuaternion::identity(),
            )],
            10.0,
            Vector3::zeros(),
        )
        .expect("valid preset")
    }

    #[test]
    fn scenario_sections_parse() {
        let scenario = parse(SCENARIO);
        assert_eq!(scenario.simulation.seed, Some(7));
        assert_eq!(scenario.simulation.duration_seconds, Some(2.5));
        assert_eq!(scenario.world.obstacles.len(), 2);
        assert_eq!(
            scenario.world.obstacles[1].shape,
            ShapeConfig::Cuboid {
                half_extents: [0.5, 0.5, 0.5]
            }
        );
        assert_eq!(scenario.world.obstacles[0].pose, Pose::default());

        let roof = &scenario.sensors[0];
        assert_eq!(roof.preset.as_deref(), Some("ring"));
        assert!(roof.enabled);
        assert_eq!(roof.pose.translation.z, 1.8);
        assert_eq!(roof.yaw_rate_deg, 90.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = Figment::new()
            .merge(Toml::string("[simulation]\nseeed = 1\n"))
            .extract::<ScenarioConfig>();
        assert!(result.is_err());
    }

    #[test]
    fn duration_defaults_match_with_or_without_simulation_table() {
        let without_table = parse("");
        let without_key = parse("[simulation]\nseed = 3\n");
        assert_eq!(without_table.simulation.duration_seconds, Some(10.0));
        assert_eq!(without_key.simulation.duration_seconds, Some(10.0));
        assert_eq!(without_key.simulation.seed, Some(3));
    }

    #[test]
    fn bundled_showcase_resolves_fully() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        let scenario =
            load_scenario(dir.join("assets/scenarios/showcase.toml")).expect("showcase loads");
        let catalog = SensorCatalog::load_from_dir(&dir.join(DEFAULT_CATALOG_DIR));

        assert_eq!(scenario.simulation.seed, Some(42));
        assert!(scenario.world.clutter.is_some());
        for mount in &scenario.sensors {
            assert!(resolve_sensor(mount, &catalog).is_ok(), "{} resolves", mount.name);
        }
    }

    #[test]
    fn missing_scenario_file_is_an_error() {
        let err = load_scenario("/no/such/scenario.toml").unwrap_err();
        assert!(matches!(err, SimConfigError::NotFound(_)));
    }

    #[test]
    fn mounts_resolve_against_the_catalog() {
        let scenario = parse(SCENARIO);
        let mut catalog = SensorCatalog::default();
        catalog.insert("ring", ring_preset());

        let resolved = resolve_sensor(&scenario.sensors[0], &catalog).expect("resolves");
        assert_eq!(resolved.config.ray_count(), 8);

        let mut unknown = scenario.sensors[0].clone();
        unknown.preset = Some("nope".into());
        assert!(matches!(
            resolve_sensor(&unknown, &catalog),
            Err(SimConfigError::UnknownPreset { .. })
        ));

        unknown.preset = None;
        assert!(matches!(
            resolve_sensor(&unknown, &catalog),
            Err(SimConfigError::MissingSource(_))
        ));
    }

    #[test]
    fn config_file_takes_precedence_over_preset() {
        let mut mount = parse(SCENARIO).sensors[0].clone();
        mount.config_file = Some(PathBuf::from("/no/such/lidar.json"));
        let mut catalog = SensorCatalog::default();
        catalog.insert("ring", ring_preset());

        assert!(matches!(
            resolve_sensor(&mount, &catalog),
            Err(SimConfigError::Sensor {
                source: ConfigError::Io { .. },
                ..
            })
        ));
    }
}
