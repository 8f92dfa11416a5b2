// strata_sim/src/simulation/plugins/world/mod.rs

//! Builds the static scene from the scenario and shares it with the LiDARs
//! as their geometry engine.

mod scene;

use std::sync::Arc;

use crate::prelude::*;
use crate::simulation::core::prng::SimulationRng;
use strata_core::pipeline::ParallelCaster;

pub use scene::{SceneBody, StaticScene};

/// The geometry engine every LiDAR casts against. Cloning the `Arc` is how
/// an in-flight scan keeps the scene alive on the task pool.
#[derive(Resource, Clone, Debug)]
pub struct SceneGeometry {
    pub engine: Arc<ParallelCaster<StaticScene>>,
}

impl SceneGeometry {
    pub fn new(scene: StaticScene) -> Self {
        Self {
            engine: Arc::new(ParallelCaster::new(scene)),
        }
    }

    pub fn scene(&self) -> &StaticScene {
        &self.engine.scene
    }
}

impl Default for SceneGeometry {
    fn default() -> Self {
        Self::new(StaticScene::new())
    }
}

pub struct WorldScenePlugin;

impl Plugin for WorldScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneGeometry>().add_systems(
            OnEnter(AppState::SceneBuilding),
            build_static_scene.in_set(SceneBuildSet::World),
        );
    }
}

fn build_static_scene(
    scenario: Res<ScenarioConfig>,
    mut rng: ResMut<SimulationRng>,
    mut geometry: ResMut<SceneGeometry>,
) {
    let mut scene = StaticScene::new();
    for obstacle in &scenario.world.obstacles {
        debug!("[WORLD] Adding obstacle '{}'", obstacle.name);
        scene.add_obstacle(obstacle);
    }

    if let Some(clutter) = &scenario.world.clutter {
        let placed = scene.add_clutter(clutter, &mut rng.0);
        if placed < clutter.count {
            warn!(
                "[WORLD] Only placed {} of {} clutter pillars; the keep-clear radius leaves too little room.",
                placed, clutter.count
            );
        }
    }

    info!("[WORLD] Static scene built with {} bodies.", scene.len());
    *geometry = SceneGeometry::new(scene);
}
