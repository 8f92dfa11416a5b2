// strata_sim/src/simulation/core/simulation_setup.rs

use crate::prelude::*;
use crate::simulation::core::events::{LidarToggleEvent, PointCloudEvent, ScanFailedEvent};
use crate::simulation::core::prng::SimulationRng;

/// Wall-clock bookkeeping for the `Running` phase.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct RunClock {
    /// `Time::elapsed_secs_f64` when the app entered `Running`.
    pub started_at: f64,
    /// Length of the run; `None` runs until the app is closed.
    pub duration: Option<f64>,
    exit_requested: bool,
}

pub struct SimulationSetupPlugin;

impl Plugin for SimulationSetupPlugin {
    fn build(&self, app: &mut App) {
        // The scenario is inserted by the binary before this plugin is added.
        let config = match app.world().get_resource::<ScenarioConfig>() {
            Some(config) => config.clone(),
            None => {
                warn!("No ScenarioConfig resource found; running an empty default scenario.");
                app.insert_resource(ScenarioConfig::default());
                ScenarioConfig::default()
            }
        };

        // --- 1. Add the Deterministic PRNG Resource ---
        app.insert_resource(SimulationRng::from_seed(config.simulation.seed));

        // --- INITIALIZE RESOURCES & EVENTS ---
        app.insert_resource(RunClock {
            duration: config.simulation.duration_seconds,
            ..default()
        })
        .add_event::<PointCloudEvent>()
        .add_event::<ScanFailedEvent>()
        .add_event::<LidarToggleEvent>();

        // --- CONFIGURE THE SPAWNING PIPELINE ---
        app.configure_sets(
            OnEnter(AppState::SceneBuilding),
            (
                SceneBuildSet::World,
                SceneBuildSet::Sensors,
                SceneBuildSet::Finalize,
            )
                .chain(),
        );
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            transition_to_running.in_set(SceneBuildSet::Finalize),
        );

        // Configure the runtime schedule graph.
        app.configure_sets(
            Update,
            (
                SimulationSet::Input,
                SimulationSet::Motion,
                SimulationSet::Sensors,
                SimulationSet::Reporting,
            )
                .chain()
                .run_if(in_state(AppState::Running)),
        );

        app.add_systems(OnEnter(AppState::Running), start_run_clock)
            .add_systems(Update, stop_after_duration.in_set(SimulationSet::Reporting));
    }
}

/// Runs once at the end of the `OnEnter(SceneBuilding)` chain.
fn transition_to_running(mut next_state: ResMut<NextState<AppState>>) {
    info!("Scene building complete. Transitioning to Running state.");
    next_state.set(AppState::Running);
}

fn start_run_clock(time: Res<Time>, mut clock: ResMut<RunClock>) {
    clock.started_at = time.elapsed_secs_f64();
}

/// Requests a clean exit once the run has lasted its configured duration.
fn stop_after_duration(
    time: Res<Time>,
    mut clock: ResMut<RunClock>,
    mut exit: EventWriter<AppExit>,
) {
    let Some(duration) = clock.duration else {
        return;
    };
    if !clock.exit_requested && time.elapsed_secs_f64() - clock.started_at >= duration {
        info!("Configured duration of {duration:.1} s reached. Exiting.");
        exit.write(AppExit::Success);
        clock.exit_requested = true;
    }
}
