// strata_sim/examples/headless_scan.rs

//! Runs a scenario without a window and logs what the LiDARs see.
//!
//! This example demonstrates how to:
//! 1. Load a scenario from the path given on the command line.
//! 2. Set up a headless Bevy application.
//! 3. Add the `StrataSimulationPlugin`, which builds the scene and runs the sensors.
//! 4. Consume `PointCloudEvent`s and drive sensors with `LidarToggleEvent`s.
//!
//! To run this example from the `strata_sim` directory:
//! `cargo run --example headless_scan -- --scenario assets/scenarios/showcase.toml`

use std::process::ExitCode;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::state::app::StatesPlugin;
use clap::Parser;

use strata_sim::cli::Cli;
use strata_sim::prelude::*;
use strata_sim::simulation::config::load_scenario;

/// Every this many seconds all sensors are toggled off or back on.
const TOGGLE_PERIOD_SECS: f32 = 3.0;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // --- 1. Load Simulation Configuration ---
    let mut scenario = match load_scenario(&cli.scenario) {
        Ok(scenario) => scenario,
        Err(e) => {
            eprintln!("Could not load scenario '{}': {e}", cli.scenario.display());
            return ExitCode::FAILURE;
        }
    };
    if let Some(duration) = cli.duration {
        scenario.simulation.duration_seconds = Some(duration);
    }

    let mut app = App::new();

    // --- 2. Add Core Bevy Plugins & Resources ---
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / 60.0,
        ))),
        StatesPlugin,
        LogPlugin {
            level: bevy::log::Level::INFO,
            filter: "info,strata_sim=debug,strata_core=info".to_string(),
            ..default()
        },
    ))
    .insert_resource(cli)
    .insert_resource(scenario);

    app.init_state::<AppState>();

    // --- 3. Add the Main Strata Simulation Plugin ---
    app.add_plugins(StrataSimulationPlugin);

    // --- 4. Add Example-Specific Systems ---
    app.add_systems(
        Update,
        (toggle_lidars_periodically, log_nearest_return).in_set(SimulationSet::Reporting),
    );

    println!("Starting Strata simulation...");
    match app.run() {
        AppExit::Success => ExitCode::SUCCESS,
        AppExit::Error(_) => ExitCode::FAILURE,
    }
}

fn toggle_lidars_periodically(
    time: Res<Time>,
    mut timer: Local<Option<Timer>>,
    mut toggles: EventWriter<LidarToggleEvent>,
) {
    let timer =
        timer.get_or_insert_with(|| Timer::from_seconds(TOGGLE_PERIOD_SECS, TimerMode::Repeating));
    if timer.tick(time.delta()).just_finished() {
        info!("Toggling all LiDARs.");
        toggles.write(LidarToggleEvent { sensor: None });
    }
}

/// Prints the closest return of every scan.
fn log_nearest_return(mut clouds: EventReader<PointCloudEvent>, names: Query<&Name>) {
    for PointCloudEvent { sensor, cloud } in clouds.read() {
        let name = names.get(*sensor).map(Name::as_str).unwrap_or("?");
        let nearest = cloud
            .iter_with_rays()
            .min_by(|(_, a), (_, b)| {
                a.position
                    .coords
                    .norm()
                    .total_cmp(&b.position.coords.norm())
            });
        match nearest {
            Some((ray, point)) => info!(
                "[{name}] scan #{}: {} points, nearest {:.2} m on ray {ray} (intensity {:.2})",
                cloud.scan_index,
                cloud.len(),
                point.position.coords.norm(),
                point.intensity
            ),
            None => info!("[{name}] scan #{}: no returns", cloud.scan_index),
        }
    }
}
