use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Strata: a rotating multi-layer LiDAR scan simulator.
///
/// This struct defines the command-line arguments that can be passed to any
/// binary application that uses the Strata simulation library.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(short, long, default_value = "assets/scenarios/showcase.toml")]
    pub scenario: PathBuf,

    /// Directory of JSON sensor presets, referenced from scenarios by dotted path.
    #[arg(short, long, default_value = crate::simulation::config::DEFAULT_CATALOG_DIR)]
    pub catalog: PathBuf,

    /// Override the scenario's run length, in seconds.
    #[arg(short, long)]
    pub duration: Option<f64>,
}
