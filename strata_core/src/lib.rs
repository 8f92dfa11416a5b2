// strata_core/src/lib.rs

// This file defines the public modules of the library.
pub mod config;
pub mod error;
pub mod geometry;
pub mod messages;
pub mod pipeline;
pub mod prelude;
pub mod sensor;
pub mod trigger;
pub mod types;
pub mod utils;
