// strata_core/src/error.rs

use std::collections::TryReserveError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading or validating a sensor group configuration.
/// These are fatal at startup: no sensor is built from a bad document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read sensor config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sensor config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("laser layer {index} is invalid: {reason}")]
    InvalidLayer { index: usize, reason: String },

    #[error("scan frequency must be a positive, finite number of Hz (got {0})")]
    InvalidFrequency(f64),

    #[error("max range must be a positive, finite distance (got {0})")]
    InvalidMaxRange(f64),
}

/// Failures reported by (or detected around) the external geometry engine.
#[derive(Debug, Error)]
pub enum GeometryEngineError {
    #[error("geometry engine failed: {0}")]
    Backend(String),

    #[error("geometry engine returned {got} hit records for {expected} rays")]
    CardinalityMismatch { expected: usize, got: usize },
}

/// A per-scan buffer could not be allocated.
#[derive(Debug, Error)]
#[error("failed to allocate {buffer} buffer for {len} entries: {source}")]
pub struct ResourceError {
    pub buffer: &'static str,
    pub len: usize,
    #[source]
    pub source: TryReserveError,
}

/// Everything that can abort an in-flight scan. The scan's buffers are
/// released and the sensor returns to `Idle`; the next eligible tick starts
/// a fresh scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Geometry(#[from] GeometryEngineError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Reserves exactly `len` slots in a fresh vector, mapping allocator failure
/// to a `ResourceError` tagged with the buffer name.
pub(crate) fn try_buffer<T>(buffer: &'static str, len: usize) -> Result<Vec<T>, ResourceError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|source| ResourceError { buffer, len, source })?;
    Ok(v)
}
