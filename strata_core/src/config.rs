// strata_core/src/config.rs

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::utils::serde_helpers;

/// The file name hosts look for when no sensor config path is given.
pub const DEFAULT_CONFIG_FILE: &str = "lidar.json";

/// Range used when the document does not specify one, in meters.
pub const DEFAULT_MAX_RANGE: f64 = 50.0;

// =========================================================================
// == Validated Configuration ==
// =========================================================================

/// One set of co-mounted laser beams sharing a vertical angle list and an
/// azimuth resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaserLayerConfig {
    /// Elevation of each beam in degrees, positive is up. One beam per angle per azimuth step.
    pub vertical_angles: Vec<f64>,
    /// Number of evenly spaced azimuth steps over a full turn.
    pub horizontal_resolution: u32,
    /// Emitter offset from the sensor origin, in the sensor frame.
    #[serde(with = "serde_helpers::vec3")]
    pub position: Vector3<f64>,
    /// Mount orientation relative to the sensor frame.
    #[serde(with = "serde_helpers::quat_from_euler_deg")]
    pub rotation: UnitQuaternion<f64>,
}

impl LaserLayerConfig {
    pub fn new(
        vertical_angles: Vec<f64>,
        horizontal_resolution: u32,
        position: Vector3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        Self {
            vertical_angles,
            horizontal_resolution,
            position,
            rotation,
        }
    }

    pub fn ray_count(&self) -> usize {
        self.vertical_angles.len() * self.horizontal_resolution as usize
    }
}

/// # SensorGroupConfig
/// The static description of one sensor: its layers, how often it scans and
/// where its output frame sits. Immutable once loaded; every constructor
/// validates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SensorGroupDocument")]
pub struct SensorGroupConfig {
    layers: Vec<LaserLayerConfig>,
    frequency: f64,
    #[serde(with = "serde_helpers::vec3")]
    origin_offset: Vector3<f64>,
    max_range: f64,
}

impl SensorGroupConfig {
    /// Builds a configuration with the default max range.
    pub fn new(
        layers: Vec<LaserLayerConfig>,
        frequency: f64,
        origin_offset: Vector3<f64>,
    ) -> Result<Self, ConfigError> {
        Self::with_max_range(layers, frequency, origin_offset, DEFAULT_MAX_RANGE)
    }

    pub fn with_max_range(
        layers: Vec<LaserLayerConfig>,
        frequency: f64,
        origin_offset: Vector3<f64>,
        max_range: f64,
    ) -> Result<Self, ConfigError> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(ConfigError::InvalidFrequency(frequency));
        }
        if !max_range.is_finite() || max_range <= 0.0 {
            return Err(ConfigError::InvalidMaxRange(max_range));
        }
        for (index, layer) in layers.iter().enumerate() {
            if layer.horizontal_resolution == 0 {
                return Err(ConfigError::InvalidLayer {
                    index,
                    reason: "horizontal resolution must be at least 1".to_string(),
                });
            }
            if let Some(angle) = layer.vertical_angles.iter().find(|a| !a.is_finite()) {
                return Err(ConfigError::InvalidLayer {
                    index,
                    reason: format!("vertical angle {angle} is not finite"),
                });
            }
        }

        Ok(Self {
            layers,
            frequency,
            origin_offset,
            max_range,
        })
    }

    /// Parses and validates an in-memory JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let document: SensorGroupDocument = serde_json::from_str(json)?;
        Self::try_from(document)
    }

    /// Reads, parses and validates a JSON document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn layers(&self) -> &[LaserLayerConfig] {
        &self.layers
    }

    /// Scans per second.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Offset of the point-cloud origin from the sensor position, applied at projection time.
    pub fn origin_offset(&self) -> Vector3<f64> {
        self.origin_offset
    }

    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    /// Total number of beams: the sum over layers of `vertical angles * horizontal resolution`.
    pub fn ray_count(&self) -> usize {
        self.layers.iter().map(LaserLayerConfig::ray_count).sum()
    }
}

// =========================================================================
// == On-Disk Document ==
// These map directly to the keys of a sensor JSON file. Aliases accept the
// camel-case layout written by older exporters.
// =========================================================================

#[derive(Debug, Deserialize)]
struct SensorGroupDocument {
    #[serde(alias = "configs")]
    layers: Vec<LaserLayerDocument>,
    frequency: f64,
    #[serde(alias = "lidarOrigin", with = "serde_helpers::vec3")]
    origin_offset: Vector3<f64>,
    #[serde(alias = "maxRange", default = "default_max_range")]
    max_range: f64,
}

#[derive(Debug, Deserialize)]
struct LaserLayerDocument {
    /// Degrees above the horizon.
    vertical_angles: Option<Vec<f64>>,
    /// Legacy key. Older exporters store the beam pitch with positive meaning
    /// *down* (a left-handed Euler pitch), so these are negated on load.
    #[serde(rename = "laserVerticalAngle")]
    legacy_pitch_angles: Option<Vec<f64>>,
    // Signed so that a negative value is reported as a bad layer, not a parse error.
    #[serde(alias = "horizontalResolution")]
    horizontal_resolution: i64,
    #[serde(with = "serde_helpers::vec3")]
    position: Vector3<f64>,
    #[serde(with = "serde_helpers::quat_from_euler_deg")]
    rotation: UnitQuaternion<f64>,
}

fn default_max_range() -> f64 {
    DEFAULT_MAX_RANGE
}

impl TryFrom<SensorGroupDocument> for SensorGroupConfig {
    type Error = ConfigError;

    fn try_from(document: SensorGroupDocument) -> Result<Self, Self::Error> {
        let layers = document
            .layers
            .into_iter()
            .enumerate()
            .map(|(index, layer)| {
                let vertical_angles = match (layer.vertical_angles, layer.legacy_pitch_angles) {
                    (Some(angles), None) => angles,
                    (None, Some(pitches)) => pitches.into_iter().map(|p| -p).collect(),
                    (Some(_), Some(_)) => {
                        return Err(ConfigError::InvalidLayer {
                            index,
                            reason: "both `vertical_angles` and `laserVerticalAngle` are set"
                                .to_string(),
                        })
                    }
                    (None, None) => {
                        return Err(ConfigError::InvalidLayer {
                            index,
                            reason: "missing `vertical_angles`".to_string(),
                        })
                    }
                };
                let horizontal_resolution = u32::try_from(layer.horizontal_resolution)
                    .ok()
                    .filter(|steps| *steps > 0)
                    .ok_or_else(|| ConfigError::InvalidLayer {
                        index,
                        reason: format!(
                            "horizontal resolution must be a positive integer (got {})",
                            layer.horizontal_resolution
                        ),
                    })?;
                Ok(LaserLayerConfig::new(
                    vertical_angles,
                    horizontal_resolution,
                    layer.position,
                    layer.rotation,
                ))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Self::with_max_range(
            layers,
            document.frequency,
            document.origin_offset,
            document.max_range,
        )
    }
}
