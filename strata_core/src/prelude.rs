// strata_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::messages::{PointCloudSink, ScanReport};
pub use crate::pipeline::{GeometryEngine, ParallelCaster, SceneQuery};

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::config::{LaserLayerConfig, SensorGroupConfig};
pub use crate::geometry::RayGeometryCache;
pub use crate::messages::{PointCloud, PointSample};
pub use crate::types::{FrameHandle, HitRecord, RayDescriptor, WorldRay};

// --- Errors ---
pub use crate::error::{ConfigError, GeometryEngineError, ResourceError, ScanError};

// --- Sensor Lifecycle ---
pub use crate::sensor::{LidarSensor, ScanJob};
pub use crate::trigger::{ScanState, ScanTrigger};
