// strata_core/src/sensor.rs

//! The sensor instance: owns the persistent ray geometry, decides when a scan
//! starts and hands each scan out as a self-contained `ScanJob`.

use nalgebra::{Isometry3, Vector3};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::config::SensorGroupConfig;
use crate::error::{ConfigError, ScanError};
use crate::geometry::RayGeometryCache;
use crate::messages::{PointCloud, PointCloudSink, ScanReport};
use crate::pipeline::{
    filter_hits, intersect_rays, project_points, transform_rays, GeometryEngine, ProjectionFrame,
};
use crate::trigger::{ScanPermit, ScanSlot, ScanState, ScanTrigger};
use crate::types::FrameHandle;

type SharedSink = Arc<Mutex<Option<Box<dyn PointCloudSink>>>>;

/// A simulated rotating multi-layer LiDAR.
///
/// The host calls [`LidarSensor::tick`] once per update with its clock and the
/// sensor's current world pose. When a scan is due, `tick` returns a
/// [`ScanJob`] which the host drives to completion on whatever executor it
/// likes. Until that job finishes (or is dropped), further ticks never start
/// another scan.
pub struct LidarSensor {
    handle: FrameHandle,
    config: SensorGroupConfig,
    cache: Arc<RayGeometryCache>,
    trigger: ScanTrigger,
    slot: ScanSlot,
    sink: SharedSink,
    next_scan_index: u64,
}

impl LidarSensor {
    pub fn new(config: SensorGroupConfig) -> Self {
        let cache = Arc::new(RayGeometryCache::new(&config));
        info!(
            "LiDAR ready: {} layer(s), {} rays per scan at {:.1} Hz, range {:.1} m",
            config.layers().len(),
            cache.len(),
            config.frequency(),
            config.max_range()
        );

        Self {
            handle: FrameHandle::default(),
            trigger: ScanTrigger::new(config.frequency()),
            config,
            cache,
            slot: ScanSlot::new(),
            sink: Arc::new(Mutex::new(None)),
            next_scan_index: 1,
        }
    }

    /// Loads the sensor configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(SensorGroupConfig::load(path)?))
    }

    /// Tags every point cloud this sensor produces with `handle`.
    pub fn with_handle(mut self, handle: FrameHandle) -> Self {
        self.handle = handle;
        self
    }

    pub fn handle(&self) -> FrameHandle {
        self.handle
    }

    pub fn config(&self) -> &SensorGroupConfig {
        &self.config
    }

    pub fn geometry(&self) -> &RayGeometryCache {
        &self.cache
    }

    pub fn ray_count(&self) -> usize {
        self.cache.len()
    }

    pub fn state(&self) -> ScanState {
        self.slot.state()
    }

    pub fn is_enabled(&self) -> bool {
        self.trigger.is_enabled()
    }

    /// Stops or resumes scheduling new scans. A scan already in flight is unaffected.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.trigger.is_enabled() {
            info!(sensor = self.handle.0, "LiDAR {}", if enabled { "enabled" } else { "disabled" });
        }
        self.trigger.set_enabled(enabled);
    }

    pub fn toggle_enabled(&mut self) -> bool {
        let enabled = !self.is_enabled();
        self.set_enabled(enabled);
        enabled
    }

    /// Registers the consumer that receives every finished scan, replacing any previous one.
    pub fn set_sink(&self, sink: impl PointCloudSink + 'static) {
        *lock_sink(&self.sink) = Some(Box::new(sink));
    }

    pub fn clear_sink(&self) {
        *lock_sink(&self.sink) = None;
    }

    /// Consults the scan trigger for the host tick at `time`.
    ///
    /// Returns a job when a new scan starts. The pose is sampled here, once,
    /// and used for the whole scan.
    pub fn tick(&mut self, time: f64, pose: &Isometry3<f64>) -> Option<ScanJob> {
        if self.slot.is_closed() || !self.trigger.poll(time, self.slot.is_idle()) {
            return None;
        }

        let scan_index = self.next_scan_index;
        let permit = self.slot.try_acquire(scan_index)?;
        self.next_scan_index += 1;
        debug!(
            sensor = self.handle.0,
            scan_index,
            rays = self.cache.len(),
            "starting scan at t = {time:.3}"
        );

        Some(ScanJob {
            sensor: self.handle,
            permit,
            cache: self.cache.clone(),
            pose: *pose,
            origin_offset: self.config.origin_offset(),
            max_range: self.config.max_range(),
            timestamp: time,
            sink: self.sink.clone(),
        })
    }

    /// Tears the sensor down: no further scans start, and a scan still in
    /// flight is evicted so it frees its buffers without delivering.
    /// Safe to call more than once.
    pub fn shutdown(&mut self) -> Option<u64> {
        if self.slot.is_closed() {
            return None;
        }
        let evicted = self.slot.close();
        match evicted {
            Some(scan_index) => info!(
                sensor = self.handle.0,
                scan_index, "LiDAR shut down with a scan in flight; it will be discarded"
            ),
            None => info!(sensor = self.handle.0, "LiDAR shut down"),
        }
        evicted
    }
}

impl Drop for LidarSensor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LidarSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LidarSensor")
            .field("handle", &self.handle)
            .field("ray_count", &self.cache.len())
            .field("frequency", &self.config.frequency())
            .field("enabled", &self.trigger.is_enabled())
            .field("state", &self.slot.state())
            .finish()
    }
}

fn lock_sink(sink: &SharedSink) -> std::sync::MutexGuard<'_, Option<Box<dyn PointCloudSink>>> {
    // A consumer that panicked leaves the slot usable for the next one.
    sink.lock().unwrap_or_else(PoisonError::into_inner)
}

// =========================================================================
// == Scan Job ==
// =========================================================================

/// Everything one scan needs, owned by that scan.
///
/// Holding a `ScanJob` keeps the sensor `InFlight`. The per-scan buffers are
/// created inside [`ScanJob::run`] and freed before it returns; dropping the
/// job (or the future returned by `run`) at any point releases the sensor.
pub struct ScanJob {
    sensor: FrameHandle,
    permit: ScanPermit,
    cache: Arc<RayGeometryCache>,
    pose: Isometry3<f64>,
    origin_offset: Vector3<f64>,
    max_range: f64,
    timestamp: f64,
    sink: SharedSink,
}

impl std::fmt::Debug for ScanJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanJob")
            .field("sensor", &self.sensor)
            .field("scan_index", &self.permit.scan_index())
            .field("timestamp", &self.timestamp)
            .field("pose", &self.pose)
            .finish_non_exhaustive()
    }
}

impl ScanJob {
    pub fn scan_index(&self) -> u64 {
        self.permit.scan_index()
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn pose(&self) -> &Isometry3<f64> {
        &self.pose
    }

    /// Runs the full pipeline against `engine`, delivers the cloud to the
    /// registered consumer and returns the sensor to `Idle`. On error the
    /// scan is abandoned; the next eligible tick starts a fresh one.
    pub async fn run<E: GeometryEngine + ?Sized>(mut self, engine: &E) -> Result<ScanReport, ScanError> {
        let result = self.execute(engine).await;
        self.permit.release();

        match &result {
            Ok(report) => debug!(
                sensor = self.sensor.0,
                scan_index = report.scan_index,
                points = report.point_count,
                delivered = report.delivered,
                "scan complete"
            ),
            Err(err) => warn!(
                sensor = self.sensor.0,
                scan_index = self.permit.scan_index(),
                "scan aborted: {err}"
            ),
        }
        result
    }

    async fn execute<E: GeometryEngine + ?Sized>(&self, engine: &E) -> Result<ScanReport, ScanError> {
        let rays = transform_rays(&self.cache, &self.pose, self.max_range)?;
        let hits = intersect_rays(engine, &rays).await?;
        let ray_indices = filter_hits(&hits)?;

        let frame = ProjectionFrame::new(&self.pose, &self.origin_offset, self.max_range);
        let points = project_points(&ray_indices, &hits, self.cache.directions(), &frame)?;

        let cloud = PointCloud {
            sensor: self.sensor,
            scan_index: self.scan_index(),
            timestamp: self.timestamp,
            points,
            ray_indices,
        };
        let delivered = self.deliver(&cloud);

        Ok(ScanReport {
            scan_index: cloud.scan_index,
            timestamp: cloud.timestamp,
            ray_count: rays.len(),
            point_count: cloud.len(),
            delivered,
        })
    }

    fn deliver(&self, cloud: &PointCloud) -> bool {
        // Evicted by teardown: the result has nowhere to go.
        if !self.permit.is_current() {
            return false;
        }
        match lock_sink(&self.sink).as_mut() {
            Some(sink) => {
                sink.on_point_cloud(cloud);
                true
            }
            None => false,
        }
    }
}
