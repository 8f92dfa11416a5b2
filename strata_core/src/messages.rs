// strata_core/src/messages.rs

use nalgebra::Point3;

use crate::types::FrameHandle;

// =========================================================================
// == Point Cloud Data Structures ==
// =========================================================================

/// A single LiDAR return.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSample {
    /// The 3D position of the point in the sensor's output frame.
    pub position: Point3<f64>,
    /// Simplified reflectivity proxy in `[0, 1]`; not a calibrated value.
    pub intensity: f64,
}

/// One finished scan.
#[derive(Clone, Debug)]
pub struct PointCloud {
    /// The handle of the sensor that generated this point cloud.
    pub sensor: FrameHandle,
    /// 1-based, in scan start order.
    pub scan_index: u64,
    /// Host time at which the scan started.
    pub timestamp: f64,
    /// Samples in filtered-hit order.
    pub points: Vec<PointSample>,
    /// `ray_indices[k]` is the beam that produced `points[k]`.
    pub ray_indices: Vec<usize>,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Samples paired with the beam index that produced them.
    pub fn iter_with_rays(&self) -> impl Iterator<Item = (usize, &PointSample)> {
        self.ray_indices.iter().copied().zip(&self.points)
    }
}

/// What a completed scan hands back to whoever drove it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanReport {
    pub scan_index: u64,
    pub timestamp: f64,
    pub ray_count: usize,
    pub point_count: usize,
    /// False when no consumer was registered, or the sensor was torn down
    /// while the scan was running.
    pub delivered: bool,
}

// =========================================================================
// == Output Consumer ==
// =========================================================================

/// Receives every finished point cloud, synchronously, before the scan's
/// buffers are released. Implementations must copy anything they want to
/// keep past the call.
pub trait PointCloudSink: Send {
    fn on_point_cloud(&mut self, cloud: &PointCloud);
}

impl<F> PointCloudSink for F
where
    F: FnMut(&PointCloud) + Send,
{
    fn on_point_cloud(&mut self, cloud: &PointCloud) {
        self(cloud)
    }
}
