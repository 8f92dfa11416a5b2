// strata_core/src/pipeline/project.rs

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use rayon::prelude::*;

use super::RAY_BATCH_SIZE;
use crate::error::{try_buffer, ResourceError};
use crate::messages::PointSample;
use crate::types::HitRecord;

/// The output frame of one scan: where the point cloud origin sat in the
/// world when the scan started, and how to rotate world vectors into it.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionFrame {
    /// Sensor position plus the configured origin offset (the offset is not rotated).
    pub origin: Point3<f64>,
    /// Inverse of the sensor orientation.
    pub inverse_rotation: UnitQuaternion<f64>,
    pub max_range: f64,
}

impl ProjectionFrame {
    pub fn new(pose: &Isometry3<f64>, origin_offset: &Vector3<f64>, max_range: f64) -> Self {
        Self {
            origin: Point3::from(pose.translation.vector + origin_offset),
            inverse_rotation: pose.rotation.inverse(),
            max_range,
        }
    }

    /// Expresses a world-space hit in the output frame and estimates its intensity.
    ///
    /// Intensity is `|normal . beam_direction| * (1 - range / max_range)`,
    /// clamped to `[0, 1]`. `beam_direction` is the cached sensor-frame
    /// direction of the beam, not the world ray, so the incidence term
    /// depends on the sensor's orientation.
    pub fn project(&self, hit: &HitRecord, beam_direction: &Vector3<f64>) -> PointSample {
        let position = Point3::from(self.inverse_rotation * (hit.point - self.origin));
        let incidence = hit.normal.dot(beam_direction).abs();
        let falloff = 1.0 - position.coords.norm() / self.max_range;
        PointSample {
            position,
            intensity: (incidence * falloff).clamp(0.0, 1.0),
        }
    }
}

/// Projects the filtered hits into point samples, one per entry of
/// `indices` and in the same order. `beam_directions` is the geometry
/// cache's direction array, indexed like `hits`.
pub fn project_points(
    indices: &[usize],
    hits: &[HitRecord],
    beam_directions: &[Vector3<f64>],
    frame: &ProjectionFrame,
) -> Result<Vec<PointSample>, ResourceError> {
    let mut points = try_buffer("point sample", indices.len())?;
    points.par_extend(
        indices
            .par_iter()
            .with_min_len(RAY_BATCH_SIZE)
            .map(|&ray_index| frame.project(&hits[ray_index], &beam_directions[ray_index])),
    );
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use nalgebra::Translation3;
    use std::f64::consts::FRAC_PI_2;

    fn head_on(distance: f64, direction: Vector3<f64>) -> HitRecord {
        HitRecord {
            point: Point3::from(direction * distance),
            normal: -direction,
            distance,
        }
    }

    #[test]
    fn head_on_hit_intensity_falls_with_range() {
        let frame = ProjectionFrame::new(&Isometry3::identity(), &Vector3::zeros(), 50.0);
        let dir = Vector3::x();

        let near = frame.project(&head_on(10.0, dir), &dir);
        assert_relative_eq!(near.intensity, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(near.position, Point3::new(10.0, 0.0, 0.0), epsilon = 1e-12);

        // At max range the falloff term is exactly zero.
        let edge = frame.project(&head_on(50.0, dir), &dir);
        assert_abs_diff_eq!(edge.intensity, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn intensity_stays_in_unit_interval() {
        let frame = ProjectionFrame::new(&Isometry3::identity(), &Vector3::zeros(), 50.0);
        let dir = Vector3::new(1.0, 1.0, 0.0).normalize();
        for step in 1..=100 {
            let distance = step as f64 * 0.5;
            // Normals from head-on to grazing, including ones facing away.
            for normal in [-dir, dir, Vector3::z(), Vector3::new(-1.0, 0.0, 0.0)] {
                let hit = HitRecord {
                    point: Point3::from(dir * distance),
                    normal,
                    distance,
                };
                let sample = frame.project(&hit, &dir);
                assert!((0.0..=1.0).contains(&sample.intensity), "{sample:?}");
            }
        }

        // Beyond max range the raw formula goes negative; the clamp holds it at zero.
        let far = frame.project(&head_on(60.0, dir), &dir);
        assert_eq!(far.intensity, 0.0);
    }

    #[test]
    fn output_frame_removes_pose_and_offset() {
        let pose = Isometry3::from_parts(
            Translation3::new(5.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let offset = Vector3::new(0.0, 0.0, 1.0);
        let frame = ProjectionFrame::new(&pose, &offset, 50.0);

        // Straight ahead of a sensor yawed to +Y, level with the output origin.
        let hit = HitRecord {
            point: Point3::new(5.0, 4.0, 1.0),
            normal: -Vector3::y(),
            distance: 4.0,
        };
        let sample = frame.project(&hit, &Vector3::x());
        assert_abs_diff_eq!(sample.position, Point3::new(4.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn incidence_uses_the_sensor_frame_beam_direction() {
        let pose = Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let frame = ProjectionFrame::new(&pose, &Vector3::zeros(), 50.0);

        // Beam +X in the sensor frame travels along world +Y and meets a
        // wall facing back along -Y. The cached direction is perpendicular
        // to that normal, so the return is dark.
        let hit = HitRecord {
            point: Point3::new(0.0, 10.0, 0.0),
            normal: -Vector3::y(),
            distance: 10.0,
        };
        let yawed = frame.project(&hit, &Vector3::x());
        assert_abs_diff_eq!(yawed.intensity, 0.0, epsilon = 1e-12);

        // A beam whose cached direction is +Y sees the same wall head-on.
        let aligned = frame.project(&hit, &Vector3::y());
        assert_relative_eq!(aligned.intensity, 0.8, epsilon = 1e-12);
    }

    #[test]
    fn output_follows_index_list_order() {
        let dirs = [Vector3::x(), Vector3::y(), -Vector3::x()];
        let hits: Vec<HitRecord> = dirs
            .iter()
            .enumerate()
            .map(|(i, d)| head_on(1.0 + i as f64, *d))
            .collect();
        let frame = ProjectionFrame::new(&Isometry3::identity(), &Vector3::zeros(), 50.0);

        let points = project_points(&[2, 0], &hits, &dirs, &frame).unwrap();
        assert_eq!(points.len(), 2);
        assert_abs_diff_eq!(points[0].position, Point3::new(-3.0, 0.0, 0.0), epsilon = 1e-12);
        assert_abs_diff_eq!(points[1].position, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }
}
