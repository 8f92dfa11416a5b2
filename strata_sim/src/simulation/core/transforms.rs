// strata_sim/src/simulation/core/transforms.rs

//! Conversions between the robotics ENU frame used by `strata_core`
//! (X east/forward, Y north/left, Z up) and Bevy's Y-up world frame.

use bevy::prelude::{Quat as BevyQuat, Transform as BevyTransform, Vec3 as BevyVec3};
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use std::f64::consts::FRAC_PI_2;

/// Rotation taking ENU basis vectors into Bevy coordinates: ENU +Y (north)
/// lands on Bevy -Z, ENU +Z (up) on Bevy +Y. A -90 degree turn about X.
fn enu_frame_to_bevy_frame() -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2)
}

pub fn enu_vector_to_bevy_vector(enu: &Vector3<f64>) -> BevyVec3 {
    BevyVec3::new(enu.x as f32, enu.z as f32, -enu.y as f32)
}

pub fn bevy_vector_to_enu_vector(bevy: &BevyVec3) -> Vector3<f64> {
    Vector3::new(bevy.x as f64, -bevy.z as f64, bevy.y as f64)
}

/// Re-expresses an object orientation given in ENU in the Bevy frame.
pub fn enu_quat_to_bevy_quat(enu: &UnitQuaternion<f64>) -> BevyQuat {
    let q = enu_frame_to_bevy_frame();
    let r = q * enu * q.inverse();
    BevyQuat::from_xyzw(
        r.coords.x as f32,
        r.coords.y as f32,
        r.coords.z as f32,
        r.coords.w as f32,
    )
}

pub fn bevy_quat_to_enu_quat(bevy: &BevyQuat) -> UnitQuaternion<f64> {
    let r = UnitQuaternion::from_quaternion(Quaternion::new(
        bevy.w as f64,
        bevy.x as f64,
        bevy.y as f64,
        bevy.z as f64,
    ));
    let q = enu_frame_to_bevy_frame();
    q.inverse() * r * q
}

pub fn enu_pose_to_transform(pose: &Isometry3<f64>) -> BevyTransform {
    BevyTransform {
        translation: enu_vector_to_bevy_vector(&pose.translation.vector),
        rotation: enu_quat_to_bevy_quat(&pose.rotation),
        ..Default::default()
    }
}

/// The sensor pose handed to `LidarSensor::tick`. Scale is ignored.
pub fn transform_to_enu_pose(transform: &BevyTransform) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::from(bevy_vector_to_enu_vector(&transform.translation)),
        bevy_quat_to_enu_quat(&transform.rotation),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn enu_axes_map_onto_bevy_axes() {
        let east = enu_vector_to_bevy_vector(&Vector3::x());
        let north = enu_vector_to_bevy_vector(&Vector3::y());
        let up = enu_vector_to_bevy_vector(&Vector3::z());
        assert_eq!(east, BevyVec3::X);
        assert_eq!(north, -BevyVec3::Z);
        assert_eq!(up, BevyVec3::Y);
    }

    #[test]
    fn yaw_about_up_survives_the_round_trip() {
        let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.7);
        let pose = Isometry3::from_parts(Translation3::new(1.0, 2.0, 3.0), yaw);

        let transform = enu_pose_to_transform(&pose);
        // ENU yaw is a rotation about Bevy's +Y.
        let (axis, angle) = transform.rotation.to_axis_angle();
        assert_relative_eq!(angle, 0.7, epsilon = 1e-5);
        assert_relative_eq!(axis.y, 1.0, epsilon = 1e-5);

        let back = transform_to_enu_pose(&transform);
        assert_relative_eq!(back.translation.vector, pose.translation.vector, epsilon = 1e-5);
        assert_relative_eq!(back.rotation.angle_to(&pose.rotation), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn rotated_forward_vector_agrees_in_both_frames() {
        let enu_rot = UnitQuaternion::from_euler_angles(0.1, -0.3, 1.2);
        let forward_enu = enu_rot * Vector3::x();
        let forward_bevy = enu_quat_to_bevy_quat(&enu_rot) * BevyVec3::X;
        let expected = enu_vector_to_bevy_vector(&forward_enu);
        assert!((forward_bevy - expected).length() < 1e-5);
    }
}
