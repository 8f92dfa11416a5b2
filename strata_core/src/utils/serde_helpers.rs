// strata_core/src/utils/serde_helpers.rs

//! `#[serde(with = ...)]` adapters for the sensor configuration document.
//! Vectors are accepted either as `[x, y, z]` arrays or as `{ "x": .., "y": .., "z": .. }`
//! objects (the layout older exporters write), and are always written back as arrays.

use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum Vec3Repr {
    Array([f64; 3]),
    Object { x: f64, y: f64, z: f64 },
}

impl Vec3Repr {
    fn into_array(self) -> [f64; 3] {
        match self {
            Vec3Repr::Array(arr) => arr,
            Vec3Repr::Object { x, y, z } => [x, y, z],
        }
    }
}

pub mod vec3 {
    use super::Vec3Repr;
    use nalgebra::Vector3;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(vec: &Vector3<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq([vec.x, vec.y, vec.z].iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vector3<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let arr = Vec3Repr::deserialize(deserializer)?.into_array();
        Ok(Vector3::new(arr[0], arr[1], arr[2]))
    }
}

pub mod quat_from_euler_deg {
    use super::Vec3Repr;
    use nalgebra::UnitQuaternion;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(quat: &UnitQuaternion<f64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (roll, pitch, yaw) = quat.euler_angles();
        let arr = [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()];
        serializer.collect_seq(arr.iter())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UnitQuaternion<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        // [roll, pitch, yaw] in degrees
        let arr = Vec3Repr::deserialize(deserializer)?.into_array();
        Ok(UnitQuaternion::from_euler_angles(
            arr[0].to_radians(),
            arr[1].to_radians(),
            arr[2].to_radians(),
        ))
    }
}
