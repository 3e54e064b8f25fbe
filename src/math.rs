//! Mathematical utilities and nalgebra extensions

use nalgebra::{UnitQuaternion, Vector3};

/// Mathematical constants
pub const DEG_TO_RAD: f32 = core::f32::consts::PI / 180.0;
pub const RAD_TO_DEG: f32 = 180.0 / core::f32::consts::PI;

/// Extension trait for Vector3 operations
pub trait Vector3Ext {
    /// Normalize the vector, returning `None` if the magnitude is zero
    fn try_unit(&self) -> Option<Vector3<f32>>;

    /// Convert degrees to radians
    fn deg_to_rad(&self) -> Vector3<f32>;

    /// Convert radians to degrees
    fn rad_to_deg(&self) -> Vector3<f32>;

    /// Components as a plain array
    fn to_array(&self) -> [f32; 3];
}

impl Vector3Ext for Vector3<f32> {
    fn try_unit(&self) -> Option<Vector3<f32>> {
        let norm = self.norm();
        if norm > 0.0 && norm.is_finite() {
            Some(*self / norm)
        } else {
            None
        }
    }

    fn deg_to_rad(&self) -> Vector3<f32> {
        *self * DEG_TO_RAD
    }

    fn rad_to_deg(&self) -> Vector3<f32> {
        *self * RAD_TO_DEG
    }

    fn to_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// Extension trait for UnitQuaternion operations
pub trait QuaternionExt {
    /// Convert quaternion to Euler angles (roll, pitch, yaw) in degrees
    fn to_euler_degrees(&self) -> Vector3<f32>;

    /// Create quaternion from Euler angles in degrees
    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32>;

    /// Components as `[w, x, y, z]`
    fn to_wxyz(&self) -> [f32; 4];
}

impl QuaternionExt for UnitQuaternion<f32> {
    fn to_euler_degrees(&self) -> Vector3<f32> {
        let (roll, pitch, yaw) = self.euler_angles();
        Vector3::new(roll, pitch, yaw).rad_to_deg()
    }

    fn from_euler_degrees(roll: f32, pitch: f32, yaw: f32) -> UnitQuaternion<f32> {
        let euler_rad = Vector3::new(roll, pitch, yaw).deg_to_rad();
        UnitQuaternion::from_euler_angles(euler_rad.x, euler_rad.y, euler_rad.z)
    }

    fn to_wxyz(&self) -> [f32; 4] {
        [self.w, self.i, self.j, self.k]
    }
}

/// Signed 16-bit triplet stored most-significant byte first
pub fn i16x3_from_be(bytes: &[u8]) -> [i16; 3] {
    [
        i16::from_be_bytes([bytes[0], bytes[1]]),
        i16::from_be_bytes([bytes[2], bytes[3]]),
        i16::from_be_bytes([bytes[4], bytes[5]]),
    ]
}

/// Signed 16-bit triplet stored least-significant byte first
pub fn i16x3_from_le(bytes: &[u8]) -> [i16; 3] {
    [
        i16::from_le_bytes([bytes[0], bytes[1]]),
        i16::from_le_bytes([bytes[2], bytes[3]]),
        i16::from_le_bytes([bytes[4], bytes[5]]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::ComplexField;

    #[test]
    fn test_vector_extensions() {
        let v = Vector3::new(3.0f32, 4.0, 0.0);
        let unit = v.try_unit().unwrap();
        assert!((unit.norm() - 1.0).abs() < 1e-6);
        assert!(Vector3::<f32>::zeros().try_unit().is_none());
    }

    #[test]
    fn test_quaternion_euler_conversion() {
        let euler = Vector3::new(30.0, 45.0, 60.0);
        let quat = UnitQuaternion::from_euler_degrees(euler.x, euler.y, euler.z);
        let recovered = quat.to_euler_degrees();

        // Allow for some numerical precision loss
        assert!((euler - recovered).norm() < 1e-3);
    }

    #[test]
    fn test_byte_order_decoding() {
        let bytes = [0x01, 0x02, 0xFF, 0xFE, 0x80, 0x00];
        assert_eq!(i16x3_from_be(&bytes), [0x0102, -2, i16::MIN]);
        assert_eq!(i16x3_from_le(&bytes), [0x0201, -257, 0x0080]);
    }
}
