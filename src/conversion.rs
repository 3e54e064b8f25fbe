//! Raw sample conversion
//!
//! Maps register counts to physical units: g, deg/s and milligauss.

use crate::math::{DEG_TO_RAD, i16x3_from_be, i16x3_from_le};
use crate::types::{AccelScale, GyroScale, MagScale};
use nalgebra::Vector3;

/// One set of raw register counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawSample {
    /// Accelerometer counts X, Y, Z
    pub accel: [i16; 3],
    /// Gyroscope counts X, Y, Z
    pub gyro: [i16; 3],
    /// Magnetometer counts X, Y, Z
    pub mag: [i16; 3],
}

impl RawSample {
    /// Decode MPU9250 accel/gyro data registers (big-endian) and AK8963 data
    /// registers (little-endian)
    pub fn from_registers(accel: &[u8; 6], gyro: &[u8; 6], mag: &[u8; 6]) -> Self {
        Self {
            accel: i16x3_from_be(accel),
            gyro: i16x3_from_be(gyro),
            mag: i16x3_from_le(mag),
        }
    }
}

/// One set of readings in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorSample {
    /// Acceleration in g
    pub accel: Vector3<f32>,
    /// Angular rate in deg/s
    pub gyro: Vector3<f32>,
    /// Magnetic field in milligauss
    pub mag: Vector3<f32>,
}

impl SensorSample {
    /// Angular rate in rad/s, the unit both attitude filters integrate
    pub fn gyro_radians(&self) -> Vector3<f32> {
        self.gyro * DEG_TO_RAD
    }
}

/// Converts raw counts using the configured full-scale selections
///
/// # Example
/// ```
/// use sentral_fusion::{AccelScale, RawSample, SampleConverter};
///
/// let converter = SampleConverter {
///     accel_scale: AccelScale::G4,
///     ..Default::default()
/// };
/// let raw = RawSample { accel: [0, 0, 8192], ..Default::default() };
/// let sample = converter.convert(&raw);
/// assert_eq!(sample.accel.z, 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleConverter {
    /// Accelerometer full scale
    pub accel_scale: AccelScale,
    /// Gyroscope full scale
    pub gyro_scale: GyroScale,
    /// Magnetometer bit depth
    pub mag_scale: MagScale,
    /// Factory sensitivity adjustment per magnetometer axis
    pub mag_adjustment: Vector3<f32>,
}

impl Default for SampleConverter {
    fn default() -> Self {
        Self {
            accel_scale: AccelScale::default(),
            gyro_scale: GyroScale::default(),
            mag_scale: MagScale::default(),
            mag_adjustment: Vector3::repeat(1.0),
        }
    }
}

impl SampleConverter {
    /// Convert all three sensors
    pub fn convert(&self, raw: &RawSample) -> SensorSample {
        SensorSample {
            accel: self.accel(raw.accel),
            gyro: self.gyro(raw.gyro),
            mag: self.mag(raw.mag),
        }
    }

    /// Accelerometer counts to g
    pub fn accel(&self, counts: [i16; 3]) -> Vector3<f32> {
        scale(counts, self.accel_scale.resolution())
    }

    /// Gyroscope counts to deg/s
    pub fn gyro(&self, counts: [i16; 3]) -> Vector3<f32> {
        scale(counts, self.gyro_scale.resolution())
    }

    /// Magnetometer counts to milligauss, including the factory adjustment
    pub fn mag(&self, counts: [i16; 3]) -> Vector3<f32> {
        scale(counts, self.mag_scale.resolution()).component_mul(&self.mag_adjustment)
    }
}

fn scale(counts: [i16; 3], resolution: f32) -> Vector3<f32> {
    Vector3::new(
        f32::from(counts[0]),
        f32::from(counts[1]),
        f32::from(counts[2]),
    ) * resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::ComplexField;

    #[test]
    fn test_full_scale_counts() {
        let converter = SampleConverter {
            gyro_scale: GyroScale::Dps2000,
            ..Default::default()
        };
        let gyro = converter.gyro([i16::MIN, 0, 16384]);
        assert_eq!(gyro.x, -2000.0);
        assert_eq!(gyro.z, 1000.0);
    }

    #[test]
    fn test_mag_adjustment_applied() {
        let converter = SampleConverter {
            mag_scale: MagScale::Bits14,
            mag_adjustment: Vector3::new(1.0, 0.5, 2.0),
            ..Default::default()
        };
        let mag = converter.mag([100, 100, 100]);
        let expected = 100.0 * MagScale::Bits14.resolution();
        assert!((mag.x - expected).abs() < 1e-3);
        assert!((mag.y - expected * 0.5).abs() < 1e-3);
        assert!((mag.z - expected * 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_register_decoding() {
        let raw = RawSample::from_registers(
            &[0x40, 0x00, 0x00, 0x00, 0xC0, 0x00],
            &[0x00, 0x83, 0x00, 0x00, 0x00, 0x00],
            &[0x10, 0x00, 0xF0, 0xFF, 0x00, 0x00],
        );
        assert_eq!(raw.accel, [16384, 0, -16384]);
        assert_eq!(raw.gyro, [131, 0, 0]);
        assert_eq!(raw.mag, [16, -16, 0]);
    }
}
