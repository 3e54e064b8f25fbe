//! Configuration surface and output records

use crate::math::DEG_TO_RAD;
use nalgebra::ComplexField;

/// Accelerometer full-scale range
///
/// Each selector maps to a fixed resolution of `range / 32768` g per LSB.
///
/// # Example
/// ```
/// use sentral_fusion::AccelScale;
///
/// assert_eq!(AccelScale::G4.resolution(), 4.0 / 32768.0);
/// assert_eq!(AccelScale::G4.register_bits(), 0x08);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccelScale {
    /// ±2 g
    #[default]
    G2 = 0,
    /// ±4 g
    G4 = 1,
    /// ±8 g
    G8 = 2,
    /// ±16 g
    G16 = 3,
}

impl AccelScale {
    /// Full-scale range in g
    pub const fn range(self) -> u16 {
        match self {
            Self::G2 => 2,
            Self::G4 => 4,
            Self::G8 => 8,
            Self::G16 => 16,
        }
    }

    /// Resolution in g per LSB
    pub fn resolution(self) -> f32 {
        f32::from(self.range()) / 32768.0
    }

    /// Sensitivity in LSB per g
    pub const fn sensitivity(self) -> i32 {
        32768 / self.range() as i32
    }

    /// Two-bit selector code
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Value of the `ACCEL_CONFIG` full-scale field (bits 4:3)
    pub const fn register_bits(self) -> u8 {
        self.code() << 3
    }
}

/// Gyroscope full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GyroScale {
    /// ±250 deg/s
    #[default]
    Dps250 = 0,
    /// ±500 deg/s
    Dps500 = 1,
    /// ±1000 deg/s
    Dps1000 = 2,
    /// ±2000 deg/s
    Dps2000 = 3,
}

impl GyroScale {
    /// Full-scale range in deg/s
    pub const fn range(self) -> u16 {
        match self {
            Self::Dps250 => 250,
            Self::Dps500 => 500,
            Self::Dps1000 => 1000,
            Self::Dps2000 => 2000,
        }
    }

    /// Resolution in deg/s per LSB
    pub fn resolution(self) -> f32 {
        f32::from(self.range()) / 32768.0
    }

    /// Sensitivity in LSB per deg/s (truncated, 131 at ±250 deg/s)
    pub const fn sensitivity(self) -> i32 {
        32768 / self.range() as i32
    }

    /// Two-bit selector code
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Value of the `GYRO_CONFIG` full-scale field (bits 4:3)
    pub const fn register_bits(self) -> u8 {
        self.code() << 3
    }
}

/// Magnetometer output bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MagScale {
    /// 14-bit output, 0.6 mG per LSB
    Bits14 = 0,
    /// 16-bit output, 0.15 mG per LSB
    #[default]
    Bits16 = 1,
}

impl MagScale {
    /// Resolution in milligauss per LSB
    pub fn resolution(self) -> f32 {
        match self {
            Self::Bits14 => 10.0 * 4912.0 / 8190.0,
            Self::Bits16 => 10.0 * 4912.0 / 32760.0,
        }
    }

    /// Value of the `CNTL` bit-depth field (bit 4)
    pub const fn register_bits(self) -> u8 {
        (self as u8) << 4
    }
}

/// Magnetometer continuous measurement rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagRate {
    /// Continuous mode 1, 8 Hz
    #[default]
    Hz8 = 0x02,
    /// Continuous mode 2, 100 Hz
    Hz100 = 0x06,
}

impl MagRate {
    /// Value of the `CNTL` mode field (bits 3:0)
    pub const fn register_bits(self) -> u8 {
        self as u8
    }
}

/// Sensor axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// X axis
    X = 0,
    /// Y axis
    Y = 1,
    /// Z axis
    #[default]
    Z = 2,
}

impl Axis {
    /// Array index of the axis
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Gradient-descent (Madgwick) filter settings
///
/// The filter gains are derived from the expected gyroscope error, as in
/// Madgwick's report: `beta = sqrt(3/4) * error` and `zeta = sqrt(3/4) * drift`.
///
/// # Example
/// ```
/// use sentral_fusion::MadgwickSettings;
///
/// let settings = MadgwickSettings {
///     gyro_measurement_error: 2.7, // deg/s, slow but accurate
///     ..Default::default()
/// };
/// assert!((settings.beta() - 0.0408).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MadgwickSettings {
    /// Gyroscope measurement error in deg/s
    ///
    /// Larger values converge faster at the expense of noise.
    pub gyro_measurement_error: f32,
    /// Gyroscope measurement drift in deg/s²
    ///
    /// Zero disables gyroscope bias estimation.
    pub gyro_measurement_drift: f32,
}

impl MadgwickSettings {
    /// Error-drift gain in rad/s
    pub fn beta(&self) -> f32 {
        ComplexField::sqrt(0.75_f32) * self.gyro_measurement_error * DEG_TO_RAD
    }

    /// Bias-drift gain in rad/s²
    pub fn zeta(&self) -> f32 {
        ComplexField::sqrt(0.75_f32) * self.gyro_measurement_drift * DEG_TO_RAD
    }
}

impl Default for MadgwickSettings {
    fn default() -> Self {
        Self {
            gyro_measurement_error: 40.0,
            gyro_measurement_drift: 0.0,
        }
    }
}

/// Proportional-integral (Mahony) filter settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MahonySettings {
    /// Proportional gain
    pub kp: f32,
    /// Integral gain, zero disables integral feedback
    pub ki: f32,
}

impl Default for MahonySettings {
    fn default() -> Self {
        Self { kp: 10.0, ki: 0.0 }
    }
}

/// Bound on the parameter-transfer acknowledge poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AckPolicy {
    /// Maximum number of acknowledge register reads before giving up
    pub max_polls: u32,
}

impl Default for AckPolicy {
    fn default() -> Self {
        Self { max_polls: 1000 }
    }
}

/// Calibration procedure settings
///
/// # Example
/// ```
/// use sentral_fusion::{CalibrationSettings, MagRate};
///
/// // 100 Hz magnetometer: more samples, shorter interval
/// let settings = CalibrationSettings {
///     mag_samples: 1500,
///     mag_sample_interval_ms: 12,
///     ..CalibrationSettings::for_mag_rate(MagRate::Hz100)
/// };
/// assert_eq!(settings.mag_max_attempts, 6000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationSettings {
    /// Time the hardware FIFO is left filling at 1 kHz
    pub fifo_fill_ms: u32,
    /// Minimum number of accel+gyro packets a bias batch must contain
    pub min_packets: usize,
    /// Axis that points along gravity while the board rests
    pub gravity_axis: Axis,
    /// Number of valid magnetometer readings to collect
    pub mag_samples: usize,
    /// Pause between magnetometer reads
    pub mag_sample_interval_ms: u32,
    /// Read attempts allowed before the sweep is declared incomplete
    pub mag_max_attempts: usize,
    /// Samples averaged per self-test phase
    pub self_test_samples: usize,
}

impl CalibrationSettings {
    /// Defaults matched to a magnetometer output rate
    pub const fn for_mag_rate(rate: MagRate) -> Self {
        let (mag_samples, mag_sample_interval_ms) = match rate {
            MagRate::Hz8 => (128, 135),
            MagRate::Hz100 => (1500, 12),
        };
        Self {
            fifo_fill_ms: 40,
            min_packets: 40,
            gravity_axis: Axis::Z,
            mag_samples,
            mag_sample_interval_ms,
            mag_max_attempts: mag_samples * 4,
            self_test_samples: 200,
        }
    }
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self::for_mag_rate(MagRate::Hz8)
    }
}

/// Pose output record
///
/// Consumed by display, logging and telemetry collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseRecord {
    /// Sample timestamp in microseconds
    pub timestamp: u32,
    /// Orientation quaternion as `[w, x, y, z]`
    pub quaternion: [f32; 4],
    /// Roll, pitch and yaw in degrees
    pub euler: [f32; 3],
    /// Body angular rate in deg/s
    pub twist: [f32; 3],
}
