//! Sensor calibration math
//!
//! The arithmetic half of the calibration engine: batch bias averaging,
//! hardware trim encoding, magnetometer extrema tracking and self-test
//! scoring. The register sequences that feed these live in
//! [`mpu9250`](crate::mpu9250).

use crate::conversion::SensorSample;
use crate::error::CalibrationError;
use crate::math::i16x3_from_be;
use crate::types::Axis;
use nalgebra::{ComplexField, Vector3};

/// Conventional self-test acceptance window in percent
///
/// Not enforced by this crate; see [`SelfTestReport::passes`].
pub const SELF_TEST_TOLERANCE_PERCENT: f32 = 14.0;

/// Accumulated corrections for all three sensors
///
/// Apply with [`CalibrationResult::apply`] before samples reach a filter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationResult {
    /// Gyroscope bias in deg/s
    pub gyro_bias: Vector3<f32>,
    /// Accelerometer bias in g, corrected on the host only
    pub accel_bias: Vector3<f32>,
    /// Magnetometer hard-iron offset in milligauss
    pub mag_hard_iron: Vector3<f32>,
    /// Magnetometer soft-iron scale per axis (dimensionless)
    pub mag_soft_iron_scale: Vector3<f32>,
    /// The gyroscope bias was written to the hardware trim registers, so raw
    /// gyroscope samples are already corrected
    pub gyro_bias_in_hardware: bool,
}

impl Default for CalibrationResult {
    fn default() -> Self {
        Self {
            gyro_bias: Vector3::zeros(),
            accel_bias: Vector3::zeros(),
            mag_hard_iron: Vector3::zeros(),
            mag_soft_iron_scale: Vector3::repeat(1.0),
            gyro_bias_in_hardware: false,
        }
    }
}

impl CalibrationResult {
    /// Adopt the hard-iron and soft-iron correction of a magnetometer sweep
    pub fn with_magnetometer(self, magnetometer: &MagCalibration) -> Self {
        Self {
            mag_hard_iron: magnetometer.hard_iron,
            mag_soft_iron_scale: magnetometer.soft_iron_scale,
            ..self
        }
    }

    /// Correct a converted sample
    ///
    /// # Example
    /// ```
    /// use nalgebra::Vector3;
    /// use sentral_fusion::{CalibrationResult, SensorSample};
    ///
    /// let calibration = CalibrationResult {
    ///     accel_bias: Vector3::new(0.0, 0.0, 0.02),
    ///     mag_hard_iron: Vector3::new(100.0, 0.0, 0.0),
    ///     ..Default::default()
    /// };
    /// let sample = SensorSample {
    ///     accel: Vector3::new(0.0, 0.0, 1.02),
    ///     gyro: Vector3::zeros(),
    ///     mag: Vector3::new(300.0, 0.0, 0.0),
    /// };
    /// let corrected = calibration.apply(&sample);
    /// assert!((corrected.accel.z - 1.0).abs() < 1e-6);
    /// assert_eq!(corrected.mag.x, 200.0);
    /// ```
    pub fn apply(&self, sample: &SensorSample) -> SensorSample {
        let gyro = if self.gyro_bias_in_hardware {
            sample.gyro
        } else {
            sample.gyro - self.gyro_bias
        };

        SensorSample {
            accel: sample.accel - self.accel_bias,
            gyro,
            mag: correct_magnetic(sample.mag, self.mag_hard_iron, self.mag_soft_iron_scale),
        }
    }
}

/// Applies magnetometer hard-iron and soft-iron correction
///
/// `soft_iron_scale ⊙ (uncalibrated - hard_iron)`
pub fn correct_magnetic(
    uncalibrated: Vector3<f32>,
    hard_iron: Vector3<f32>,
    soft_iron_scale: Vector3<f32>,
) -> Vector3<f32> {
    (uncalibrated - hard_iron).component_mul(&soft_iron_scale)
}

/// Mean accel and gyro offsets of a stationary batch, in raw counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InertialBias {
    /// Accelerometer bias with gravity removed from the vertical axis
    pub accel: [i32; 3],
    /// Gyroscope bias
    pub gyro: [i32; 3],
}

impl InertialBias {
    /// Accelerometer bias in g given the LSB-per-g sensitivity of the batch
    pub fn accel_g(&self, sensitivity: i32) -> Vector3<f32> {
        counts_to_units(self.accel, sensitivity)
    }

    /// Gyroscope bias in deg/s given the LSB-per-deg/s sensitivity of the batch
    pub fn gyro_dps(&self, sensitivity: i32) -> Vector3<f32> {
        counts_to_units(self.gyro, sensitivity)
    }
}

#[allow(clippy::cast_precision_loss)]
fn counts_to_units(counts: [i32; 3], sensitivity: i32) -> Vector3<f32> {
    let sensitivity = sensitivity as f32;
    Vector3::new(
        counts[0] as f32 / sensitivity,
        counts[1] as f32 / sensitivity,
        counts[2] as f32 / sensitivity,
    )
}

/// Sums a batch of stationary accel+gyro samples
///
/// Sums are 32-bit, which holds more samples than any hardware FIFO batch.
///
/// # Example
/// ```
/// use sentral_fusion::{Axis, BiasAccumulator};
///
/// let mut batch = BiasAccumulator::new();
/// for _ in 0..40 {
///     batch.push([10, -4, 16384 + 30], [-12, 7, 3]);
/// }
/// let bias = batch.finish(40, Axis::Z, 16384).unwrap();
/// assert_eq!(bias.accel, [10, -4, 30]);
/// assert_eq!(bias.gyro, [-12, 7, 3]);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BiasAccumulator {
    accel_sum: [i32; 3],
    gyro_sum: [i32; 3],
    count: usize,
}

impl BiasAccumulator {
    /// Empty batch
    pub const fn new() -> Self {
        Self {
            accel_sum: [0; 3],
            gyro_sum: [0; 3],
            count: 0,
        }
    }

    /// Add one sample
    pub fn push(&mut self, accel: [i16; 3], gyro: [i16; 3]) {
        for axis in 0..3 {
            self.accel_sum[axis] += i32::from(accel[axis]);
            self.gyro_sum[axis] += i32::from(gyro[axis]);
        }
        self.count += 1;
    }

    /// Add one FIFO packet: big-endian accel X/Y/Z then gyro X/Y/Z
    pub fn push_fifo_packet(&mut self, packet: &[u8; 12]) {
        self.push(i16x3_from_be(&packet[..6]), i16x3_from_be(&packet[6..]));
    }

    /// Number of samples collected
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Mean offsets of the batch
    ///
    /// The accelerometer reads one g on `gravity_axis` while at rest; that
    /// g is removed with the sign the batch actually shows.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationError::Incomplete`] if fewer than `required`
    /// samples (or none at all) were collected.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn finish(
        &self,
        required: usize,
        gravity_axis: Axis,
        accel_sensitivity: i32,
    ) -> Result<InertialBias, CalibrationError> {
        if self.count == 0 || self.count < required {
            return Err(CalibrationError::Incomplete {
                required: required.max(1),
                collected: self.count,
            });
        }

        let count = self.count as i32;
        let mut accel = self.accel_sum.map(|sum| sum / count);
        let gyro = self.gyro_sum.map(|sum| sum / count);

        let vertical = &mut accel[gravity_axis.index()];
        if *vertical > 0 {
            *vertical -= accel_sensitivity;
        } else {
            *vertical += accel_sensitivity;
        }

        Ok(InertialBias { accel, gyro })
    }
}

/// Gyro trim register bytes (X_H, X_L, Y_H, Y_L, Z_H, Z_L) for a bias
/// measured at ±250 deg/s
///
/// Trim registers are additive at 32.8 LSB per deg/s, so the bias is negated
/// and quartered.
pub fn gyro_trim_registers(gyro_bias: [i32; 3]) -> [u8; 6] {
    let mut registers = [0u8; 6];
    for (axis, bias) in gyro_bias.iter().enumerate() {
        let trim = -bias / 4;
        registers[2 * axis] = (trim >> 8) as u8;
        registers[2 * axis + 1] = trim as u8;
    }
    registers
}

/// Accel trim register bytes combining the factory trim with a bias
/// measured at ±2 g
///
/// Trim registers hold 2048 LSB per g, so the bias is divided by eight. Bit 0
/// of each low byte belongs to temperature compensation and is carried over
/// from the factory value.
pub fn accel_trim_registers(factory_trim: [i16; 3], accel_bias: [i32; 3]) -> [u8; 6] {
    let mut registers = [0u8; 6];
    for axis in 0..3 {
        let factory = i32::from(factory_trim[axis]);
        let temperature_bit = (factory & 0x01) as u8;
        let trim = factory - accel_bias[axis] / 8;
        registers[2 * axis] = (trim >> 8) as u8;
        registers[2 * axis + 1] = (trim as u8 & 0xFE) | temperature_bit;
    }
    registers
}

/// Magnetometer hard-iron and soft-iron correction
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MagCalibration {
    /// Hard-iron offset in raw counts
    pub hard_iron_counts: [i32; 3],
    /// Hard-iron offset in milligauss
    pub hard_iron: Vector3<f32>,
    /// Soft-iron scale per axis
    pub soft_iron_scale: Vector3<f32>,
}

/// Running per-axis extrema of a magnetometer rotation sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagExtrema {
    min: [i16; 3],
    max: [i16; 3],
    count: usize,
}

impl Default for MagExtrema {
    fn default() -> Self {
        Self::new()
    }
}

impl MagExtrema {
    /// No samples seen
    pub const fn new() -> Self {
        Self {
            min: [i16::MAX; 3],
            max: [i16::MIN; 3],
            count: 0,
        }
    }

    /// Track one reading
    pub fn observe(&mut self, counts: [i16; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(counts[axis]);
            self.max[axis] = self.max[axis].max(counts[axis]);
        }
        self.count += 1;
    }

    /// Number of readings tracked
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Smallest reading per axis
    pub const fn min(&self) -> [i16; 3] {
        self.min
    }

    /// Largest reading per axis
    pub const fn max(&self) -> [i16; 3] {
        self.max
    }

    /// Hard-iron and soft-iron correction from the sweep
    ///
    /// Hard iron is the per-axis midpoint `(max + min) / 2`. Soft iron scales
    /// each axis half-chord `(max - min) / 2` to the mean of all three.
    ///
    /// # Errors
    ///
    /// [`CalibrationError::Incomplete`] with fewer than `required` readings,
    /// [`CalibrationError::NoRotation`] if an axis never changed.
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(
        &self,
        required: usize,
        resolution: f32,
        adjustment: Vector3<f32>,
    ) -> Result<MagCalibration, CalibrationError> {
        if self.count == 0 || self.count < required {
            return Err(CalibrationError::Incomplete {
                required: required.max(1),
                collected: self.count,
            });
        }

        let mut hard_iron_counts = [0i32; 3];
        let mut half_chord = [0i32; 3];
        for axis in 0..3 {
            let max = i32::from(self.max[axis]);
            let min = i32::from(self.min[axis]);
            hard_iron_counts[axis] = (max + min) / 2;
            half_chord[axis] = (max - min) / 2;
            if half_chord[axis] == 0 {
                return Err(CalibrationError::NoRotation { axis });
            }
        }

        let average_radius = half_chord.iter().sum::<i32>() as f32 / 3.0;
        let hard_iron = Vector3::new(
            hard_iron_counts[0] as f32,
            hard_iron_counts[1] as f32,
            hard_iron_counts[2] as f32,
        ) * resolution;

        Ok(MagCalibration {
            hard_iron_counts,
            hard_iron: hard_iron.component_mul(&adjustment),
            soft_iron_scale: Vector3::new(
                average_radius / half_chord[0] as f32,
                average_radius / half_chord[1] as f32,
                average_radius / half_chord[2] as f32,
            ),
        })
    }
}

/// Factory self-test reference for one axis
///
/// `(2620 >> full_scale_code) * 1.01^(code - 1)`, where `code` is the
/// self-test byte stored on the chip.
pub fn factory_trim(code: u8, full_scale_code: u8) -> f32 {
    let base = f32::from(2620u16 >> full_scale_code);
    base * ComplexField::powf(1.01_f32, f32::from(code) - 1.0)
}

/// Mean accel and gyro readings over one self-test phase, in counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SelfTestAverages {
    /// Accelerometer X, Y, Z
    pub accel: [i32; 3],
    /// Gyroscope X, Y, Z
    pub gyro: [i32; 3],
}

/// Self-test response relative to factory trim
///
/// Each entry is `100 * (excited - normal) / factory_trim`, so a healthy
/// axis reports close to 100 %.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelfTestReport {
    /// Accelerometer X, Y, Z response in percent of factory trim
    pub accel: [f32; 3],
    /// Gyroscope X, Y, Z response in percent of factory trim
    pub gyro: [f32; 3],
}

impl SelfTestReport {
    /// Score a self-test run
    ///
    /// `codes` holds the stored self-test bytes for accel X/Y/Z then gyro X/Y/Z.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_averages(
        normal: &SelfTestAverages,
        excited: &SelfTestAverages,
        codes: [u8; 6],
        full_scale_code: u8,
    ) -> Self {
        let response = |excited: i32, normal: i32, code: u8| {
            100.0 * (excited - normal) as f32 / factory_trim(code, full_scale_code)
        };

        let mut report = Self {
            accel: [0.0; 3],
            gyro: [0.0; 3],
        };
        for axis in 0..3 {
            report.accel[axis] = response(excited.accel[axis], normal.accel[axis], codes[axis]);
            report.gyro[axis] = response(excited.gyro[axis], normal.gyro[axis], codes[axis + 3]);
        }
        report
    }

    /// All six responses, accel X/Y/Z then gyro X/Y/Z
    pub fn percentages(&self) -> [f32; 6] {
        [
            self.accel[0],
            self.accel[1],
            self.accel[2],
            self.gyro[0],
            self.gyro[1],
            self.gyro[2],
        ]
    }

    /// Whether every response lies within `tolerance_percent` of the factory
    /// trim (100 %)
    pub fn passes(&self, tolerance_percent: f32) -> bool {
        self.percentages()
            .iter()
            .all(|pct| (pct - 100.0).abs() <= tolerance_percent)
    }
}
