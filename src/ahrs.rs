//! Sample pipeline from raw counts to pose records

use crate::calibration::CalibrationResult;
use crate::conversion::{RawSample, SampleConverter, SensorSample};
use crate::filter::{AttitudeFilter, FilterUpdate};
use crate::math::{QuaternionExt, Vector3Ext};
use crate::types::PoseRecord;
use nalgebra::{UnitQuaternion, Vector3};

/// Microseconds to seconds
const MICROS_TO_SECONDS: f32 = 1.0e-6;

/// Attitude and heading reference pipeline
///
/// Converts raw counts, applies calibration, derives the elapsed interval
/// from sample timestamps and runs the chosen [`AttitudeFilter`].
///
/// # Example
/// ```
/// use sentral_fusion::{Ahrs, MahonyFilter, RawSample};
///
/// let mut ahrs = Ahrs::new(MahonyFilter::new());
/// let raw = RawSample {
///     accel: [0, 0, 16384],
///     gyro: [0, 0, 0],
///     mag: [2000, 0, -3000],
/// };
///
/// ahrs.update_raw(&raw, 0);
/// ahrs.update_raw(&raw, 10_000);
///
/// let pose = ahrs.pose();
/// assert_eq!(pose.timestamp, 10_000);
/// ```
pub struct Ahrs<F> {
    filter: F,
    converter: SampleConverter,
    calibration: CalibrationResult,
    last_timestamp: Option<u32>,
    /// Last calibrated accelerometer reading for linear acceleration
    accelerometer: Vector3<f32>,
    /// Last calibrated gyroscope reading in deg/s
    gyroscope: Vector3<f32>,
}

impl<F: AttitudeFilter> Ahrs<F> {
    /// Pipeline with default scales and no calibration
    pub fn new(filter: F) -> Self {
        Self::with_config(filter, SampleConverter::default(), CalibrationResult::default())
    }

    /// Pipeline with explicit conversion and calibration
    pub fn with_config(
        filter: F,
        converter: SampleConverter,
        calibration: CalibrationResult,
    ) -> Self {
        Self {
            filter,
            converter,
            calibration,
            last_timestamp: None,
            accelerometer: Vector3::zeros(),
            gyroscope: Vector3::zeros(),
        }
    }

    /// Attitude filter in use
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Mutable access to the attitude filter
    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    /// Raw count to physical unit converter
    pub fn converter(&self) -> &SampleConverter {
        &self.converter
    }

    /// Replace the converter after a range change
    pub fn set_converter(&mut self, converter: SampleConverter) {
        self.converter = converter;
    }

    /// Corrections applied to converted samples
    pub fn calibration(&self) -> &CalibrationResult {
        &self.calibration
    }

    /// Replace the calibration applied to subsequent samples
    pub fn set_calibration(&mut self, calibration: CalibrationResult) {
        self.calibration = calibration;
    }

    /// Fuse one raw sample stamped with a free-running microsecond counter
    ///
    /// The interval since the previous sample is computed with wrapping
    /// arithmetic, so counter roll-over is handled. The first sample after
    /// construction or [`reset`](Self::reset) only seeds the timestamp and
    /// integrates nothing.
    #[allow(clippy::cast_precision_loss)]
    pub fn update_raw(&mut self, raw: &RawSample, timestamp_us: u32) -> FilterUpdate {
        let sample = self.calibration.apply(&self.converter.convert(raw));

        let delta_time = self
            .last_timestamp
            .map_or(0.0, |previous| timestamp_us.wrapping_sub(previous) as f32 * MICROS_TO_SECONDS);
        self.last_timestamp = Some(timestamp_us);

        self.update(&sample, delta_time)
    }

    /// Fuse one calibrated sample taken `delta_time` seconds after the last
    pub fn update(&mut self, sample: &SensorSample, delta_time: f32) -> FilterUpdate {
        self.accelerometer = sample.accel;
        self.gyroscope = sample.gyro;

        self.filter
            .update(sample.gyro_radians(), sample.accel, sample.mag, delta_time)
    }

    /// Current orientation quaternion
    pub fn quaternion(&self) -> UnitQuaternion<f32> {
        self.filter.quaternion()
    }

    /// Pose at the most recent raw sample timestamp
    pub fn pose(&self) -> PoseRecord {
        let quaternion = self.quaternion();
        PoseRecord {
            timestamp: self.last_timestamp.unwrap_or_default(),
            quaternion: quaternion.to_wxyz(),
            euler: quaternion.to_euler_degrees().to_array(),
            twist: self.gyroscope.to_array(),
        }
    }

    /// Gravity direction in the sensor frame
    pub fn gravity(&self) -> Vector3<f32> {
        let q = self.quaternion();
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);
        Vector3::new(
            2.0 * (x * z - w * y),
            2.0 * (y * z + w * x),
            2.0 * (w * w - 0.5 + z * z),
        )
    }

    /// Acceleration minus gravity in the sensor frame, in g
    pub fn linear_acceleration(&self) -> Vector3<f32> {
        self.accelerometer - self.gravity()
    }

    /// Linear acceleration rotated into the earth frame, in g
    pub fn earth_acceleration(&self) -> Vector3<f32> {
        self.quaternion() * self.linear_acceleration()
    }

    /// Reset the filter and forget the last timestamp
    pub fn reset(&mut self) {
        self.filter.reset();
        self.last_timestamp = None;
        self.accelerometer = Vector3::zeros();
        self.gyroscope = Vector3::zeros();
    }
}
