//! Proportional-integral orientation filter (Mahony)

use super::{AttitudeFilter, FilterUpdate, integrate, magnetic_reference, rate_derivative};
use crate::math::Vector3Ext;
use crate::types::MahonySettings;
use nalgebra::{UnitQuaternion, Vector3};

/// Proportional-integral quaternion filter
///
/// The orientation error is the sum of the cross products between measured
/// and predicted gravity and field directions. It is fed back into the
/// gyroscope rate with gain `kp`. With a non-zero `ki` the error is also
/// summed once per sample and the sum is fed back with gain `ki`, so `ki`
/// is a per-sample gain independent of `delta_time`.
#[derive(Debug, Clone)]
pub struct MahonyFilter {
    settings: MahonySettings,
    quaternion: UnitQuaternion<f32>,
    integral: Vector3<f32>,
}

impl MahonyFilter {
    /// Filter with default gains
    pub fn new() -> Self {
        Self::with_settings(MahonySettings::default())
    }

    /// Filter with explicit gains
    pub fn with_settings(settings: MahonySettings) -> Self {
        Self {
            settings,
            quaternion: UnitQuaternion::identity(),
            integral: Vector3::zeros(),
        }
    }

    /// Current gains
    pub fn settings(&self) -> MahonySettings {
        self.settings
    }

    /// Change gains without disturbing the orientation
    ///
    /// Disabling integral feedback clears the accumulated error.
    pub fn set_settings(&mut self, settings: MahonySettings) {
        self.settings = settings;
        if settings.ki == 0.0 {
            self.integral = Vector3::zeros();
        }
    }

    /// Orientation error summed over every update since the last reset
    pub fn integral(&self) -> Vector3<f32> {
        self.integral
    }

    /// Orientation error between measured and predicted directions
    fn error(&self, a: Vector3<f32>, m: Vector3<f32>) -> Vector3<f32> {
        let gravity = self.quaternion.inverse_transform_vector(&Vector3::z());
        let field = self
            .quaternion
            .inverse_transform_vector(&magnetic_reference(&self.quaternion, m));

        a.cross(&gravity) + m.cross(&field)
    }
}

impl Default for MahonyFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl AttitudeFilter for MahonyFilter {
    fn update(
        &mut self,
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
        delta_time: f32,
    ) -> FilterUpdate {
        let (Some(accel), Some(mag)) = (accelerometer.try_unit(), magnetometer.try_unit()) else {
            return FilterUpdate {
                quaternion: self.quaternion,
                degenerate: true,
            };
        };

        let error = self.error(accel, mag);

        if self.settings.ki > 0.0 {
            self.integral += error;
        } else {
            self.integral = Vector3::zeros();
        }

        let corrected = gyroscope + error * self.settings.kp + self.integral * self.settings.ki;
        let derivative = rate_derivative(&self.quaternion, corrected);
        self.quaternion = integrate(&self.quaternion, derivative, delta_time);

        FilterUpdate {
            quaternion: self.quaternion,
            degenerate: false,
        }
    }

    fn quaternion(&self) -> UnitQuaternion<f32> {
        self.quaternion
    }

    fn set_quaternion(&mut self, quaternion: UnitQuaternion<f32>) {
        self.quaternion = quaternion;
    }

    fn reset(&mut self) {
        self.quaternion = UnitQuaternion::identity();
        self.integral = Vector3::zeros();
    }
}
