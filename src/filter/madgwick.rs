//! Gradient-descent orientation filter (Madgwick)

use super::{AttitudeFilter, FilterUpdate, integrate, magnetic_reference, rate_derivative};
use crate::math::Vector3Ext;
use crate::types::MadgwickSettings;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Gradient-descent quaternion filter
///
/// Each update steps the gyroscope-integrated orientation against the
/// gradient of the error between measured and predicted gravity and
/// magnetic field directions, scaled by `beta`. A non-zero `zeta` also
/// tracks a gyroscope bias from the same gradient.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use sentral_fusion::{AttitudeFilter, MadgwickFilter};
///
/// let mut filter = MadgwickFilter::new();
/// let update = filter.update(
///     Vector3::zeros(),
///     Vector3::new(0.0, 0.0, 1.0),
///     Vector3::new(0.5, 0.0, -0.8),
///     0.01,
/// );
/// assert!(!update.degenerate);
/// ```
#[derive(Debug, Clone)]
pub struct MadgwickFilter {
    settings: MadgwickSettings,
    beta: f32,
    zeta: f32,
    quaternion: UnitQuaternion<f32>,
    gyro_bias: Vector3<f32>,
}

impl MadgwickFilter {
    /// Filter with default gains
    pub fn new() -> Self {
        Self::with_settings(MadgwickSettings::default())
    }

    /// Filter with explicit gains
    pub fn with_settings(settings: MadgwickSettings) -> Self {
        Self {
            settings,
            beta: settings.beta(),
            zeta: settings.zeta(),
            quaternion: UnitQuaternion::identity(),
            gyro_bias: Vector3::zeros(),
        }
    }

    /// Current gains
    pub fn settings(&self) -> MadgwickSettings {
        self.settings
    }

    /// Change gains without disturbing the orientation
    pub fn set_settings(&mut self, settings: MadgwickSettings) {
        self.settings = settings;
        self.beta = settings.beta();
        self.zeta = settings.zeta();
    }

    /// Error-drift gain in rad/s
    pub fn beta(&self) -> f32 {
        self.beta
    }

    /// Bias-drift gain in rad/s²
    pub fn zeta(&self) -> f32 {
        self.zeta
    }

    /// Estimated gyroscope bias in rad/s, zero unless `zeta` is non-zero
    pub fn gyro_bias(&self) -> Vector3<f32> {
        self.gyro_bias
    }

    /// Gradient of the gravity and magnetic field objective function
    ///
    /// Inputs are unit vectors in the sensor frame.
    fn gradient(&self, a: Vector3<f32>, m: Vector3<f32>) -> Quaternion<f32> {
        let q = self.quaternion.as_ref();
        let (w, x, y, z) = (q.w, q.i, q.j, q.k);

        let reference = magnetic_reference(&self.quaternion, m);
        let bx2 = 2.0 * reference.x;
        let bz2 = 2.0 * reference.z;
        let bx4 = 2.0 * bx2;
        let bz4 = 2.0 * bz2;

        // Predicted minus measured gravity
        let g1 = 2.0 * (x * z - w * y) - a.x;
        let g2 = 2.0 * (w * x + y * z) - a.y;
        let g3 = 1.0 - 2.0 * (x * x + y * y) - a.z;

        // Predicted minus measured field
        let b1 = bx2 * (0.5 - y * y - z * z) + bz2 * (x * z - w * y) - m.x;
        let b2 = bx2 * (x * y - w * z) + bz2 * (w * x + y * z) - m.y;
        let b3 = bx2 * (w * y + x * z) + bz2 * (0.5 - x * x - y * y) - m.z;

        let sw = -2.0 * y * g1 + 2.0 * x * g2 - bz2 * y * b1
            + (-bx2 * z + bz2 * x) * b2
            + bx2 * y * b3;
        let sx = 2.0 * z * g1 + 2.0 * w * g2 - 4.0 * x * g3
            + bz2 * z * b1
            + (bx2 * y + bz2 * w) * b2
            + (bx2 * z - bz4 * x) * b3;
        let sy = -2.0 * w * g1 + 2.0 * z * g2 - 4.0 * y * g3
            + (-bx4 * y - bz2 * w) * b1
            + (bx2 * x + bz2 * z) * b2
            + (bx2 * w - bz4 * y) * b3;
        let sz = 2.0 * x * g1 + 2.0 * y * g2
            + (-bx4 * z + bz2 * x) * b1
            + (-bx2 * w + bz2 * y) * b2
            + bx2 * x * b3;

        Quaternion::new(sw, sx, sy, sz)
    }
}

impl Default for MadgwickFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl AttitudeFilter for MadgwickFilter {
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

        let gradient = self.gradient(accel, mag);
        let norm = gradient.norm();
        let step = (norm > 0.0 && norm.is_finite()).then(|| gradient / norm);

        if let Some(step) = step {
            if self.zeta != 0.0 {
                // Angular error implied by the step direction
                let error = (self.quaternion.as_ref().conjugate() * step).imag() * 2.0;
                self.gyro_bias += error * (self.zeta * delta_time);
            }
        }

        let mut derivative = rate_derivative(&self.quaternion, gyroscope - self.gyro_bias);
        if let Some(step) = step {
            derivative -= step * self.beta;
        }

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
        self.gyro_bias = Vector3::zeros();
    }
}
