//! Quaternion attitude filters
//!
//! Both filters estimate the rotation from the sensor (body) frame to an
//! earth frame with Z up. At rest the accelerometer reads +1 g on the axis
//! that points up, and the magnetometer reference is reconstructed from the
//! current estimate as a horizontal component `bx` and a vertical component
//! `bz`.

mod madgwick;
mod mahony;

pub use madgwick::MadgwickFilter;
pub use mahony::MahonyFilter;

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Result of one filter update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterUpdate {
    /// Orientation after the update
    pub quaternion: UnitQuaternion<f32>,
    /// The accelerometer or magnetometer vector had zero length; the
    /// orientation is the previous one, unchanged
    pub degenerate: bool,
}

/// Common contract of the attitude filters
///
/// Implementations own their state and mutate it only in [`update`].
/// The quaternion is renormalised within every update.
///
/// [`update`]: AttitudeFilter::update
pub trait AttitudeFilter {
    /// Fuse one sample
    ///
    /// * `gyroscope` - angular rate in rad/s
    /// * `accelerometer` - acceleration in any unit (normalised internally)
    /// * `magnetometer` - magnetic field in any unit (normalised internally)
    /// * `delta_time` - seconds since the previous update
    fn update(
        &mut self,
        gyroscope: Vector3<f32>,
        accelerometer: Vector3<f32>,
        magnetometer: Vector3<f32>,
        delta_time: f32,
    ) -> FilterUpdate;

    /// Current orientation estimate
    fn quaternion(&self) -> UnitQuaternion<f32>;

    /// Overwrite the orientation estimate
    fn set_quaternion(&mut self, quaternion: UnitQuaternion<f32>);

    /// Return to the identity orientation and clear accumulated state
    fn reset(&mut self);
}

/// Rate of change `½ q ⊗ (0, ω)` of an orientation rotating at `gyroscope`
fn rate_derivative(quaternion: &UnitQuaternion<f32>, gyroscope: Vector3<f32>) -> Quaternion<f32> {
    quaternion.as_ref() * Quaternion::from_parts(0.0, gyroscope * 0.5)
}

/// Forward-Euler step followed by renormalisation
fn integrate(
    quaternion: &UnitQuaternion<f32>,
    derivative: Quaternion<f32>,
    delta_time: f32,
) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(quaternion.as_ref() + derivative * delta_time)
}

/// Earth-frame magnetic reference `(bx, 0, bz)` implied by a body-frame
/// field reading and the current orientation
fn magnetic_reference(quaternion: &UnitQuaternion<f32>, magnetometer: Vector3<f32>) -> Vector3<f32> {
    let earth = quaternion * magnetometer;
    Vector3::new(earth.xy().norm(), 0.0, earth.z)
}
