#![no_std]

//! Sentral Fusion - attitude estimation and sensor management for MPU9250 / EM7180 / BMP280 boards
//!
//! This library provides the numerical core of a 9-axis orientation board:
//!
//! - Gradient-descent (Madgwick) and proportional-integral (Mahony) quaternion filters
//! - Accelerometer/gyroscope bias, magnetometer hard/soft-iron and self-test calibration
//! - The EM7180 SENtral parameter-transfer handshake with a bounded acknowledge poll
//! - BMP280 fixed-point temperature and pressure compensation
//! - `#![no_std]` compatible, hardware access through `embedded-hal` I2C
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use sentral_fusion::{AttitudeFilter, MadgwickFilter, MadgwickSettings};
//!
//! let mut filter = MadgwickFilter::with_settings(MadgwickSettings {
//!     gyro_measurement_error: 10.0, // deg/s
//!     ..Default::default()
//! });
//!
//! // Sensor readings
//! let gyroscope = Vector3::new(0.01, 0.02, 0.03);    // rad/s
//! let accelerometer = Vector3::new(0.0, 0.0, 1.0);   // g
//! let magnetometer = Vector3::new(220.0, 0.0, -400.0); // mG
//!
//! // Update filter
//! let update = filter.update(gyroscope, accelerometer, magnetometer, 0.01); // 10ms
//!
//! // Convert to Euler angles (roll, pitch, yaw)
//! let (roll, pitch, yaw) = update.quaternion.euler_angles();
//! ```
//!
//! Raw register samples go through [`Ahrs`], which converts, calibrates and
//! timestamps them before they reach the filter.

mod ahrs;
pub mod baro;
pub mod bus;
pub mod calibration;
mod conversion;
mod error;
pub mod filter;
mod math;
pub mod mpu9250;
pub mod registers;
pub mod sentral;
mod types;

// Re-export the main entry points
pub use ahrs::Ahrs;
pub use baro::{BaroCalibration, BaroMeasurement, Bmp280, FineTemperature};
pub use bus::{I2cBus, RegisterBus};
pub use calibration::{
    BiasAccumulator, CalibrationResult, MagCalibration, MagExtrema, SelfTestReport,
};
pub use conversion::{RawSample, SampleConverter, SensorSample};
pub use error::{CalibrationError, Error};
pub use filter::{AttitudeFilter, FilterUpdate, MadgwickFilter, MahonyFilter};
pub use math::{DEG_TO_RAD, QuaternionExt, RAD_TO_DEG, Vector3Ext};
pub use mpu9250::{AccelGyroCalibration, Mpu9250};
pub use sentral::{
    FullScaleRanges, ParamPayload, ParamTransferRequest, Sentral, TransferPhase,
};
pub use types::*;
