//! EM7180 SENtral parameter transfer
//!
//! The co-processor accepts configuration through a request/acknowledge
//! handshake:
//!
//! 1. write the four payload bytes, least significant first
//! 2. write the parameter id with bit 7 set to the request register
//! 3. set the transfer bit in the algorithm control register
//! 4. poll the acknowledge register until it echoes the request byte
//! 5. clear the request register
//! 6. clear the algorithm control register to resume fusion
//!
//! Reads use the same handshake with bit 7 clear and no payload.

use crate::bus::RegisterBus;
use crate::conversion::RawSample;
use crate::error::Error;
use crate::math::i16x3_from_le;
use crate::registers::em7180::*;
use crate::types::AckPolicy;
use nalgebra::{Quaternion, UnitQuaternion};

/// Four-byte parameter value, least significant byte first
///
/// # Example
/// ```
/// use sentral_fusion::ParamPayload;
///
/// assert_eq!(ParamPayload::from_u32(250).bytes(), [0xFA, 0x00, 0x00, 0x00]);
/// assert_eq!(ParamPayload::from_f32(1.0).bytes(), [0x00, 0x00, 0x80, 0x3F]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParamPayload([u8; 4]);

impl ParamPayload {
    /// Payload from raw bytes in register order
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Integer parameter
    pub const fn from_u32(value: u32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Floating-point parameter as its IEEE-754 bit pattern
    pub fn from_f32(value: f32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Two 16-bit fields, `low` in bytes 0..2 and `high` in bytes 2..4
    pub const fn from_u16_pair(low: u16, high: u16) -> Self {
        let low = low.to_le_bytes();
        let high = high.to_le_bytes();
        Self([low[0], low[1], high[0], high[1]])
    }

    /// Bytes in register order
    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }

    /// Payload as a little-endian integer
    pub const fn as_u32(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// Payload as an IEEE-754 float
    pub fn as_f32(&self) -> f32 {
        f32::from_le_bytes(self.0)
    }

    /// Bytes 0..2 as a 16-bit field
    pub const fn low_u16(&self) -> u16 {
        u16::from_le_bytes([self.0[0], self.0[1]])
    }

    /// Bytes 2..4 as a 16-bit field
    pub const fn high_u16(&self) -> u16 {
        u16::from_le_bytes([self.0[2], self.0[3]])
    }
}

/// One parameter write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ParamTransferRequest {
    parameter: u8,
    payload: ParamPayload,
}

impl ParamTransferRequest {
    /// Request writing `payload` to `parameter`
    ///
    /// Returns `None` if `parameter` does not fit in 7 bits.
    pub const fn new(parameter: u8, payload: ParamPayload) -> Option<Self> {
        if parameter & PARAM_WRITE != 0 {
            return None;
        }
        Some(Self { parameter, payload })
    }

    /// Parameter id without the write flag
    pub const fn parameter(&self) -> u8 {
        self.parameter
    }

    /// Value to be loaded
    pub const fn payload(&self) -> ParamPayload {
        self.payload
    }

    /// Value written to the request register
    pub const fn request_byte(&self) -> u8 {
        self.parameter | PARAM_WRITE
    }

    /// Acknowledge value that completes the handshake
    pub const fn expected_ack(&self) -> u8 {
        self.request_byte()
    }
}

/// Handshake phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferPhase {
    /// No transfer in progress
    #[default]
    Idle,
    /// Writing the payload to the load registers
    WritePayload,
    /// Writing the request register
    WriteRequest,
    /// Setting the algorithm control transfer bit
    Commence,
    /// Waiting for the acknowledge register to echo the request
    PollAck,
    /// Clearing the request register
    ClearRequest,
    /// Clearing the algorithm control register
    Resume,
}

/// Sensor ranges held in the co-processor's parameter space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FullScaleRanges {
    /// Magnetometer range in µT
    pub mag_ut: u16,
    /// Accelerometer range in g
    pub accel_g: u16,
    /// Gyroscope range in deg/s
    pub gyro_dps: u16,
}

/// EM7180 SENtral co-processor
///
/// Transfers are strictly sequential. Once the request byte is written the
/// transfer stays pending until its handshake completes. A transfer that
/// times out or loses the bus mid-handshake keeps it pending, and every
/// further transfer fails with [`Error::TransferPending`] until
/// [`Sentral::abort_transfer`] succeeds.
///
/// # Example
/// ```ignore
/// let mut sentral = Sentral::new(I2cBus::new(i2c));
/// sentral.set_mag_acc_full_scale(1000, 8)?;
/// sentral.set_gyro_full_scale(2000)?;
/// let ranges = sentral.read_full_scale()?;
/// ```
pub struct Sentral<B> {
    bus: B,
    policy: AckPolicy,
    phase: TransferPhase,
    pending: Option<u8>,
}

impl<B: RegisterBus> Sentral<B> {
    /// Driver with the default acknowledge poll budget
    pub fn new(bus: B) -> Self {
        Self::with_policy(bus, AckPolicy::default())
    }

    /// Driver with an explicit acknowledge poll budget
    pub const fn with_policy(bus: B, policy: AckPolicy) -> Self {
        Self {
            bus,
            policy,
            phase: TransferPhase::Idle,
            pending: None,
        }
    }

    /// Last handshake phase entered; `Idle` after a completed transfer
    pub const fn phase(&self) -> TransferPhase {
        self.phase
    }

    /// Request byte of a transfer whose handshake has not completed
    pub const fn pending(&self) -> Option<u8> {
        self.pending
    }

    /// Acknowledge poll budget in use
    pub const fn policy(&self) -> AckPolicy {
        self.policy
    }

    /// Consume the driver and return the bus
    pub fn release(self) -> B {
        self.bus
    }

    fn enter(&mut self, phase: TransferPhase) {
        #[cfg(feature = "defmt")]
        defmt::trace!("param transfer {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn ensure_idle(&self) -> Result<(), Error<B::Error>> {
        match self.pending {
            Some(request) => Err(Error::TransferPending(request)),
            None => Ok(()),
        }
    }

    /// Read the acknowledge register until it equals `expected`
    fn await_ack(&mut self, expected: u8) -> Result<u32, Error<B::Error>> {
        for poll in 1..=self.policy.max_polls {
            if self.bus.read_byte(ADDRESS, PARAM_ACKNOWLEDGE)? == expected {
                return Ok(poll);
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!(
            "param request {=u8:#x} not acknowledged after {} polls",
            expected,
            self.policy.max_polls
        );
        Err(Error::AckTimeout {
            parameter: expected,
            polls: self.policy.max_polls,
        })
    }

    fn finish_handshake(&mut self) -> Result<(), Error<B::Error>> {
        self.enter(TransferPhase::ClearRequest);
        self.bus.write_byte(ADDRESS, PARAM_REQUEST, 0x00)?;
        self.enter(TransferPhase::Resume);
        self.bus.write_byte(ADDRESS, ALGORITHM_CONTROL, 0x00)?;
        self.enter(TransferPhase::Idle);
        self.pending = None;
        Ok(())
    }

    fn request(&mut self, request_byte: u8) -> Result<(), Error<B::Error>> {
        self.enter(TransferPhase::WriteRequest);
        self.bus.write_byte(ADDRESS, PARAM_REQUEST, request_byte)?;
        self.pending = Some(request_byte);

        self.enter(TransferPhase::Commence);
        self.bus.write_byte(ADDRESS, ALGORITHM_CONTROL, PARAM_TRANSFER)?;
        Ok(())
    }

    /// Run the write handshake for one parameter
    ///
    /// # Errors
    ///
    /// Bus failures, [`Error::AckTimeout`] once the poll budget is spent and
    /// [`Error::TransferPending`] while an earlier handshake is unresolved.
    pub fn transfer(&mut self, request: &ParamTransferRequest) -> Result<(), Error<B::Error>> {
        self.ensure_idle()?;

        self.enter(TransferPhase::WritePayload);
        for (offset, byte) in (0u8..).zip(request.payload().bytes()) {
            self.bus.write_byte(ADDRESS, LOAD_PARAM_BYTE0 + offset, byte)?;
        }

        self.request(request.request_byte())?;

        self.enter(TransferPhase::PollAck);
        let _polls = self.await_ack(request.expected_ack())?;

        self.finish_handshake()?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "parameter {} written after {} polls",
            request.parameter(),
            _polls
        );

        Ok(())
    }

    /// Clear the request and algorithm control registers after a failed
    /// transfer, releasing the pending request
    pub fn abort_transfer(&mut self) -> Result<(), Error<B::Error>> {
        self.finish_handshake()
    }

    /// Write a 32-bit integer parameter
    pub fn set_integer_param(&mut self, parameter: u8, value: u32) -> Result<(), Error<B::Error>> {
        self.write_param(parameter, ParamPayload::from_u32(value))
    }

    /// Write a floating-point parameter
    pub fn set_float_param(&mut self, parameter: u8, value: f32) -> Result<(), Error<B::Error>> {
        self.write_param(parameter, ParamPayload::from_f32(value))
    }

    fn write_param(&mut self, parameter: u8, payload: ParamPayload) -> Result<(), Error<B::Error>> {
        let request =
            ParamTransferRequest::new(parameter, payload).ok_or(Error::InvalidParameter(parameter))?;
        self.transfer(&request)
    }

    /// Set the gyroscope range in deg/s (parameter 75)
    pub fn set_gyro_full_scale(&mut self, gyro_dps: u16) -> Result<(), Error<B::Error>> {
        self.write_param(PARAM_GYRO_FS, ParamPayload::from_u16_pair(gyro_dps, 0))
    }

    /// Set the magnetometer range in µT and accelerometer range in g
    /// (parameter 74)
    pub fn set_mag_acc_full_scale(
        &mut self,
        mag_ut: u16,
        accel_g: u16,
    ) -> Result<(), Error<B::Error>> {
        self.write_param(PARAM_MAG_ACC_FS, ParamPayload::from_u16_pair(mag_ut, accel_g))
    }

    /// Read back one parameter
    ///
    /// # Errors
    ///
    /// As [`Sentral::transfer`], plus [`Error::InvalidParameter`] for ids
    /// above 127.
    pub fn read_param(&mut self, parameter: u8) -> Result<ParamPayload, Error<B::Error>> {
        if parameter & PARAM_WRITE != 0 {
            return Err(Error::InvalidParameter(parameter));
        }
        self.ensure_idle()?;

        self.request(parameter)?;

        self.enter(TransferPhase::PollAck);
        self.await_ack(parameter)?;

        let mut saved = [0u8; 4];
        self.bus.read_bytes(ADDRESS, SAVED_PARAM_BYTE0, &mut saved)?;

        self.finish_handshake()?;
        Ok(ParamPayload::from_bytes(saved))
    }

    /// Read the magnetometer, accelerometer and gyroscope ranges
    pub fn read_full_scale(&mut self) -> Result<FullScaleRanges, Error<B::Error>> {
        let mag_acc = self.read_param(PARAM_MAG_ACC_FS)?;
        let gyro = self.read_param(PARAM_GYRO_FS)?;
        Ok(FullScaleRanges {
            mag_ut: mag_acc.low_u16(),
            accel_g: mag_acc.high_u16(),
            gyro_dps: gyro.low_u16(),
        })
    }

    /// Fused orientation
    ///
    /// Returns `None` while the co-processor reports an all-zero quaternion.
    pub fn read_quaternion(&mut self) -> Result<Option<UnitQuaternion<f32>>, Error<B::Error>> {
        let mut data = [0u8; 16];
        self.bus.read_bytes(ADDRESS, QX, &mut data)?;

        let component = |index: usize| {
            let offset = index * 4;
            f32::from_le_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ])
        };
        let quaternion = Quaternion::new(component(3), component(0), component(1), component(2));

        Ok(UnitQuaternion::try_new(quaternion, f32::EPSILON))
    }

    /// Scaled sensor counts as forwarded by the co-processor
    pub fn read_raw_sample(&mut self) -> Result<RawSample, Error<B::Error>> {
        let mut mag = [0u8; 6];
        let mut accel = [0u8; 6];
        let mut gyro = [0u8; 6];
        self.bus.read_bytes(ADDRESS, MX, &mut mag)?;
        self.bus.read_bytes(ADDRESS, AX, &mut accel)?;
        self.bus.read_bytes(ADDRESS, GX, &mut gyro)?;

        Ok(RawSample {
            accel: i16x3_from_le(&accel),
            gyro: i16x3_from_le(&gyro),
            mag: i16x3_from_le(&mag),
        })
    }

    /// Product id, 0x80 for the EM7180
    pub fn product_id(&mut self) -> Result<u8, Error<B::Error>> {
        Ok(self.bus.read_byte(ADDRESS, PRODUCT_ID)?)
    }
}
