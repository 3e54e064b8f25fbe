//! MPU9250 / AK8963 calibration procedures
//!
//! Register sequences that gather the batches consumed by
//! [`calibration`](crate::calibration). The magnetometer is addressed
//! directly, so the MPU9250 I2C bypass must already be enabled by board
//! bring-up.

use crate::bus::RegisterBus;
use crate::calibration::{
    BiasAccumulator, CalibrationResult, InertialBias, MagCalibration, MagExtrema, SelfTestAverages, SelfTestReport,
    accel_trim_registers, gyro_trim_registers,
};
use crate::conversion::{RawSample, SampleConverter};
use crate::error::{CalibrationError, Error};
use crate::math::{i16x3_from_be, i16x3_from_le};
use crate::registers::{ak8963, mpu9250};
use crate::types::{AccelScale, CalibrationSettings, GyroScale, MagRate, MagScale};
use embedded_hal::delay::DelayNs;
use nalgebra::Vector3;

/// Outcome of [`Mpu9250::calibrate_accel_gyro`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelGyroCalibration {
    /// Bias in raw counts at ±2 g / ±250 deg/s
    pub bias: InertialBias,
    /// Gyroscope bias in deg/s
    pub gyro_bias: Vector3<f32>,
    /// Accelerometer bias in g
    pub accel_bias: Vector3<f32>,
    /// Gyro trim bytes that were written to `XG_OFFSET_H..`
    pub gyro_trim: [u8; 6],
    /// Combined factory + bias accel trim bytes (computed, not written)
    pub accel_trim: [u8; 6],
    /// Number of FIFO packets averaged
    pub packets: usize,
}

impl From<AccelGyroCalibration> for CalibrationResult {
    /// Corrections with the gyroscope bias marked as already trimmed in
    /// hardware
    fn from(calibration: AccelGyroCalibration) -> Self {
        Self {
            gyro_bias: calibration.gyro_bias,
            accel_bias: calibration.accel_bias,
            gyro_bias_in_hardware: true,
            ..Default::default()
        }
    }
}

/// Calibration driver for the MPU9250 and its AK8963 magnetometer
pub struct Mpu9250<B> {
    bus: B,
    settings: CalibrationSettings,
}

impl<B: RegisterBus> Mpu9250<B> {
    /// Driver with default calibration settings
    pub fn new(bus: B) -> Self {
        Self::with_settings(bus, CalibrationSettings::default())
    }

    /// Driver with explicit calibration settings
    pub const fn with_settings(bus: B, settings: CalibrationSettings) -> Self {
        Self { bus, settings }
    }

    /// Active calibration settings
    pub const fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    /// Consume the driver and return the bus
    pub fn release(self) -> B {
        self.bus
    }

    fn write(&mut self, device: u8, register: u8, value: u8) -> Result<(), Error<B::Error>> {
        self.bus.write_byte(device, register, value)?;
        Ok(())
    }

    /// Measure accel and gyro bias from a stationary FIFO batch
    ///
    /// Resets the device, runs it at 1 kHz with ±250 deg/s and ±2 g, lets the
    /// FIFO fill for `fifo_fill_ms` and averages every complete packet. The
    /// gyro bias is written to the hardware trim registers. The accel trim is
    /// combined with the factory value and returned without being written.
    ///
    /// The board must stay still with `gravity_axis` vertical.
    ///
    /// # Errors
    ///
    /// Bus failures, or [`CalibrationError::Incomplete`] when the FIFO holds
    /// fewer than `min_packets` packets.
    pub fn calibrate_accel_gyro<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<AccelGyroCalibration, Error<B::Error>> {
        use mpu9250::*;

        self.write(ADDRESS, PWR_MGMT_1, PWR_RESET)?;
        delay.delay_ms(100);
        self.write(ADDRESS, PWR_MGMT_1, PWR_CLOCK_PLL)?;
        self.write(ADDRESS, PWR_MGMT_2, 0x00)?;
        delay.delay_ms(200);

        self.write(ADDRESS, INT_ENABLE, 0x00)?;
        self.write(ADDRESS, FIFO_EN, 0x00)?;
        self.write(ADDRESS, PWR_MGMT_1, 0x00)?;
        self.write(ADDRESS, I2C_MST_CTRL, 0x00)?;
        self.write(ADDRESS, USER_CTRL, 0x00)?;
        self.write(ADDRESS, USER_CTRL, USER_CTRL_RESET_FIFO_DMP)?;
        delay.delay_ms(15);

        self.write(ADDRESS, CONFIG, DLPF_184HZ)?;
        self.write(ADDRESS, SMPLRT_DIV, 0x00)?;
        self.write(ADDRESS, GYRO_CONFIG, GyroScale::Dps250.register_bits())?;
        self.write(ADDRESS, ACCEL_CONFIG, AccelScale::G2.register_bits())?;

        self.write(ADDRESS, USER_CTRL, USER_CTRL_FIFO_EN)?;
        self.write(ADDRESS, FIFO_EN, FIFO_GYRO_ACCEL)?;
        delay.delay_ms(self.settings.fifo_fill_ms);
        self.write(ADDRESS, FIFO_EN, 0x00)?;

        let mut count = [0u8; 2];
        self.bus.read_bytes(ADDRESS, FIFO_COUNTH, &mut count)?;
        let packets = usize::from(u16::from_be_bytes(count)) / FIFO_PACKET_LEN;

        if packets < self.settings.min_packets {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "FIFO batch truncated: {} of {} packets",
                packets,
                self.settings.min_packets
            );
            return Err(Error::Calibration(CalibrationError::Incomplete {
                required: self.settings.min_packets,
                collected: packets,
            }));
        }

        let mut batch = BiasAccumulator::new();
        let mut packet = [0u8; FIFO_PACKET_LEN];
        for _ in 0..packets {
            self.bus.read_bytes(ADDRESS, FIFO_R_W, &mut packet)?;
            batch.push_fifo_packet(&packet);
        }

        let accel_sensitivity = AccelScale::G2.sensitivity();
        let bias = batch
            .finish(
                self.settings.min_packets,
                self.settings.gravity_axis,
                accel_sensitivity,
            )
            .map_err(Error::Calibration)?;

        let gyro_trim = gyro_trim_registers(bias.gyro);
        for (offset, value) in (0u8..).zip(gyro_trim) {
            self.write(ADDRESS, XG_OFFSET_H + offset, value)?;
        }

        let mut factory_trim = [0i16; 3];
        for (axis, register) in [XA_OFFSET_H, YA_OFFSET_H, ZA_OFFSET_H].into_iter().enumerate() {
            let mut trim = [0u8; 2];
            self.bus.read_bytes(ADDRESS, register, &mut trim)?;
            factory_trim[axis] = i16::from_be_bytes(trim);
        }
        let accel_trim = accel_trim_registers(factory_trim, bias.accel);

        let result = AccelGyroCalibration {
            bias,
            gyro_bias: bias.gyro_dps(GyroScale::Dps250.sensitivity()),
            accel_bias: bias.accel_g(accel_sensitivity),
            gyro_trim,
            accel_trim,
            packets,
        };

        #[cfg(feature = "defmt")]
        defmt::info!(
            "accel/gyro bias from {} packets: accel {} gyro {} counts",
            packets,
            bias.accel,
            bias.gyro
        );

        Ok(result)
    }

    /// Read the AK8963 fuse-ROM sensitivity adjustment
    ///
    /// Each axis factor is `(asa - 128) / 256 + 1`. Leaves the magnetometer
    /// powered down.
    pub fn read_mag_adjustment<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<Vector3<f32>, Error<B::Error>> {
        use ak8963::*;

        self.write(ADDRESS, CNTL, MODE_POWER_DOWN)?;
        delay.delay_ms(10);
        self.write(ADDRESS, CNTL, MODE_FUSE_ROM)?;
        delay.delay_ms(10);

        let mut asa = [0u8; 3];
        self.bus.read_bytes(ADDRESS, ASAX, &mut asa)?;

        self.write(ADDRESS, CNTL, MODE_POWER_DOWN)?;
        delay.delay_ms(10);

        Ok(asa.map(|value| (f32::from(value) - 128.0) / 256.0 + 1.0).into())
    }

    /// Start continuous magnetometer measurement
    pub fn configure_magnetometer<D: DelayNs>(
        &mut self,
        scale: MagScale,
        rate: MagRate,
        delay: &mut D,
    ) -> Result<(), Error<B::Error>> {
        self.write(
            ak8963::ADDRESS,
            ak8963::CNTL,
            scale.register_bits() | rate.register_bits(),
        )?;
        delay.delay_ms(10);
        Ok(())
    }

    /// Read one magnetometer measurement if a fresh one is available
    ///
    /// Returns `None` when data-ready is clear or the reading overflowed.
    pub fn read_mag_counts(&mut self) -> Result<Option<[i16; 3]>, Error<B::Error>> {
        use ak8963::*;

        let status = self.bus.read_byte(ADDRESS, ST1)?;
        if status & ST1_DATA_READY == 0 {
            return Ok(None);
        }

        // Reading through ST2 releases the data registers
        let mut data = [0u8; 7];
        self.bus.read_bytes(ADDRESS, XOUT_L, &mut data)?;
        if data[6] & ST2_OVERFLOW != 0 {
            return Ok(None);
        }

        Ok(Some(i16x3_from_le(&data[..6])))
    }

    /// Hard-iron and soft-iron calibration from a rotation sweep
    ///
    /// Collects `mag_samples` valid readings, pausing
    /// `mag_sample_interval_ms` between reads, while the board is waved
    /// through every orientation. Offsets are scaled with the converter's
    /// magnetometer resolution and factory adjustment.
    ///
    /// # Errors
    ///
    /// Bus failures, [`CalibrationError::Incomplete`] when `mag_max_attempts`
    /// reads did not yield enough valid readings, and
    /// [`CalibrationError::NoRotation`] when an axis never moved.
    pub fn calibrate_magnetometer<D: DelayNs>(
        &mut self,
        delay: &mut D,
        converter: &SampleConverter,
    ) -> Result<MagCalibration, Error<B::Error>> {
        let mut extrema = MagExtrema::new();
        let mut attempts = 0;

        while extrema.count() < self.settings.mag_samples
            && attempts < self.settings.mag_max_attempts
        {
            attempts += 1;
            if let Some(counts) = self.read_mag_counts()? {
                extrema.observe(counts);
            }
            delay.delay_ms(self.settings.mag_sample_interval_ms);
        }

        let calibration = extrema
            .finish(
                self.settings.mag_samples,
                converter.mag_scale.resolution(),
                converter.mag_adjustment,
            )
            .map_err(|error| {
                #[cfg(feature = "defmt")]
                defmt::warn!("magnetometer calibration failed: {}", error);
                Error::Calibration(error)
            })?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "mag hard iron {} counts after {} reads",
            calibration.hard_iron_counts,
            attempts
        );

        Ok(calibration)
    }

    /// Compare the self-test response against factory trim
    ///
    /// Averages `self_test_samples` readings with and without self-test
    /// excitation at ±2 g / ±250 deg/s, then restores normal operation.
    pub fn self_test<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<SelfTestReport, Error<B::Error>> {
        use mpu9250::*;

        let accel_bits = AccelScale::G2.register_bits();
        let gyro_bits = GyroScale::Dps250.register_bits();

        self.write(ADDRESS, SMPLRT_DIV, 0x00)?;
        self.write(ADDRESS, CONFIG, DLPF_92HZ)?;
        self.write(ADDRESS, GYRO_CONFIG, gyro_bits)?;
        self.write(ADDRESS, ACCEL_CONFIG2, DLPF_92HZ)?;
        self.write(ADDRESS, ACCEL_CONFIG, accel_bits)?;

        let normal = self.average_readings()?;

        self.write(ADDRESS, ACCEL_CONFIG, SELF_TEST_ENABLE | accel_bits)?;
        self.write(ADDRESS, GYRO_CONFIG, SELF_TEST_ENABLE | gyro_bits)?;
        delay.delay_ms(25);

        let excited = self.average_readings()?;

        self.write(ADDRESS, ACCEL_CONFIG, accel_bits)?;
        self.write(ADDRESS, GYRO_CONFIG, gyro_bits)?;
        delay.delay_ms(25);

        let mut codes = [0u8; 6];
        self.bus.read_bytes(ADDRESS, SELF_TEST_X_ACCEL, &mut codes[..3])?;
        self.bus.read_bytes(ADDRESS, SELF_TEST_X_GYRO, &mut codes[3..])?;

        let report = SelfTestReport::from_averages(&normal, &excited, codes, AccelScale::G2.code());

        #[cfg(feature = "defmt")]
        defmt::info!("self-test response {} %", report.percentages());

        Ok(report)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn average_readings(&mut self) -> Result<SelfTestAverages, Error<B::Error>> {
        let samples = self.settings.self_test_samples;
        if samples == 0 {
            return Err(Error::Calibration(CalibrationError::Incomplete {
                required: 1,
                collected: 0,
            }));
        }

        let mut accel_sum = [0i32; 3];
        let mut gyro_sum = [0i32; 3];
        for _ in 0..samples {
            let (accel, gyro) = self.read_accel_gyro()?;
            for axis in 0..3 {
                accel_sum[axis] += i32::from(accel[axis]);
                gyro_sum[axis] += i32::from(gyro[axis]);
            }
        }

        let samples = samples as i32;
        Ok(SelfTestAverages {
            accel: accel_sum.map(|sum| sum / samples),
            gyro: gyro_sum.map(|sum| sum / samples),
        })
    }

    fn read_accel_gyro(&mut self) -> Result<([i16; 3], [i16; 3]), Error<B::Error>> {
        let mut accel = [0u8; 6];
        let mut gyro = [0u8; 6];
        self.bus
            .read_bytes(mpu9250::ADDRESS, mpu9250::ACCEL_XOUT_H, &mut accel)?;
        self.bus
            .read_bytes(mpu9250::ADDRESS, mpu9250::GYRO_XOUT_H, &mut gyro)?;
        Ok((i16x3_from_be(&accel), i16x3_from_be(&gyro)))
    }

    /// Read one accel/gyro/mag sample in raw counts
    ///
    /// The magnetometer block is read through ST2 regardless of its
    /// data-ready flag, so an unchanged reading repeats the previous one.
    pub fn read_raw_sample(&mut self) -> Result<RawSample, Error<B::Error>> {
        let mut accel = [0u8; 6];
        let mut gyro = [0u8; 6];
        let mut mag = [0u8; 7];
        self.bus
            .read_bytes(mpu9250::ADDRESS, mpu9250::ACCEL_XOUT_H, &mut accel)?;
        self.bus
            .read_bytes(mpu9250::ADDRESS, mpu9250::GYRO_XOUT_H, &mut gyro)?;
        self.bus
            .read_bytes(ak8963::ADDRESS, ak8963::XOUT_L, &mut mag)?;

        let mut mag_bytes = [0u8; 6];
        mag_bytes.copy_from_slice(&mag[..6]);
        Ok(RawSample::from_registers(&accel, &gyro, &mag_bytes))
    }
}
