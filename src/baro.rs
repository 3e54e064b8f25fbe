//! BMP280 barometric compensation
//!
//! Integer compensation formulas with 32-bit temperature and 64-bit pressure
//! intermediates, bit-compatible with the Bosch reference code.

use crate::bus::RegisterBus;
use crate::error::Error;
use crate::registers::bmp280;
use nalgebra::ComplexField;

/// Temperature intermediate needed by pressure compensation
///
/// Only [`BaroCalibration::compensate_temperature`] produces one, so the
/// pressure of a sampling cycle can only be computed after its temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FineTemperature(i32);

impl FineTemperature {
    /// Raw fine temperature carried into pressure compensation
    pub const fn value(self) -> i32 {
        self.0
    }
}

/// The twelve factory compensation coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaroCalibration {
    pub t1: u16,
    pub t2: i16,
    pub t3: i16,
    pub p1: u16,
    pub p2: i16,
    pub p3: i16,
    pub p4: i16,
    pub p5: i16,
    pub p6: i16,
    pub p7: i16,
    pub p8: i16,
    pub p9: i16,
}

impl BaroCalibration {
    /// Decode the little-endian calibration block starting at `calib00`
    pub fn from_registers(data: &[u8; bmp280::CALIBRATION_LEN]) -> Self {
        let unsigned = |index: usize| u16::from_le_bytes([data[2 * index], data[2 * index + 1]]);
        let signed = |index: usize| i16::from_le_bytes([data[2 * index], data[2 * index + 1]]);

        Self {
            t1: unsigned(0),
            t2: signed(1),
            t3: signed(2),
            p1: unsigned(3),
            p2: signed(4),
            p3: signed(5),
            p4: signed(6),
            p5: signed(7),
            p6: signed(8),
            p7: signed(9),
            p8: signed(10),
            p9: signed(11),
        }
    }

    /// Temperature in hundredths of a degree Celsius from a 20-bit reading
    ///
    /// # Example
    /// ```
    /// # use sentral_fusion::BaroCalibration;
    /// # let calibration = BaroCalibration {
    /// #     t1: 27504, t2: 26435, t3: -1000,
    /// #     p1: 36477, p2: -10685, p3: 3024, p4: 2855, p5: 140,
    /// #     p6: -7, p7: 15500, p8: -14600, p9: 6000,
    /// # };
    /// let (temperature, fine) = calibration.compensate_temperature(519888);
    /// assert_eq!(temperature, 2508); // 25.08 °C
    /// let pressure = calibration.compensate_pressure(415148, fine);
    /// assert_eq!(pressure, 25767233); // 100653.25 Pa in Q24.8
    /// ```
    pub fn compensate_temperature(&self, adc_t: i32) -> (i32, FineTemperature) {
        let t1 = i32::from(self.t1);
        let t2 = i32::from(self.t2);
        let t3 = i32::from(self.t3);

        let var1 = ((adc_t >> 3).wrapping_sub(t1 << 1).wrapping_mul(t2)) >> 11;
        let delta = (adc_t >> 4).wrapping_sub(t1);
        let var2 = ((delta.wrapping_mul(delta) >> 12).wrapping_mul(t3)) >> 14;

        let t_fine = var1.wrapping_add(var2);
        (
            t_fine.wrapping_mul(5).wrapping_add(128) >> 8,
            FineTemperature(t_fine),
        )
    }

    /// Pressure in Pa as unsigned Q24.8 from a 20-bit reading
    ///
    /// Returns 0 when the coefficients make the divisor vanish.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn compensate_pressure(&self, adc_p: i32, fine: FineTemperature) -> u32 {
        let p1 = i64::from(self.p1);
        let p2 = i64::from(self.p2);
        let p3 = i64::from(self.p3);
        let p4 = i64::from(self.p4);
        let p5 = i64::from(self.p5);
        let p6 = i64::from(self.p6);
        let p7 = i64::from(self.p7);
        let p8 = i64::from(self.p8);
        let p9 = i64::from(self.p9);

        let mut var1 = i64::from(fine.0).wrapping_sub(128_000);
        let mut var2 = var1.wrapping_mul(var1).wrapping_mul(p6);
        var2 = var2.wrapping_add(var1.wrapping_mul(p5) << 17);
        var2 = var2.wrapping_add(p4 << 35);
        var1 = (var1.wrapping_mul(var1).wrapping_mul(p3) >> 8)
            .wrapping_add(var1.wrapping_mul(p2) << 12);
        var1 = ((1_i64 << 47).wrapping_add(var1).wrapping_mul(p1)) >> 33;

        if var1 == 0 {
            return 0;
        }

        let mut p = 1_048_576_i64.wrapping_sub(i64::from(adc_p));
        p = (p << 31).wrapping_sub(var2).wrapping_mul(3125).wrapping_div(var1);
        let var1 = p9.wrapping_mul(p >> 13).wrapping_mul(p >> 13) >> 25;
        let var2 = p8.wrapping_mul(p) >> 19;
        p = (p.wrapping_add(var1).wrapping_add(var2) >> 8).wrapping_add(p7 << 4);

        p as u32
    }
}

/// 20-bit ADC value from its `msb`, `lsb`, `xlsb` registers
pub fn raw_from_registers(data: &[u8; 3]) -> i32 {
    (i32::from(data[0]) << 12) | (i32::from(data[1]) << 4) | (i32::from(data[2]) >> 4)
}

/// Hundredths of a degree to degrees Celsius
#[allow(clippy::cast_precision_loss)]
pub fn to_celsius(centi_celsius: i32) -> f32 {
    centi_celsius as f32 / 100.0
}

/// Q24.8 pressure to Pa
#[allow(clippy::cast_precision_loss)]
pub fn to_pascal(q24_8: u32) -> f32 {
    q24_8 as f32 / 256.0
}

/// Altitude in metres from the international barometric formula
pub fn pressure_altitude(pascal: f32, sea_level_pascal: f32) -> f32 {
    44330.0 * (1.0 - ComplexField::powf(pascal / sea_level_pascal, 1.0 / 5.255))
}

/// One compensated sampling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BaroMeasurement {
    /// Hundredths of a degree Celsius
    pub temperature: i32,
    /// Pa in Q24.8
    pub pressure: u32,
}

impl BaroMeasurement {
    /// Temperature in degrees Celsius
    pub fn celsius(&self) -> f32 {
        to_celsius(self.temperature)
    }

    /// Pressure in Pa
    pub fn pascal(&self) -> f32 {
        to_pascal(self.pressure)
    }
}

/// BMP280 readout
///
/// Measurement mode and oversampling are configured by board bring-up.
pub struct Bmp280<B> {
    bus: B,
    address: u8,
    calibration: BaroCalibration,
}

impl<B: RegisterBus> Bmp280<B> {
    /// Driver at the default address, loading the calibration coefficients
    pub fn new(bus: B) -> Result<Self, Error<B::Error>> {
        Self::with_address(bus, bmp280::ADDRESS)
    }

    /// Driver at `address`, loading the calibration coefficients
    pub fn with_address(bus: B, address: u8) -> Result<Self, Error<B::Error>> {
        let mut baro = Self {
            bus,
            address,
            calibration: BaroCalibration::from_registers(&[0; bmp280::CALIBRATION_LEN]),
        };
        baro.read_calibration()?;
        Ok(baro)
    }

    /// Reload the calibration coefficients
    pub fn read_calibration(&mut self) -> Result<BaroCalibration, Error<B::Error>> {
        let mut data = [0u8; bmp280::CALIBRATION_LEN];
        self.bus.read_bytes(self.address, bmp280::CALIB00, &mut data)?;
        self.calibration = BaroCalibration::from_registers(&data);

        #[cfg(feature = "defmt")]
        defmt::debug!("BMP280 calibration {}", self.calibration);

        Ok(self.calibration)
    }

    /// Factory compensation coefficients
    pub fn calibration(&self) -> &BaroCalibration {
        &self.calibration
    }

    /// Read and compensate one temperature/pressure pair
    pub fn measure(&mut self) -> Result<BaroMeasurement, Error<B::Error>> {
        let mut data = [0u8; 6];
        self.bus.read_bytes(self.address, bmp280::PRESS_MSB, &mut data)?;

        let adc_p = raw_from_registers(&[data[0], data[1], data[2]]);
        let adc_t = raw_from_registers(&[data[3], data[4], data[5]]);

        let (temperature, fine) = self.calibration.compensate_temperature(adc_t);
        let pressure = self.calibration.compensate_pressure(adc_p, fine);

        Ok(BaroMeasurement {
            temperature,
            pressure,
        })
    }

    /// Consume the driver and return the bus
    pub fn release(self) -> B {
        self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> BaroCalibration {
        BaroCalibration {
            t1: 27504,
            t2: 26435,
            t3: -1000,
            p1: 36477,
            p2: -10685,
            p3: 3024,
            p4: 2855,
            p5: 140,
            p6: -7,
            p7: 15500,
            p8: -14600,
            p9: 6000,
        }
    }

    #[test]
    fn test_reference_temperature() {
        let (temperature, fine) = reference().compensate_temperature(519888);
        assert_eq!(temperature, 2508);
        assert_eq!(fine.value(), 128422);
    }

    #[test]
    fn test_reference_pressure() {
        let calibration = reference();
        let (_, fine) = calibration.compensate_temperature(519888);
        let pressure = calibration.compensate_pressure(415148, fine);
        assert_eq!(pressure, 25767233);
        assert!((to_pascal(pressure) - 100653.25).abs() < 0.01);
    }

    #[test]
    fn test_zero_divisor() {
        let calibration = BaroCalibration {
            p1: 0,
            ..reference()
        };
        let (_, fine) = calibration.compensate_temperature(519888);
        assert_eq!(calibration.compensate_pressure(415148, fine), 0);
    }

    #[test]
    fn test_extreme_coefficients_wrap() {
        // Both intermediate products overflow and wrap in two's complement
        let calibration = BaroCalibration {
            t1: 0,
            t2: i16::MIN,
            t3: i16::MIN,
            p1: u16::MAX,
            p2: i16::MIN,
            p3: i16::MIN,
            p4: i16::MIN,
            p5: i16::MIN,
            p6: i16::MIN,
            p7: i16::MIN,
            p8: i16::MIN,
            p9: i16::MIN,
        };
        let (temperature, fine) = calibration.compensate_temperature(0xF_FFFF);
        assert_eq!(temperature, 2);
        assert_eq!(fine.value(), 80);
        assert_eq!(calibration.compensate_pressure(0, fine), 25884631);
    }

    #[test]
    fn test_calibration_block_decoding() {
        let mut data = [0u8; 24];
        data[0..2].copy_from_slice(&27504u16.to_le_bytes());
        data[4..6].copy_from_slice(&(-1000i16).to_le_bytes());
        data[6..8].copy_from_slice(&36477u16.to_le_bytes());
        data[22..24].copy_from_slice(&6000i16.to_le_bytes());

        let calibration = BaroCalibration::from_registers(&data);
        assert_eq!(calibration.t1, 27504);
        assert_eq!(calibration.t3, -1000);
        assert_eq!(calibration.p1, 36477);
        assert_eq!(calibration.p9, 6000);
    }

    #[test]
    fn test_raw_extraction() {
        assert_eq!(raw_from_registers(&[0x7E, 0xED, 0x00]), 519888);
        assert_eq!(raw_from_registers(&[0xFF, 0xFF, 0xFF]), 0xF_FFFF);
    }

    #[test]
    fn test_altitude() {
        assert_eq!(pressure_altitude(101_325.0, 101_325.0), 0.0);
        let altitude = pressure_altitude(89_874.6, 101_325.0);
        assert!((altitude - 1000.0).abs() < 5.0, "altitude {altitude}");
    }
}
