//! BMP280 readout through a scripted bus

mod common;

use common::{MockBus, MockError, Operation};
use sentral_fusion::baro::pressure_altitude;
use sentral_fusion::registers::bmp280;
use sentral_fusion::{Bmp280, Error};

const COEFFICIENTS: [i32; 12] = [
    27504, 26435, -1000, 36477, -10685, 3024, 2855, 140, -7, 15500, -14600, 6000,
];

fn calibration_block() -> Vec<u8> {
    COEFFICIENTS
        .iter()
        .flat_map(|value| (*value as u16).to_le_bytes())
        .collect()
}

fn adc_registers(adc: i32) -> [u8; 3] {
    [(adc >> 12) as u8, (adc >> 4) as u8, ((adc & 0x0F) << 4) as u8]
}

fn barometer_bus(adc_p: i32, adc_t: i32) -> MockBus {
    let bus = MockBus::new();
    bus.set_registers(bmp280::ADDRESS, bmp280::CALIB00, &calibration_block());

    let mut data = adc_registers(adc_p).to_vec();
    data.extend_from_slice(&adc_registers(adc_t));
    bus.set_registers(bmp280::ADDRESS, bmp280::PRESS_MSB, &data);
    bus
}

#[test]
fn test_calibration_loaded_on_construction() {
    let bus = barometer_bus(0, 0);
    let baro = Bmp280::new(bus.clone()).unwrap();

    let calibration = baro.calibration();
    assert_eq!(calibration.t1, 27504);
    assert_eq!(calibration.t3, -1000);
    assert_eq!(calibration.p1, 36477);
    assert_eq!(calibration.p6, -7);
    assert_eq!(calibration.p9, 6000);

    assert_eq!(
        bus.operations(),
        vec![Operation::ReadBlock {
            device: bmp280::ADDRESS,
            register: bmp280::CALIB00,
            data: calibration_block(),
        }]
    );
}

#[test]
fn test_reference_measurement() {
    let mut baro = Bmp280::new(barometer_bus(415148, 519888)).unwrap();
    let measurement = baro.measure().unwrap();

    assert_eq!(measurement.temperature, 2508);
    assert_eq!(measurement.pressure, 25767233);
    assert!((measurement.celsius() - 25.08).abs() < 1e-4);
    assert!((measurement.pascal() - 100653.25).abs() < 0.01);
}

#[test]
fn test_warmer_reading_raises_temperature() {
    let mut cool = Bmp280::new(barometer_bus(415148, 519888)).unwrap();
    let mut warm = Bmp280::new(barometer_bus(415148, 530000)).unwrap();

    let cool = cool.measure().unwrap();
    let warm = warm.measure().unwrap();
    assert!(warm.temperature > cool.temperature);
    assert_ne!(warm.pressure, cool.pressure);
}

#[test]
fn test_alternate_address() {
    let bus = MockBus::new();
    Bmp280::with_address(bus.clone(), 0x77).unwrap();
    assert!(matches!(
        bus.operations()[0],
        Operation::ReadBlock { device: 0x77, .. }
    ));
}

#[test]
fn test_transport_failure() {
    let bus = MockBus::new();
    bus.fail_next_read();
    assert!(matches!(
        Bmp280::new(bus),
        Err(Error::Transport(MockError))
    ));
}

#[test]
fn test_altitude_from_measurement() {
    let mut baro = Bmp280::new(barometer_bus(415148, 519888)).unwrap();
    let pascal = baro.measure().unwrap().pascal();

    // About 670 Pa below standard sea-level pressure
    let altitude = pressure_altitude(pascal, 101_325.0);
    assert!(altitude > 50.0 && altitude < 62.0, "altitude {altitude}");
}
