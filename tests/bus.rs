//! I2C register adapter against a recording `embedded-hal` peripheral

use embedded_hal::i2c::{self, ErrorKind, ErrorType, I2c, Operation};
use sentral_fusion::registers::em7180;
use sentral_fusion::{Error, I2cBus, RegisterBus, Sentral};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Nack;

impl i2c::Error for Nack {
    fn kind(&self) -> ErrorKind {
        ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)
    }
}

/// Records written frames and answers reads from a queue
#[derive(Default)]
struct RecordingI2c {
    writes: Vec<(u8, Vec<u8>)>,
    responses: VecDeque<Vec<u8>>,
    nack: bool,
}

impl ErrorType for RecordingI2c {
    type Error = Nack;
}

impl I2c for RecordingI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.nack {
            return Err(Nack);
        }
        for operation in operations {
            match operation {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buffer) => {
                    let response = self.responses.pop_front().unwrap_or_default();
                    for (byte, value) in buffer.iter_mut().zip(response) {
                        *byte = value;
                    }
                }
            }
        }
        Ok(())
    }
}

#[test]
fn test_register_write_frame() {
    let mut bus = I2cBus::new(RecordingI2c::default());
    bus.write_byte(0x68, 0x6B, 0x80).unwrap();

    let i2c = bus.release();
    assert_eq!(i2c.writes, vec![(0x68, vec![0x6B, 0x80])]);
}

#[test]
fn test_register_reads_address_first() {
    let mut i2c = RecordingI2c::default();
    i2c.responses.push_back(vec![0x80]);
    i2c.responses.push_back(vec![1, 2, 3]);

    let mut bus = I2cBus::new(i2c);
    assert_eq!(bus.read_byte(0x28, 0x90).unwrap(), 0x80);

    let mut buffer = [0u8; 3];
    bus.read_bytes(0x76, 0xF7, &mut buffer).unwrap();
    assert_eq!(buffer, [1, 2, 3]);

    let i2c = bus.release();
    assert_eq!(i2c.writes, vec![(0x28, vec![0x90]), (0x76, vec![0xF7])]);
}

#[test]
fn test_nack_reaches_driver_as_transport_error() {
    let i2c = RecordingI2c {
        nack: true,
        ..Default::default()
    };
    let mut sentral = Sentral::new(I2cBus::new(i2c));

    assert_eq!(sentral.product_id(), Err(Error::Transport(Nack)));
}

#[test]
fn test_drivers_share_a_borrowed_bus() {
    let mut i2c = RecordingI2c::default();
    i2c.responses.push_back(vec![0x80]);
    let mut bus = I2cBus::new(i2c);

    let id = Sentral::new(&mut bus).product_id().unwrap();
    assert_eq!(id, 0x80);
    assert_eq!(bus.release().writes, vec![(em7180::ADDRESS, vec![em7180::PRODUCT_ID])]);
}
