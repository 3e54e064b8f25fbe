//! Register transport
//!
//! Every procedure in this crate talks to hardware through [`RegisterBus`],
//! a byte-addressed read/write contract. [`I2cBus`] adapts any
//! `embedded-hal` I2C peripheral to it.

use embedded_hal::i2c::I2c;

/// Synchronous byte access to addressed peripheral registers
///
/// Failures are reported through `Self::Error` and propagated unchanged by
/// the callers; nothing in this crate retries or substitutes default values.
pub trait RegisterBus {
    /// Transport error type
    type Error;

    /// Read one register
    fn read_byte(&mut self, device: u8, register: u8) -> Result<u8, Self::Error>;

    /// Write one register
    fn write_byte(&mut self, device: u8, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Read `buffer.len()` consecutive registers starting at `register`
    fn read_bytes(
        &mut self,
        device: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    type Error = B::Error;

    fn read_byte(&mut self, device: u8, register: u8) -> Result<u8, Self::Error> {
        (**self).read_byte(device, register)
    }

    fn write_byte(&mut self, device: u8, register: u8, value: u8) -> Result<(), Self::Error> {
        (**self).write_byte(device, register, value)
    }

    fn read_bytes(
        &mut self,
        device: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        (**self).read_bytes(device, register, buffer)
    }
}

/// [`RegisterBus`] over an `embedded-hal` I2C peripheral
///
/// # Example
/// ```ignore
/// let bus = I2cBus::new(i2c);
/// let mut sentral = Sentral::new(bus);
/// ```
pub struct I2cBus<I2C> {
    i2c: I2C,
}

impl<I2C> I2cBus<I2C> {
    /// Wrap an I2C peripheral
    pub const fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Consume the adapter and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> RegisterBus for I2cBus<I2C> {
    type Error = I2C::Error;

    fn read_byte(&mut self, device: u8, register: u8) -> Result<u8, Self::Error> {
        let mut data = [0u8];
        self.i2c.write_read(device, &[register], &mut data)?;
        Ok(data[0])
    }

    fn write_byte(&mut self, device: u8, register: u8, value: u8) -> Result<(), Self::Error> {
        self.i2c.write(device, &[register, value])
    }

    fn read_bytes(
        &mut self,
        device: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.i2c.write_read(device, &[register], buffer)
    }
}
