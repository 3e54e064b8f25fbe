//! Register definitions
//!
//! Only the registers touched by the calibration procedures, the parameter
//! transfer handshake and the barometer readout are listed here.

/// MPU9250 accelerometer/gyroscope registers
pub mod mpu9250 {
    /// I2C address with AD0 low
    pub const ADDRESS: u8 = 0x68;

    /// Gyro self-test codes, one byte per axis (X, Y, Z)
    pub const SELF_TEST_X_GYRO: u8 = 0x00;
    /// Accel self-test codes, one byte per axis (X, Y, Z)
    pub const SELF_TEST_X_ACCEL: u8 = 0x0D;

    /// Gyro trim registers, big-endian X/Y/Z
    pub const XG_OFFSET_H: u8 = 0x13;
    pub const SMPLRT_DIV: u8 = 0x19;
    pub const CONFIG: u8 = 0x1A;
    pub const GYRO_CONFIG: u8 = 0x1B;
    pub const ACCEL_CONFIG: u8 = 0x1C;
    pub const ACCEL_CONFIG2: u8 = 0x1D;
    pub const FIFO_EN: u8 = 0x23;
    pub const I2C_MST_CTRL: u8 = 0x24;
    pub const INT_ENABLE: u8 = 0x38;
    pub const ACCEL_XOUT_H: u8 = 0x3B;
    pub const GYRO_XOUT_H: u8 = 0x43;
    pub const USER_CTRL: u8 = 0x6A;
    pub const PWR_MGMT_1: u8 = 0x6B;
    pub const PWR_MGMT_2: u8 = 0x6C;
    pub const FIFO_COUNTH: u8 = 0x72;
    pub const FIFO_R_W: u8 = 0x74;

    /// Accel factory trim registers, 2 bytes each, 3 bytes apart
    pub const XA_OFFSET_H: u8 = 0x77;
    pub const YA_OFFSET_H: u8 = 0x7A;
    pub const ZA_OFFSET_H: u8 = 0x7D;

    /// `PWR_MGMT_1` device reset
    pub const PWR_RESET: u8 = 0x80;
    /// `PWR_MGMT_1` clock source: PLL when ready, else internal oscillator
    pub const PWR_CLOCK_PLL: u8 = 0x01;
    /// `CONFIG` DLPF setting 1 (184 Hz gyro bandwidth, 1 kHz sample rate)
    pub const DLPF_184HZ: u8 = 0x01;
    /// `CONFIG` DLPF setting 2 (92 Hz gyro bandwidth)
    pub const DLPF_92HZ: u8 = 0x02;
    /// `FIFO_EN` value routing gyro X/Y/Z and accel into the FIFO
    pub const FIFO_GYRO_ACCEL: u8 = 0x78;
    /// `USER_CTRL` FIFO enable bit
    pub const USER_CTRL_FIFO_EN: u8 = 0x40;
    /// `USER_CTRL` FIFO and DMP reset bits
    pub const USER_CTRL_RESET_FIFO_DMP: u8 = 0x0C;
    /// Self-test enable on all three axes, lowest full scale
    pub const SELF_TEST_ENABLE: u8 = 0xE0;
    /// Bytes per accel+gyro FIFO packet
    pub const FIFO_PACKET_LEN: usize = 12;
}

/// AK8963 magnetometer registers
pub mod ak8963 {
    /// I2C address (reachable through the MPU9250 bypass)
    pub const ADDRESS: u8 = 0x0C;

    /// Status 1, bit 0 is data ready
    pub const ST1: u8 = 0x02;
    /// First data register, little-endian X/Y/Z followed by ST2
    pub const XOUT_L: u8 = 0x03;
    pub const CNTL: u8 = 0x0A;
    /// Fuse ROM sensitivity adjustment, X/Y/Z
    pub const ASAX: u8 = 0x10;

    pub const ST1_DATA_READY: u8 = 0x01;
    /// ST2 magnetic sensor overflow bit
    pub const ST2_OVERFLOW: u8 = 0x08;
    pub const MODE_POWER_DOWN: u8 = 0x00;
    pub const MODE_FUSE_ROM: u8 = 0x0F;
}

/// EM7180 SENtral co-processor registers
pub mod em7180 {
    /// I2C address
    pub const ADDRESS: u8 = 0x28;

    /// Quaternion, four little-endian f32 stored X, Y, Z, W
    pub const QX: u8 = 0x00;
    pub const MX: u8 = 0x12;
    pub const AX: u8 = 0x1A;
    pub const GX: u8 = 0x22;
    pub const PARAM_ACKNOWLEDGE: u8 = 0x3A;
    /// Parameter read-back bytes 0..=3, least significant first
    pub const SAVED_PARAM_BYTE0: u8 = 0x3B;
    pub const ALGORITHM_CONTROL: u8 = 0x54;
    /// Parameter load bytes 0..=3, least significant first
    pub const LOAD_PARAM_BYTE0: u8 = 0x60;
    pub const PARAM_REQUEST: u8 = 0x64;
    pub const PRODUCT_ID: u8 = 0x90;

    /// `ALGORITHM_CONTROL` bit requesting a parameter transfer
    pub const PARAM_TRANSFER: u8 = 0x80;
    /// Request-byte flag marking a parameter write
    pub const PARAM_WRITE: u8 = 0x80;

    /// Magnetometer + accelerometer full scale parameter
    pub const PARAM_MAG_ACC_FS: u8 = 74;
    /// Gyroscope full scale parameter
    pub const PARAM_GYRO_FS: u8 = 75;
}

/// BMP280 barometer registers
pub mod bmp280 {
    /// I2C address with SDO low
    pub const ADDRESS: u8 = 0x76;

    /// Calibration block, 24 bytes little-endian
    pub const CALIB00: u8 = 0x88;
    /// Pressure MSB; pressure and temperature follow as 3 + 3 bytes
    pub const PRESS_MSB: u8 = 0xF7;
    pub const CALIBRATION_LEN: usize = 24;
}
