//! Register definitions for the QMC5883L
//!
//! The register file is flat (no banks) and spans 0x00-0x0D. The six data bytes,
//! status and temperature registers sit at consecutive addresses so the whole
//! measurement can be fetched with a single burst read.
//!
//! [`map`] lists every address as a plain constant for raw and burst access. The
//! registers the driver touches field-by-field are also described to `device-driver`
//! below, which generates typed accessors for them.

/// Register addresses (the wire contract with the device)
pub mod map {
    /// X axis output, low byte
    pub const DATA_X_LSB: u8 = 0x00;
    /// X axis output, high byte
    pub const DATA_X_MSB: u8 = 0x01;
    /// Y axis output, low byte
    pub const DATA_Y_LSB: u8 = 0x02;
    /// Y axis output, high byte
    pub const DATA_Y_MSB: u8 = 0x03;
    /// Z axis output, low byte
    pub const DATA_Z_LSB: u8 = 0x04;
    /// Z axis output, high byte
    pub const DATA_Z_MSB: u8 = 0x05;
    /// Status register (DOR, OVL, DRDY)
    pub const STATUS: u8 = 0x06;
    /// Temperature output, low byte
    pub const TOUT_LSB: u8 = 0x07;
    /// Temperature output, high byte
    pub const TOUT_MSB: u8 = 0x08;
    /// Control register 1 (mode, ODR, range, OSR)
    pub const CONTROL_1: u8 = 0x09;
    /// Control register 2 (soft reset, pointer roll-over, interrupt pin)
    pub const CONTROL_2: u8 = 0x0A;
    /// SET/RESET period
    pub const SET_RESET_PERIOD: u8 = 0x0B;
    /// Chip identification
    pub const CHIP_ID: u8 = 0x0D;

    /// Number of data output bytes (X, Y, Z little-endian pairs)
    pub const DATA_LEN: usize = 6;
}

device_driver::create_device!(
    device_name: Qmc5883l,
    dsl: {
        config {
            type RegisterAddressType = u8;
            type DefaultByteOrder = LE;
        }

        /// CONTROL_2 - Control Register 2 (0x0A)
        register Control2 {
            const ADDRESS = 0x0A;
            const SIZE_BITS = 8;

            /// Interrupt pin disable (0 = DRDY pin enabled)
            int_enb: bool = 0,
            reserved_5_1: uint = 1..6,
            /// Register pointer roll-over
            rol_pnt: bool = 6,
            /// Soft reset, self-clearing
            soft_rst: bool = 7,
        },

        /// SET_RESET_PERIOD - SET/RESET Period (0x0B)
        /// Datasheet recommends 0x01
        register SetResetPeriod {
            const ADDRESS = 0x0B;
            const SIZE_BITS = 8;

            /// FBR period value
            period: uint = 0..8,
        },

        /// CHIP_ID - Chip Identification (0x0D)
        /// Expected value: 0xFF
        register ChipId {
            const ADDRESS = 0x0D;
            const SIZE_BITS = 8;

            /// Chip ID (should read 0xFF)
            chip_id: uint = 0..8,
        },
    }
);
