//! Bus interface implementations for the QMC5883L
//!
//! This module provides implementations of the `device-driver` register interface
//! over the two ways the sensor can be reached:
//!
//! - [`MasterInterface`]: the crate's own register-level [`I2cMaster`], for bare
//!   controllers that are sequenced byte by byte
//! - [`HalInterface`]: any `embedded_hal::i2c::I2c` implementation

use crate::I2C_ADDRESS;
use crate::bus::{BusAddress, BusError, I2cController, I2cMaster, TickSource};
use device_driver::RegisterInterface;
use embedded_hal::i2c::Operation;

/// Register interface over the crate's own I2C master
pub struct MasterInterface<C, T> {
    master: I2cMaster<C, T>,
    address: BusAddress,
}

impl<C, T> MasterInterface<C, T> {
    /// Create an interface talking to the sensor at its fixed address (0x0D)
    ///
    /// # Example
    /// ```ignore
    /// let master = I2cMaster::new(controller, ticks);
    /// let interface = MasterInterface::new(master);
    /// let mut compass = Qmc5883lDriver::new(interface)?;
    /// ```
    pub const fn new(master: I2cMaster<C, T>) -> Self {
        Self {
            master,
            address: BusAddress::new(I2C_ADDRESS),
        }
    }

    /// Create an interface talking to a custom 7-bit address
    pub const fn with_address(master: I2cMaster<C, T>, address: u8) -> Self {
        Self {
            master,
            address: BusAddress::new(address),
        }
    }

    /// Target address
    pub const fn address(&self) -> BusAddress {
        self.address
    }

    /// Access the underlying master, e.g. to inspect its transport state
    pub fn master_mut(&mut self) -> &mut I2cMaster<C, T> {
        &mut self.master
    }

    /// Consume the interface and return the master
    pub fn release(self) -> I2cMaster<C, T> {
        self.master
    }
}

impl<C, T> RegisterInterface for MasterInterface<C, T>
where
    C: I2cController,
    T: TickSource,
{
    type Error = BusError;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len()
        match read_data {
            [] => Ok(()),
            [byte] => {
                *byte = self.master.read_register(self.address, address)?;
                Ok(())
            }
            _ => self.master.read_registers(self.address, address, read_data),
        }
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len()
        self.master.write_registers(self.address, address, write_data)
    }
}

/// Register interface over an `embedded-hal` I2C bus
pub struct HalInterface<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C> HalInterface<I2C> {
    /// Create an interface talking to the sensor at its fixed address (0x0D)
    pub const fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: I2C_ADDRESS,
        }
    }

    /// Create an interface talking to a custom 7-bit address
    pub const fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Consume the interface and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> RegisterInterface for HalInterface<I2C>
where
    I2C: embedded_hal::i2c::I2c<Error = E>,
{
    type Error = E;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for I2C
        self.i2c.write_read(self.address, &[address], read_data)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for I2C
        // Adjacent writes go out back to back, so the pointer and data form one frame
        self.i2c.transaction(
            self.address,
            &mut [Operation::Write(&[address]), Operation::Write(write_data)],
        )
    }
}
